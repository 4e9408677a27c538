//! Bookings of catalog items by tenant users.

mod model;

pub use model::*;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::catalog::{CatalogItem, Cruise, Hotel, Package};
use crate::pagination::Page;
use crate::store::{Database, Record};
use crate::text::trim_to_none;
use crate::user::User;
use crate::{Error, Result};

const MAX_GUESTS: u32 = 20;

impl Database {
    /// Price the requested item and record a pending booking for `user`.
    ///
    /// The amount is always computed here from the catalog, never taken
    /// from the caller.
    pub async fn create_booking(&self, user: &User, new: NewBooking) -> Result<Booking> {
        let tenant_id = user
            .tenant_id
            .ok_or_else(|| Error::Forbidden("Bookings require a tenant account".to_string()))?;
        let tenant = self.tenants.require(tenant_id).await?;
        if !tenant.is_active() {
            return Err(Error::Forbidden("Tenant is suspended".to_string()));
        }
        if new.guests == 0 || new.guests > MAX_GUESTS {
            return Err(Error::invalid(format!(
                "Guests must be between 1 and {}",
                MAX_GUESTS
            )));
        }

        let scope = Some(tenant_id);
        let (total_amount, departure_id, nights) = match new.item_kind {
            ItemKind::Cruise => {
                let cruise = self.get_catalog::<Cruise>(new.item_id, scope).await?;
                ensure_active(cruise.is_active(), Cruise::KIND)?;
                let departure_id = new
                    .departure_id
                    .ok_or_else(|| Error::invalid("A departure is required for cruises"))?;
                let departure = self.get_departure(departure_id, scope).await?;
                if departure.cruise_id != cruise.id {
                    return Err(Error::invalid("Departure does not belong to this cruise"));
                }
                if !departure.status.is_bookable() {
                    return Err(Error::invalid("Departure is not open for booking"));
                }
                (
                    departure.price_for(&cruise) * new.guests as f64,
                    Some(departure.id),
                    None,
                )
            }
            ItemKind::Package => {
                let package = self.get_catalog::<Package>(new.item_id, scope).await?;
                ensure_active(package.is_active(), Package::KIND)?;
                (package.price * new.guests as f64, None, None)
            }
            ItemKind::Hotel => {
                let hotel = self.get_catalog::<Hotel>(new.item_id, scope).await?;
                ensure_active(hotel.is_active(), Hotel::KIND)?;
                let nights = new.nights.unwrap_or(1);
                if nights == 0 {
                    return Err(Error::invalid("Nights must be at least one"));
                }
                (
                    hotel.price_per_night * nights as f64 * new.guests as f64,
                    None,
                    Some(nights),
                )
            }
        };

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            tenant_id,
            user_id: user.id,
            item_kind: new.item_kind,
            item_id: new.item_id,
            departure_id,
            guests: new.guests,
            nights,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount: round_cents(total_amount),
            notes: trim_to_none(new.notes),
            created_at: now,
            updated_at: now,
        };
        let booking = self.bookings.insert(booking).await?;
        info!(
            "Booking {} created for {:?} {} ({} guest(s), {:.2})",
            booking.id, booking.item_kind, booking.item_id, booking.guests, booking.total_amount
        );
        Ok(booking)
    }

    pub async fn list_bookings(&self, query: &BookingQuery) -> Page<Booking> {
        let bookings = self
            .bookings
            .filter(|b| {
                query.tenant_id.is_none_or(|id| b.tenant_id == id)
                    && query.user_id.is_none_or(|id| b.user_id == id)
                    && query.status.is_none_or(|s| b.status == s)
                    && query.payment_status.is_none_or(|s| b.payment_status == s)
            })
            .await;
        query.page_request().apply(bookings)
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<Booking> {
        self.bookings.require(id).await
    }

    pub async fn update_booking_status(
        &self,
        id: Uuid,
        update: BookingStatusUpdate,
    ) -> Result<Booking> {
        if update.status.is_none() && update.payment_status.is_none() {
            return Err(Error::invalid("Nothing to update"));
        }
        let booking = self
            .bookings
            .update(id, |booking, _| {
                if let Some(next) = update.status {
                    if !booking.status.can_transition_to(next) {
                        return Err(Error::invalid(format!(
                            "Cannot move booking from {:?} to {:?}",
                            booking.status, next
                        )));
                    }
                    booking.status = next;
                }
                if let Some(payment) = update.payment_status {
                    booking.payment_status = payment;
                }
                Ok(())
            })
            .await?;
        info!(
            "Booking {} is now {:?}/{:?}",
            booking.id, booking.status, booking.payment_status
        );
        Ok(booking)
    }

    pub async fn cancel_booking(&self, id: Uuid) -> Result<Booking> {
        self.update_booking_status(
            id,
            BookingStatusUpdate {
                status: Some(BookingStatus::Cancelled),
                payment_status: None,
            },
        )
        .await
    }
}

fn ensure_active(active: bool, kind: &str) -> Result<()> {
    if !active {
        return Err(Error::invalid(format!("{} is not available", kind)));
    }
    Ok(())
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::catalog::{DepartureStatus, NewCruise, NewDeparture, NewHotel};
    use crate::tenant::NewTenant;
    use crate::user::NewUser;

    struct Fixture {
        db: Database,
        guest: User,
        cruise: Cruise,
        departure_id: Uuid,
        _temp: TempDir,
    }

    async fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let db = Database::open(temp.path()).await.unwrap();
        let tenant = db
            .create_tenant(NewTenant {
                name: "Azure".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let guest = db
            .create_user(NewUser::customer(tenant.id, "guest@example.com", "Guest", "verysecurepw"))
            .await
            .unwrap();
        let cruise = db
            .create_catalog::<Cruise>(
                tenant.id,
                NewCruise {
                    name: "Aegean Escape".to_string(),
                    duration: 7,
                    price: 1000.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let departure = db
            .create_departure(
                NewDeparture {
                    cruise_id: cruise.id,
                    departure_date: NaiveDate::from_ymd_opt(2027, 5, 1).unwrap(),
                    return_date: NaiveDate::from_ymd_opt(2027, 5, 8).unwrap(),
                    status: None,
                    price_modifier: Some(1.1),
                    available_cabins: None,
                },
                None,
            )
            .await
            .unwrap();
        Fixture {
            db,
            guest,
            cruise,
            departure_id: departure.id,
            _temp: temp,
        }
    }

    fn cruise_booking(f: &Fixture, guests: u32) -> NewBooking {
        NewBooking {
            item_kind: ItemKind::Cruise,
            item_id: f.cruise.id,
            departure_id: Some(f.departure_id),
            guests,
            nights: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn cruise_total_uses_departure_modifier() {
        let f = fixture().await;
        let booking = f.db.create_booking(&f.guest, cruise_booking(&f, 2)).await.unwrap();

        assert_eq!(booking.total_amount, 2200.0);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.tenant_id, f.cruise.tenant_id);
    }

    #[tokio::test]
    async fn hotel_total_counts_nights() {
        let f = fixture().await;
        let hotel = f
            .db
            .create_catalog::<Hotel>(
                f.cruise.tenant_id,
                NewHotel {
                    name: "Harbour View".to_string(),
                    city: "Lisbon".to_string(),
                    price_per_night: 150.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let booking = f
            .db
            .create_booking(
                &f.guest,
                NewBooking {
                    item_kind: ItemKind::Hotel,
                    item_id: hotel.id,
                    departure_id: None,
                    guests: 2,
                    nights: Some(3),
                    notes: Some("  sea view please ".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(booking.total_amount, 900.0);
        assert_eq!(booking.notes.as_deref(), Some("sea view please"));
    }

    #[tokio::test]
    async fn cruise_requires_bookable_departure() {
        let f = fixture().await;
        let mut missing = cruise_booking(&f, 1);
        missing.departure_id = None;
        assert!(matches!(
            f.db.create_booking(&f.guest, missing).await,
            Err(Error::InvalidInput(_))
        ));

        f.db.departures
            .update(f.departure_id, |d, _| {
                d.status = DepartureStatus::SoldOut;
                Ok(())
            })
            .await
            .unwrap();
        assert!(matches!(
            f.db.create_booking(&f.guest, cruise_booking(&f, 1)).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn cancelled_booking_cannot_be_confirmed() {
        let f = fixture().await;
        let booking = f.db.create_booking(&f.guest, cruise_booking(&f, 1)).await.unwrap();
        f.db.cancel_booking(booking.id).await.unwrap();

        let result = f
            .db
            .update_booking_status(
                booking.id,
                BookingStatusUpdate {
                    status: Some(BookingStatus::Confirmed),
                    payment_status: None,
                },
            )
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn suspended_tenant_cannot_book() {
        let f = fixture().await;
        f.db.suspend_tenant(f.cruise.tenant_id, None).await.unwrap();
        let result = f.db.create_booking(&f.guest, cruise_booking(&f, 1)).await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[tokio::test]
    async fn stats_group_bookings_and_revenue() {
        let f = fixture().await;
        let paid = f.db.create_booking(&f.guest, cruise_booking(&f, 1)).await.unwrap();
        f.db.create_booking(&f.guest, cruise_booking(&f, 2)).await.unwrap();
        f.db.update_booking_status(
            paid.id,
            BookingStatusUpdate {
                status: Some(BookingStatus::Confirmed),
                payment_status: Some(PaymentStatus::Paid),
            },
        )
        .await
        .unwrap();

        let stats = f.db.tenant_stats(f.cruise.tenant_id).await.unwrap();
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_bookings, 2);
        assert_eq!(stats.revenue, 1100.0);
        assert_eq!(stats.catalog.cruises, 1);
        let pending = stats
            .bookings_by_status
            .iter()
            .find(|group| group.key == BookingStatus::Pending)
            .unwrap();
        assert_eq!(pending.count, 1);
        assert_eq!(pending.total_amount, 2200.0);

        // Bookings now block tenant deletion.
        assert!(matches!(
            f.db.delete_tenant(f.cruise.tenant_id).await,
            Err(Error::HasDependents(_))
        ));
    }
}

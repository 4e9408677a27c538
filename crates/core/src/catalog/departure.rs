//! Scheduled sailings of a cruise.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cruise::Cruise;
use crate::store::{Database, Record};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepartureStatus {
    #[default]
    Scheduled,
    Limited,
    SoldOut,
    Cancelled,
}

impl DepartureStatus {
    pub fn is_bookable(self) -> bool {
        matches!(self, Self::Scheduled | Self::Limited)
    }

    /// Status implied by a new cabin count when none was given explicitly.
    fn follow_cabins(self, cabins: Option<u32>) -> Self {
        match (self, cabins) {
            (status, Some(0)) if status.is_bookable() => Self::SoldOut,
            (Self::SoldOut, Some(n)) if n > 0 => Self::Scheduled,
            (status, _) => status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub cruise_id: Uuid,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub status: DepartureStatus,
    /// Multiplier applied to the cruise's base price.
    pub price_modifier: f64,
    pub available_cabins: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Departure {
    pub fn price_for(&self, cruise: &Cruise) -> f64 {
        cruise.price * self.price_modifier
    }
}

impl Record for Departure {
    const KIND: &'static str = "Departure";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeparture {
    pub cruise_id: Uuid,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    #[serde(default)]
    pub status: Option<DepartureStatus>,
    #[serde(default)]
    pub price_modifier: Option<f64>,
    #[serde(default)]
    pub available_cabins: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeparturePatch {
    #[serde(default)]
    pub departure_date: Option<NaiveDate>,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<DepartureStatus>,
    #[serde(default)]
    pub price_modifier: Option<f64>,
    #[serde(default)]
    pub available_cabins: Option<u32>,
}

/// Departure with its effective per-guest price, as listed for a cruise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedDeparture {
    #[serde(flatten)]
    pub departure: Departure,
    pub price: f64,
}

fn validate(departure: &Departure) -> Result<()> {
    if departure.return_date < departure.departure_date {
        return Err(Error::invalid("Return date cannot be before departure date"));
    }
    if !departure.price_modifier.is_finite() || departure.price_modifier <= 0.0 {
        return Err(Error::invalid("Price modifier must be positive"));
    }
    if departure.available_cabins == Some(0) && departure.status.is_bookable() {
        return Err(Error::invalid("A departure with no cabins left cannot be bookable"));
    }
    Ok(())
}

impl Database {
    /// Departures of a cruise in date order, optionally only from `from` on.
    pub async fn list_departures(
        &self,
        cruise_id: Uuid,
        scope: Option<Uuid>,
        from: Option<NaiveDate>,
    ) -> Result<Vec<PricedDeparture>> {
        let cruise = self.get_catalog::<Cruise>(cruise_id, scope).await?;
        let mut departures = self
            .departures
            .filter(|d| d.cruise_id == cruise_id && from.is_none_or(|day| d.departure_date >= day))
            .await;
        departures.sort_by_key(|d| d.departure_date);
        Ok(departures
            .into_iter()
            .map(|departure| PricedDeparture {
                price: departure.price_for(&cruise),
                departure,
            })
            .collect())
    }

    pub async fn get_departure(&self, id: Uuid, scope: Option<Uuid>) -> Result<Departure> {
        self.departures
            .get(id)
            .await
            .filter(|d| scope.is_none_or(|tenant| d.tenant_id == tenant))
            .ok_or_else(|| Error::not_found(Departure::KIND, id))
    }

    pub async fn create_departure(
        &self,
        new: NewDeparture,
        scope: Option<Uuid>,
    ) -> Result<Departure> {
        let cruise = self.get_catalog::<Cruise>(new.cruise_id, scope).await?;
        let now = Utc::now();
        let departure = Departure {
            id: Uuid::new_v4(),
            tenant_id: cruise.tenant_id,
            cruise_id: cruise.id,
            departure_date: new.departure_date,
            return_date: new.return_date,
            status: new
                .status
                .unwrap_or_else(|| DepartureStatus::Scheduled.follow_cabins(new.available_cabins)),
            price_modifier: new.price_modifier.unwrap_or(1.0),
            available_cabins: new.available_cabins,
            created_at: now,
            updated_at: now,
        };
        validate(&departure)?;
        self.departures.insert(departure).await
    }

    pub async fn update_departure(
        &self,
        id: Uuid,
        patch: DeparturePatch,
        scope: Option<Uuid>,
    ) -> Result<Departure> {
        self.get_departure(id, scope).await?;
        self.departures
            .update(id, |departure, _| {
                if let Some(date) = patch.departure_date {
                    departure.departure_date = date;
                }
                if let Some(date) = patch.return_date {
                    departure.return_date = date;
                }
                if let Some(status) = patch.status {
                    departure.status = status;
                }
                if let Some(modifier) = patch.price_modifier {
                    departure.price_modifier = modifier;
                }
                if patch.available_cabins.is_some() {
                    departure.available_cabins = patch.available_cabins;
                    if patch.status.is_none() {
                        departure.status =
                            departure.status.follow_cabins(departure.available_cabins);
                    }
                }
                validate(departure)
            })
            .await
    }

    pub async fn delete_departure(&self, id: Uuid, scope: Option<Uuid>) -> Result<()> {
        self.get_departure(id, scope).await?;
        let bookings = self
            .bookings
            .count(|b| b.departure_id == Some(id))
            .await;
        if bookings > 0 {
            return Err(Error::HasDependents(format!(
                "Cannot delete departure with {} booking(s)",
                bookings
            )));
        }
        self.departures.remove(id).await?;
        Ok(())
    }
}

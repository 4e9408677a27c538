//! Tenant lifecycle, domain resolution and statistics.

mod model;

pub use model::*;

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::booking::{BookingStatus, PaymentStatus};
use crate::pagination::Page;
use crate::store::{Database, Record};
use crate::text::{normalize_host, normalize_slug, trim_to_none};
use crate::user::UserRole;
use crate::{Error, Result};

const SUSPENSION_REASON: &str = "suspensionReason";
const SUSPENDED_AT: &str = "suspendedAt";

fn normalize_optional_host(value: Option<String>) -> Option<String> {
    trim_to_none(value).and_then(|raw| normalize_host(&raw))
}

fn settings_object(value: Option<Value>) -> Result<Value> {
    match value {
        None | Some(Value::Null) => Ok(Value::Object(Map::new())),
        Some(Value::Object(map)) => Ok(Value::Object(map)),
        Some(_) => Err(Error::invalid("Tenant settings must be a JSON object")),
    }
}

/// Reject `candidate` if its slug, domain or subdomain is already claimed.
///
/// Domains and subdomains share one namespace because resolution matches
/// either field.
fn ensure_unique(candidate: &Tenant, existing: &HashMap<Uuid, Tenant>) -> Result<()> {
    for other in existing.values().filter(|other| other.id != candidate.id) {
        if other.slug == candidate.slug {
            return Err(Error::Duplicate(format!(
                "Tenant with slug '{}' already exists",
                candidate.slug
            )));
        }
        for host in [&candidate.domain, &candidate.subdomain].into_iter().flatten() {
            if other.answers_to(host) {
                return Err(Error::Duplicate(format!(
                    "Tenant with domain or subdomain '{}' already exists",
                    host
                )));
            }
        }
    }
    Ok(())
}

fn matches_search(tenant: &Tenant, needle: &str) -> bool {
    let contains = |value: &str| value.to_lowercase().contains(needle);
    contains(&tenant.name)
        || contains(&tenant.slug)
        || tenant.domain.as_deref().is_some_and(contains)
        || tenant.subdomain.as_deref().is_some_and(contains)
}

impl Database {
    pub async fn create_tenant(&self, new: NewTenant) -> Result<Tenant> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Error::invalid("Tenant name cannot be empty"));
        }
        let slug = normalize_slug(new.slug.as_deref().unwrap_or(name))?;

        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug,
            domain: normalize_optional_host(new.domain),
            subdomain: normalize_optional_host(new.subdomain),
            plan: new.plan.unwrap_or_default(),
            status: TenantStatus::Active,
            settings: settings_object(new.settings)?,
            created_at: now,
            updated_at: now,
        };
        let tenant = self.tenants.insert_checked(tenant, ensure_unique).await?;
        info!("Created tenant {} ({})", tenant.slug, tenant.id);
        Ok(tenant)
    }

    pub async fn get_tenant(&self, id: Uuid) -> Result<Tenant> {
        self.tenants.require(id).await
    }

    pub async fn list_tenants(&self, query: &TenantQuery) -> Page<Tenant> {
        let needle = trim_to_none(query.search.clone()).map(|s| s.to_lowercase());
        let tenants = self
            .tenants
            .filter(|tenant| {
                query.status.is_none_or(|status| tenant.status == status)
                    && query.plan.is_none_or(|plan| tenant.plan == plan)
                    && needle
                        .as_deref()
                        .is_none_or(|needle| matches_search(tenant, needle))
            })
            .await;
        query.page_request().apply(tenants)
    }

    /// Resolve an active tenant by domain or subdomain.
    pub async fn resolve_tenant(&self, host: &str) -> Result<PublicTenant> {
        let host = normalize_host(host).ok_or_else(|| Error::invalid("Domain is required"))?;
        self.tenants
            .find(|tenant| tenant.is_active() && tenant.answers_to(&host))
            .await
            .map(|tenant| tenant.public_view())
            .ok_or_else(|| Error::not_found(Tenant::KIND, host))
    }

    pub async fn update_tenant(&self, id: Uuid, patch: TenantPatch) -> Result<Tenant> {
        let slug = patch.slug.as_deref().map(normalize_slug).transpose()?;
        let settings = patch.settings.map(|s| settings_object(Some(s))).transpose()?;
        let name = match patch.name {
            Some(name) if name.trim().is_empty() => {
                return Err(Error::invalid("Tenant name cannot be empty"));
            }
            name => name.map(|n| n.trim().to_string()),
        };

        self.tenants
            .update(id, |tenant, existing| {
                if let Some(name) = name {
                    tenant.name = name;
                }
                if let Some(slug) = slug {
                    tenant.slug = slug;
                }
                // An empty string clears the field; absence leaves it alone.
                if let Some(domain) = patch.domain {
                    tenant.domain = normalize_optional_host(Some(domain));
                }
                if let Some(subdomain) = patch.subdomain {
                    tenant.subdomain = normalize_optional_host(Some(subdomain));
                }
                if let Some(plan) = patch.plan {
                    tenant.plan = plan;
                }
                if let Some(settings) = settings {
                    tenant.settings = settings;
                }
                ensure_unique(tenant, existing)
            })
            .await
    }

    /// Delete a tenant and its catalog data.
    ///
    /// Refused while any user or booking still belongs to the tenant.
    pub async fn delete_tenant(&self, id: Uuid) -> Result<()> {
        let tenant = self.tenants.require(id).await?;
        let (users, bookings) = tokio::join!(
            self.users.count(|user| user.tenant_id == Some(id)),
            self.bookings.count(|booking| booking.tenant_id == id),
        );
        if users > 0 || bookings > 0 {
            return Err(Error::HasDependents(format!(
                "Cannot delete tenant with {} user(s) and {} booking(s)",
                users, bookings
            )));
        }

        self.departures.remove_where(|d| d.tenant_id == id).await?;
        self.cruises.remove_where(|c| c.tenant_id == id).await?;
        self.hotels.remove_where(|h| h.tenant_id == id).await?;
        self.packages.remove_where(|p| p.tenant_id == id).await?;
        self.categories
            .remove_where(|c| c.tenant_id == Some(id))
            .await?;
        self.hero_sections
            .remove_where(|h| h.tenant_id == Some(id))
            .await?;
        self.tenants.remove(id).await?;
        info!("Deleted tenant {} ({})", tenant.slug, tenant.id);
        Ok(())
    }

    pub async fn suspend_tenant(&self, id: Uuid, reason: Option<String>) -> Result<Tenant> {
        let reason =
            trim_to_none(reason).unwrap_or_else(|| "Suspended by administrator".to_string());
        let tenant = self
            .tenants
            .update(id, |tenant, _| {
                if tenant.status == TenantStatus::Suspended {
                    return Err(Error::invalid("Tenant is already suspended"));
                }
                let mut settings = settings_object(Some(tenant.settings.take()))?;
                if let Value::Object(map) = &mut settings {
                    map.insert(SUSPENSION_REASON.to_string(), Value::String(reason));
                    map.insert(
                        SUSPENDED_AT.to_string(),
                        Value::String(Utc::now().to_rfc3339()),
                    );
                }
                tenant.settings = settings;
                tenant.status = TenantStatus::Suspended;
                Ok(())
            })
            .await?;
        info!("Suspended tenant {} ({})", tenant.slug, tenant.id);
        Ok(tenant)
    }

    pub async fn activate_tenant(&self, id: Uuid) -> Result<Tenant> {
        let tenant = self
            .tenants
            .update(id, |tenant, _| {
                if tenant.status == TenantStatus::Active {
                    return Err(Error::invalid("Tenant is already active"));
                }
                if let Value::Object(map) = &mut tenant.settings {
                    map.remove(SUSPENSION_REASON);
                    map.remove(SUSPENDED_AT);
                }
                tenant.status = TenantStatus::Active;
                Ok(())
            })
            .await?;
        info!("Activated tenant {} ({})", tenant.slug, tenant.id);
        Ok(tenant)
    }

    /// Grouped user, booking and revenue figures for one tenant.
    ///
    /// The four aggregates are read independently; there is no snapshot
    /// across collections.
    pub async fn tenant_stats(&self, id: Uuid) -> Result<TenantStats> {
        self.tenants.require(id).await?;

        let users_by_role = async {
            let mut groups: BTreeMap<UserRole, u64> = BTreeMap::new();
            for user in self.users.filter(|u| u.tenant_id == Some(id)).await {
                *groups.entry(user.role).or_default() += 1;
            }
            groups
        };
        let bookings_by_status = async {
            let mut groups: BTreeMap<BookingStatus, (u64, f64)> = BTreeMap::new();
            for booking in self.bookings.filter(|b| b.tenant_id == id).await {
                let entry = groups.entry(booking.status).or_default();
                entry.0 += 1;
                entry.1 += booking.total_amount;
            }
            groups
        };
        let payments_by_status = async {
            let mut groups: BTreeMap<PaymentStatus, (u64, f64)> = BTreeMap::new();
            for booking in self.bookings.filter(|b| b.tenant_id == id).await {
                let entry = groups.entry(booking.payment_status).or_default();
                entry.0 += 1;
                entry.1 += booking.total_amount;
            }
            groups
        };
        let catalog = async {
            let (cruises, hotels, packages) = tokio::join!(
                self.cruises.count(|c| c.tenant_id == id),
                self.hotels.count(|h| h.tenant_id == id),
                self.packages.count(|p| p.tenant_id == id),
            );
            CatalogCounts {
                cruises: cruises as u64,
                hotels: hotels as u64,
                packages: packages as u64,
            }
        };

        let (users_by_role, bookings_by_status, payments_by_status, catalog) =
            tokio::join!(users_by_role, bookings_by_status, payments_by_status, catalog);

        let revenue = payments_by_status
            .get(&PaymentStatus::Paid)
            .map(|(_, amount)| *amount)
            .unwrap_or(0.0);

        Ok(TenantStats {
            tenant_id: id,
            total_users: users_by_role.values().sum(),
            users_by_role: users_by_role
                .into_iter()
                .map(|(key, count)| GroupCount { key, count })
                .collect(),
            total_bookings: bookings_by_status.values().map(|(count, _)| count).sum(),
            bookings_by_status: bookings_by_status
                .into_iter()
                .map(|(key, (count, total_amount))| StatusTotals {
                    key,
                    count,
                    total_amount,
                })
                .collect(),
            payments_by_status: payments_by_status
                .into_iter()
                .map(|(key, (count, total_amount))| StatusTotals {
                    key,
                    count,
                    total_amount,
                })
                .collect(),
            revenue,
            catalog,
        })
    }
}

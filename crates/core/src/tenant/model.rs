//! Tenant model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pagination::PageRequest;
use crate::store::Record;

/// Subscription plan of a tenant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantPlan {
    #[default]
    Basic,
    Professional,
    Enterprise,
}

/// Lifecycle status of a tenant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantStatus {
    #[default]
    Active,
    Suspended,
}

/// A brand partition of the shared data set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    pub subdomain: Option<String>,
    pub plan: TenantPlan,
    pub status: TenantStatus,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    /// True when `host` is this tenant's domain or subdomain.
    pub fn answers_to(&self, host: &str) -> bool {
        self.domain.as_deref() == Some(host) || self.subdomain.as_deref() == Some(host)
    }

    pub fn public_view(&self) -> PublicTenant {
        PublicTenant {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            domain: self.domain.clone(),
            subdomain: self.subdomain.clone(),
            plan: self.plan,
            settings: self.settings.clone(),
        }
    }
}

impl Record for Tenant {
    const KIND: &'static str = "Tenant";

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

/// Projection returned by domain resolution; omits status and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    pub subdomain: Option<String>,
    pub plan: TenantPlan,
    pub settings: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTenant {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub plan: Option<TenantPlan>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub plan: Option<TenantPlan>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TenantStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<TenantPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl TenantQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCount<K> {
    pub key: K,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTotals<K> {
    pub key: K,
    pub count: u64,
    pub total_amount: f64,
}

/// Aggregates reported by `GET /api/tenants/:id/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantStats {
    pub tenant_id: Uuid,
    pub total_users: u64,
    pub users_by_role: Vec<GroupCount<crate::user::UserRole>>,
    pub total_bookings: u64,
    pub bookings_by_status: Vec<StatusTotals<crate::booking::BookingStatus>>,
    pub payments_by_status: Vec<StatusTotals<crate::booking::PaymentStatus>>,
    /// Sum of `totalAmount` over bookings whose payment is `PAID`.
    pub revenue: f64,
    pub catalog: CatalogCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCounts {
    pub cruises: u64,
    pub hotels: u64,
    pub packages: u64,
}

//! Behaviour shared by cruises, hotels and packages.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::category::CategoryKind;
use crate::booking::ItemKind;
use crate::pagination::{Page, PageRequest};
use crate::store::{Database, JsonCollection, Record};
use crate::text::{normalize_slug, trim_to_none};
use crate::{Error, Result};

/// A sellable catalog entry owned by a tenant.
pub trait CatalogItem: Record {
    /// Payload accepted on create.
    type New: DeserializeOwned + Serialize + Send + 'static;
    /// Payload accepted on update; every field optional.
    type Patch: DeserializeOwned + Serialize + Clone + Send + 'static;

    /// Plural name used for the listing key and URL segment.
    const COLLECTION: &'static str;
    const ITEM_KIND: ItemKind;
    /// Category kinds an item of this type may be filed under.
    const CATEGORY_KINDS: &'static [CategoryKind];

    fn collection(db: &Database) -> &JsonCollection<Self>;

    /// Validate a create payload into a record for `tenant_id`.
    fn build(new: Self::New, tenant_id: Uuid, now: DateTime<Utc>) -> Result<Self>;

    fn apply(&mut self, patch: Self::Patch) -> Result<()>;

    fn tenant_id(&self) -> Uuid;
    fn slug(&self) -> &str;
    fn category_id(&self) -> Option<Uuid>;
    /// Headline price (per guest, or per night for hotels).
    fn price(&self) -> f64;
    fn rating(&self) -> Option<f32>;
    fn is_featured(&self) -> bool;
    fn is_active(&self) -> bool;
    /// Free-text fields matched by `?search=`.
    fn search_fields(&self) -> Vec<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSort {
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
    Name,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Category slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<CatalogSort>,
    /// Only honoured for staff callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_inactive: Option<bool>,
}

impl CatalogQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            limit: self.limit,
        }
    }
}

pub(crate) fn validate_price(price: f64) -> Result<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::invalid("Price must be a non-negative number"));
    }
    Ok(price)
}

pub(crate) fn validate_rating(rating: Option<f32>) -> Result<Option<f32>> {
    match rating {
        Some(value) if !(0.0..=5.0).contains(&value) => {
            Err(Error::invalid("Rating must be between 0 and 5"))
        }
        other => Ok(other),
    }
}

pub(crate) fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid("Name cannot be empty"));
    }
    Ok(name.to_string())
}

pub(crate) fn slug_or_name(slug: Option<String>, name: &str) -> Result<String> {
    normalize_slug(trim_to_none(slug).as_deref().unwrap_or(name))
}

fn sort_items<T: CatalogItem>(items: &mut [T], sort: CatalogSort) {
    match sort {
        // Collections already come back newest first.
        CatalogSort::Newest => {}
        CatalogSort::PriceAsc => items.sort_by(|a, b| a.price().total_cmp(&b.price())),
        CatalogSort::PriceDesc => items.sort_by(|a, b| b.price().total_cmp(&a.price())),
        CatalogSort::Rating => items.sort_by(|a, b| {
            b.rating()
                .unwrap_or(0.0)
                .total_cmp(&a.rating().unwrap_or(0.0))
        }),
        CatalogSort::Name => items.sort_by(|a, b| a.slug().cmp(b.slug())),
    }
}

impl Database {
    /// Category ids of `T`'s kinds matching `slug`, visible in `scope`.
    async fn category_ids_for<T: CatalogItem>(
        &self,
        slug: &str,
        scope: Option<Uuid>,
    ) -> HashSet<Uuid> {
        self.categories
            .filter(|category| {
                category.slug == slug
                    && T::CATEGORY_KINDS.contains(&category.kind)
                    && category.visible_in(scope)
            })
            .await
            .into_iter()
            .map(|category| category.id)
            .collect()
    }

    /// List catalog items, optionally scoped to one tenant.
    pub async fn list_catalog<T: CatalogItem>(
        &self,
        scope: Option<Uuid>,
        query: &CatalogQuery,
        include_inactive: bool,
    ) -> Result<Page<T>> {
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(Error::invalid("minPrice cannot exceed maxPrice"));
            }
        }
        let categories = match trim_to_none(query.category.clone()) {
            Some(slug) => Some(self.category_ids_for::<T>(&slug.to_lowercase(), scope).await),
            None => None,
        };
        let needle = trim_to_none(query.search.clone()).map(|s| s.to_lowercase());

        let mut items = T::collection(self)
            .filter(|item| {
                scope.is_none_or(|tenant| item.tenant_id() == tenant)
                    && (include_inactive || item.is_active())
                    && query.featured.is_none_or(|f| item.is_featured() == f)
                    && query.min_price.is_none_or(|min| item.price() >= min)
                    && query.max_price.is_none_or(|max| item.price() <= max)
                    && categories.as_ref().is_none_or(|ids| {
                        item.category_id().is_some_and(|id| ids.contains(&id))
                    })
                    && needle.as_deref().is_none_or(|needle| {
                        item.search_fields()
                            .iter()
                            .any(|field| field.to_lowercase().contains(needle))
                    })
            })
            .await;
        sort_items(&mut items, query.sort.unwrap_or(CatalogSort::Newest));
        Ok(query.page_request().apply(items))
    }

    /// Fetch one item; items outside `scope` are reported as missing.
    pub async fn get_catalog<T: CatalogItem>(&self, id: Uuid, scope: Option<Uuid>) -> Result<T> {
        T::collection(self)
            .get(id)
            .await
            .filter(|item| scope.is_none_or(|tenant| item.tenant_id() == tenant))
            .ok_or_else(|| Error::not_found(T::KIND, id))
    }

    pub async fn get_catalog_by_slug<T: CatalogItem>(
        &self,
        slug: &str,
        scope: Option<Uuid>,
    ) -> Result<T> {
        let slug = slug.trim().to_lowercase();
        T::collection(self)
            .find(|item| item.slug() == slug && scope.is_none_or(|t| item.tenant_id() == t))
            .await
            .ok_or_else(|| Error::not_found(T::KIND, &slug))
    }

    async fn check_category<T: CatalogItem>(
        &self,
        category_id: Option<Uuid>,
        tenant_id: Uuid,
    ) -> Result<()> {
        let Some(category_id) = category_id else {
            return Ok(());
        };
        let category = self.categories.require(category_id).await?;
        if !T::CATEGORY_KINDS.contains(&category.kind) {
            return Err(Error::invalid(format!(
                "Category '{}' cannot hold {}",
                category.slug,
                T::COLLECTION
            )));
        }
        if !category.visible_in(Some(tenant_id)) {
            return Err(Error::invalid("Category belongs to another tenant"));
        }
        Ok(())
    }

    pub async fn create_catalog<T: CatalogItem>(&self, tenant_id: Uuid, new: T::New) -> Result<T> {
        self.tenants.require(tenant_id).await?;
        let item = T::build(new, tenant_id, Utc::now())?;
        self.check_category::<T>(item.category_id(), tenant_id).await?;

        let item = T::collection(self)
            .insert_checked(item, |item, existing| {
                let taken = existing.values().any(|other| {
                    other.tenant_id() == item.tenant_id() && other.slug() == item.slug()
                });
                if taken {
                    return Err(Error::Duplicate(format!(
                        "{} with slug '{}' already exists",
                        T::KIND,
                        item.slug()
                    )));
                }
                Ok(())
            })
            .await?;
        info!("Created {} {} for tenant {}", T::KIND, item.slug(), tenant_id);
        Ok(item)
    }

    /// Apply a patch. With `scope` set, items of other tenants are not found.
    pub async fn update_catalog<T: CatalogItem>(
        &self,
        id: Uuid,
        patch: T::Patch,
        scope: Option<Uuid>,
    ) -> Result<T> {
        let current = self.get_catalog::<T>(id, scope).await?;

        let mut preview = current;
        preview.apply(patch.clone())?;
        self.check_category::<T>(preview.category_id(), preview.tenant_id())
            .await?;

        // The patch lands on the stored record, not the preview, so writes
        // made since the read survive.
        T::collection(self)
            .update(id, |item, existing| {
                item.apply(patch)?;
                let taken = existing.values().any(|other| {
                    other.id() != item.id()
                        && other.tenant_id() == item.tenant_id()
                        && other.slug() == item.slug()
                });
                if taken {
                    return Err(Error::Duplicate(format!(
                        "{} with slug '{}' already exists",
                        T::KIND,
                        item.slug()
                    )));
                }
                Ok(())
            })
            .await
    }

    /// Delete an item. Refused while bookings reference it; a cruise takes
    /// its departures with it.
    pub async fn delete_catalog<T: CatalogItem>(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<()> {
        let item = self.get_catalog::<T>(id, scope).await?;
        let bookings = self
            .bookings
            .count(|booking| booking.item_kind == T::ITEM_KIND && booking.item_id == id)
            .await;
        if bookings > 0 {
            return Err(Error::HasDependents(format!(
                "Cannot delete {} with {} booking(s)",
                T::KIND,
                bookings
            )));
        }

        if T::ITEM_KIND == ItemKind::Cruise {
            self.departures.remove_where(|d| d.cruise_id == id).await?;
        }
        T::collection(self).remove(id).await?;
        info!("Deleted {} {} ({})", T::KIND, item.slug(), id);
        Ok(())
    }
}

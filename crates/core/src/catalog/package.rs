//! Travel package model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CategoryKind;
use super::listing::{required_name, slug_or_name, validate_price, validate_rating, CatalogItem};
use crate::booking::ItemKind;
use crate::store::{Database, JsonCollection, Record};
use crate::text::{normalize_slug, trim_to_none};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub destination: String,
    /// Length of the trip in days.
    pub duration: u32,
    /// Price per guest.
    pub price: f64,
    pub inclusions: Vec<String>,
    pub cruise_id: Option<Uuid>,
    pub hotel_id: Option<Uuid>,
    pub images: Vec<String>,
    pub rating: Option<f32>,
    pub featured: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPackage {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    pub destination: String,
    pub duration: u32,
    pub price: f64,
    #[serde(default)]
    pub inclusions: Vec<String>,
    #[serde(default)]
    pub cruise_id: Option<Uuid>,
    #[serde(default)]
    pub hotel_id: Option<Uuid>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub inclusions: Option<Vec<String>>,
    #[serde(default)]
    pub cruise_id: Option<Uuid>,
    #[serde(default)]
    pub hotel_id: Option<Uuid>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub active: Option<bool>,
}

fn validate_days(days: u32) -> Result<u32> {
    if days == 0 {
        return Err(Error::invalid("Duration must be at least one day"));
    }
    Ok(days)
}

fn required_destination(destination: &str) -> Result<String> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Err(Error::invalid("Destination cannot be empty"));
    }
    Ok(destination.to_string())
}

impl Record for Package {
    const KIND: &'static str = "Package";

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

impl CatalogItem for Package {
    type New = NewPackage;
    type Patch = PackagePatch;

    const COLLECTION: &'static str = "packages";
    const ITEM_KIND: ItemKind = ItemKind::Package;
    const CATEGORY_KINDS: &'static [CategoryKind] = &[CategoryKind::Package];

    fn collection(db: &Database) -> &JsonCollection<Self> {
        &db.packages
    }

    fn build(new: NewPackage, tenant_id: Uuid, now: DateTime<Utc>) -> Result<Self> {
        let name = required_name(&new.name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            category_id: new.category_id,
            slug: slug_or_name(new.slug, &name)?,
            name,
            description: trim_to_none(new.description),
            destination: required_destination(&new.destination)?,
            duration: validate_days(new.duration)?,
            price: validate_price(new.price)?,
            inclusions: new.inclusions,
            cruise_id: new.cruise_id,
            hotel_id: new.hotel_id,
            images: new.images,
            rating: validate_rating(new.rating)?,
            featured: new.featured,
            active: new.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, patch: PackagePatch) -> Result<()> {
        if let Some(name) = patch.name {
            self.name = required_name(&name)?;
        }
        if let Some(slug) = patch.slug {
            self.slug = normalize_slug(&slug)?;
        }
        if patch.category_id.is_some() {
            self.category_id = patch.category_id;
        }
        if patch.description.is_some() {
            self.description = trim_to_none(patch.description);
        }
        if let Some(destination) = patch.destination {
            self.destination = required_destination(&destination)?;
        }
        if let Some(duration) = patch.duration {
            self.duration = validate_days(duration)?;
        }
        if let Some(price) = patch.price {
            self.price = validate_price(price)?;
        }
        if let Some(inclusions) = patch.inclusions {
            self.inclusions = inclusions;
        }
        if patch.cruise_id.is_some() {
            self.cruise_id = patch.cruise_id;
        }
        if patch.hotel_id.is_some() {
            self.hotel_id = patch.hotel_id;
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if patch.rating.is_some() {
            self.rating = validate_rating(patch.rating)?;
        }
        if let Some(featured) = patch.featured {
            self.featured = featured;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        Ok(())
    }

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn category_id(&self) -> Option<Uuid> {
        self.category_id
    }

    fn price(&self) -> f64 {
        self.price
    }

    fn rating(&self) -> Option<f32> {
        self.rating
    }

    fn is_featured(&self) -> bool {
        self.featured
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.destination.as_str()];
        fields.extend(self.description.as_deref());
        fields.extend(self.inclusions.iter().map(String::as_str));
        fields
    }
}

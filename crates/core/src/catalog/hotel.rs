//! Hotel model definitions

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
pub struct Hotel {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub city: String,
    pub country: Option<String>,
    pub stars: u8,
    pub price_per_night: f64,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub rating: Option<f32>,
    pub featured: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHotel {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub stars: Option<u8>,
    pub price_per_night: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
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
pub struct HotelPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub stars: Option<u8>,
    #[serde(default)]
    pub price_per_night: Option<f64>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub active: Option<bool>,
}

fn validate_stars(stars: u8) -> Result<u8> {
    if !(1..=5).contains(&stars) {
        return Err(Error::invalid("Stars must be between 1 and 5"));
    }
    Ok(stars)
}

fn required_city(city: &str) -> Result<String> {
    let city = city.trim();
    if city.is_empty() {
        return Err(Error::invalid("City cannot be empty"));
    }
    Ok(city.to_string())
}

impl Record for Hotel {
    const KIND: &'static str = "Hotel";

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

impl CatalogItem for Hotel {
    type New = NewHotel;
    type Patch = HotelPatch;

    const COLLECTION: &'static str = "hotels";
    const ITEM_KIND: ItemKind = ItemKind::Hotel;
    const CATEGORY_KINDS: &'static [CategoryKind] = &[CategoryKind::Hotel];

    fn collection(db: &Database) -> &JsonCollection<Self> {
        &db.hotels
    }

    fn build(new: NewHotel, tenant_id: Uuid, now: DateTime<Utc>) -> Result<Self> {
        let name = required_name(&new.name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            category_id: new.category_id,
            slug: slug_or_name(new.slug, &name)?,
            name,
            description: trim_to_none(new.description),
            city: required_city(&new.city)?,
            country: trim_to_none(new.country),
            stars: validate_stars(new.stars.unwrap_or(3))?,
            price_per_night: validate_price(new.price_per_night)?,
            amenities: new.amenities,
            images: new.images,
            rating: validate_rating(new.rating)?,
            featured: new.featured,
            active: new.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(&mut self, patch: HotelPatch) -> Result<()> {
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
        if let Some(city) = patch.city {
            self.city = required_city(&city)?;
        }
        if patch.country.is_some() {
            self.country = trim_to_none(patch.country);
        }
        if let Some(stars) = patch.stars {
            self.stars = validate_stars(stars)?;
        }
        if let Some(price) = patch.price_per_night {
            self.price_per_night = validate_price(price)?;
        }
        if let Some(amenities) = patch.amenities {
            self.amenities = amenities;
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
        self.price_per_night
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
        let mut fields = vec![self.name.as_str(), self.city.as_str()];
        fields.extend(self.description.as_deref());
        fields.extend(self.country.as_deref());
        fields
    }
}

//! Persistent storage
//!
//! Every entity lives in its own [`JsonCollection`] under a single data
//! directory. Domain operations are implemented on [`Database`] in the
//! module that owns the entity.

mod collection;

pub use collection::{JsonCollection, Record};

use std::path::Path;

use tracing::info;

use crate::booking::Booking;
use crate::catalog::{Category, Cruise, Departure, Hotel, Package};
use crate::hero::HeroContent;
use crate::tenant::Tenant;
use crate::user::User;
use crate::{Error, Result};

pub struct Database {
    pub tenants: JsonCollection<Tenant>,
    pub users: JsonCollection<User>,
    pub categories: JsonCollection<Category>,
    pub cruises: JsonCollection<Cruise>,
    pub hotels: JsonCollection<Hotel>,
    pub packages: JsonCollection<Package>,
    pub departures: JsonCollection<Departure>,
    pub bookings: JsonCollection<Booking>,
    pub hero_sections: JsonCollection<HeroContent>,
}

impl Database {
    /// Open (or create) the data directory and load every collection.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            Error::Storage(format!("Failed to create data directory {:?}: {}", dir, e))
        })?;

        let db = Self {
            tenants: JsonCollection::open(dir.join("tenants.json")).await?,
            users: JsonCollection::open(dir.join("users.json")).await?,
            categories: JsonCollection::open(dir.join("categories.json")).await?,
            cruises: JsonCollection::open(dir.join("cruises.json")).await?,
            hotels: JsonCollection::open(dir.join("hotels.json")).await?,
            packages: JsonCollection::open(dir.join("packages.json")).await?,
            departures: JsonCollection::open(dir.join("departures.json")).await?,
            bookings: JsonCollection::open(dir.join("bookings.json")).await?,
            hero_sections: JsonCollection::open(dir.join("hero.json")).await?,
        };
        info!("Opened data directory {:?}", dir);
        Ok(db)
    }
}

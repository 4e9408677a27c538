//! Catalog module
//!
//! Cruises, hotels and packages share listing, scoping and slug rules
//! through [`CatalogItem`]. Categories group them for navigation and
//! departures schedule individual cruise sailings.

mod category;
mod cruise;
mod departure;
mod hotel;
mod listing;
mod package;

pub use category::{Category, CategoryKind, CategoryPatch, NewCategory};
pub use cruise::{Cruise, CruisePatch, NewCruise};
pub use departure::{
    Departure, DeparturePatch, DepartureStatus, NewDeparture, PricedDeparture,
};
pub use hotel::{Hotel, HotelPatch, NewHotel};
pub use listing::{CatalogItem, CatalogQuery, CatalogSort};
pub use package::{NewPackage, Package, PackagePatch};

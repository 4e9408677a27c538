//! Core library for Voyage
//!
//! This crate contains the business logic shared by the API server and the
//! client library:
//! - Tenant lifecycle and domain resolution
//! - Catalog entities (cruises, hotels, packages), categories and departures
//! - Users, bookings and hero content
//! - JSON-file backed collections and pagination

pub mod booking;
pub mod catalog;
pub mod error;
pub mod hero;
pub mod pagination;
pub mod store;
pub mod tenant;
pub mod text;
pub mod user;

pub use error::Error;
pub use pagination::{Page, PageRequest, Pagination};
pub use store::{Database, JsonCollection, Record};

pub type Result<T> = std::result::Result<T, Error>;

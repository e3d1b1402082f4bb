//! Data access for the remote metadata store.
//!
//! Services wrap the sea-orm queries so the sync engine only sees the
//! `CatalogStore` seam and never the schema.

pub mod catalog_service;

pub use catalog_service::DbCatalogStore;

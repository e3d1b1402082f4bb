//! SeaORM entities for the remote metadata store.

pub mod catalog_row;


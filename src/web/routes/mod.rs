pub mod catalog_routes;
pub mod sync_routes;

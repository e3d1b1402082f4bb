pub mod catalog;
pub mod db;
pub mod events;
pub mod inventory;
pub mod resources;
pub mod server;
pub mod sync;
pub mod version;
pub mod web;

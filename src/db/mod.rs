//! Relational metadata store: entities, column enums and the services on top.

pub mod entities;
pub mod enums;
pub mod services;

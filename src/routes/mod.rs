//! HTTP route modules

pub mod collections;
pub mod connections;
pub mod health;
pub mod items;
pub mod sync;

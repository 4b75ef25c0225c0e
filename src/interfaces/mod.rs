//! Adapters between the outside world and the application layer.

pub mod controller;
pub mod csv;
pub mod fixtures;

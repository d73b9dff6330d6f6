// Adapters layer: concrete datastore implementations.

pub mod memory;
pub mod rest;

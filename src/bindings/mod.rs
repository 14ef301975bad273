//! Host-facing bindings

pub mod c_api;

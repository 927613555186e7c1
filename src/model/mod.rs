//! Data exchanged with the ingest API: hypermedia [`Resource`]s and the static fixtures.

pub mod fixtures;
pub mod resource;

pub use fixtures::*;
pub use resource::*;

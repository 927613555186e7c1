//! Clients for the services under load, and the transport and auth seams they share.

pub mod auth;
pub mod core_client;
pub mod transport;
pub mod upload_client;

pub use auth::*;
pub use core_client::*;
pub use transport::*;
pub use upload_client::*;

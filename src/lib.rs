/// MedInventory client
///
/// Expiry tracking, alert rules and an authenticated session against the
/// MedInventory REST API.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod expiry;
pub mod jobs;
pub mod metrics;
pub mod session;

pub use config::ClientConfig;
pub use context::AppContext;
pub use error::{ClientError, ClientResult};

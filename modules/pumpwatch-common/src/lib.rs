pub mod config;
pub mod error;
pub mod geo;
pub mod types;

pub use config::{Config, DveConfig};
pub use error::PumpWatchError;
pub use geo::haversine_km;
pub use types::*;

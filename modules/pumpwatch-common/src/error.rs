use thiserror::Error;

#[derive(Error, Debug)]
pub enum PumpWatchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Station not found: {0}")]
    StationNotFound(uuid::Uuid),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

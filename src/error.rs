//! Error taxonomy for the emissions calculation core

use thiserror::Error;

use crate::models::FuelFamily;

#[derive(Error, Debug)]
pub enum EmissionsError {
    /// Non-positive, non-finite or malformed input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Zip code has no grid emissions data
    #[error("No grid emissions data for zip code {0}")]
    UnknownRegion(String),

    #[error("Unknown {family} efficiency standard: {label:?}")]
    UnknownStandard { family: FuelFamily, label: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, EmissionsError>;

impl EmissionsError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EmissionsError::InvalidArgument(msg.into())
    }
}

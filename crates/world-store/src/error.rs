//! World Store Errors

use thiserror::Error;

/// Errors raised while reading or committing world state
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Market listing not found: {0}")]
    ListingNotFound(String),

    #[error("Inventory row not found: {0}")]
    InventoryNotFound(String),

    #[error("Insufficient quantity for {key}: have {available}, need {requested}")]
    InsufficientQuantity {
        key: String,
        available: u32,
        requested: u32,
    },

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Sled(#[from] sled::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

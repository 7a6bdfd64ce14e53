//! Engine Errors

use thiserror::Error;
use world_store::StoreError;

/// Errors that abort an executor or a whole batch
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No NPC characters available")]
    NoEligibleCharacters,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;

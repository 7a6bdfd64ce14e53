//! Change sets applied to the world
//!
//! Executors never touch a store directly. They describe what should
//! happen as a `WorldChange` and the store commits every write together
//! with the activity record, or nothing at all.

use crate::state::ActionType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single write against world state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldWrite {
    /// Subtract energy, saturating at zero
    DrainEnergy { character_id: String, amount: u8 },
    /// Set the character's current location
    MoveCharacter {
        character_id: String,
        location_id: String,
    },
    /// Shift a location's player count, saturating at zero
    AdjustPlayerCount { location_id: String, delta: i32 },
    /// Mark a location as recently active
    TouchLocation {
        location_id: String,
        at: DateTime<Utc>,
    },
    /// Increment an inventory row, creating it if missing
    CreditItem {
        character_id: String,
        item_id: String,
        quantity: u32,
    },
    /// Decrement an inventory row, removing it at zero
    DebitItem {
        character_id: String,
        item_id: String,
        quantity: u32,
    },
    /// Take units from a market listing, deleting it at zero
    TakeFromListing { listing_id: String, quantity: u32 },
    /// Flip the equipped flag on an inventory row
    SetEquipped {
        character_id: String,
        item_id: String,
        equipped: bool,
    },
}

/// Activity record waiting for a store-assigned id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    pub character_id: String,
    pub action: ActionType,
    pub description: String,
    pub changes: serde_json::Map<String, serde_json::Value>,
    pub location_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Writes plus the activity record they produce
#[derive(Debug, Clone, PartialEq)]
pub struct WorldChange {
    pub writes: Vec<WorldWrite>,
    pub entry: NewActivity,
}

impl WorldChange {
    /// Start a change for one character's action
    pub fn new(character_id: &str, action: ActionType, description: impl Into<String>) -> Self {
        Self {
            writes: Vec::new(),
            entry: NewActivity {
                character_id: character_id.to_string(),
                action,
                description: description.into(),
                changes: serde_json::Map::new(),
                location_id: None,
                created_at: Utc::now(),
            },
        }
    }

    /// Add a write
    pub fn write(mut self, write: WorldWrite) -> Self {
        self.writes.push(write);
        self
    }

    /// Record the location the activity happened at
    pub fn at_location(mut self, location_id: &str) -> Self {
        self.entry.location_id = Some(location_id.to_string());
        self
    }

    /// Attach a reported change value
    pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.entry.changes.insert(key.to_string(), value.into());
        self
    }
}

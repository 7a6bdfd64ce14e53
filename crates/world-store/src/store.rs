//! The `WorldStore` port
//!
//! The engine receives a store instance explicitly; there is no global
//! client. Both implementations in this crate satisfy the same contract:
//! `apply` commits a whole `WorldChange` or leaves state untouched.

use crate::{
    changes::WorldChange,
    error::StoreResult,
    state::{ActivityEntry, Character, InventoryEntry, Item, Location, MarketListing},
};
use serde::{Deserialize, Serialize};

/// Full world contents, used for seeding and export
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldSeed {
    pub characters: Vec<Character>,
    pub locations: Vec<Location>,
    pub items: Vec<Item>,
    pub listings: Vec<MarketListing>,
    pub inventory: Vec<InventoryEntry>,
}

impl WorldSeed {
    /// Parse a seed document from JSON text
    pub fn from_json(text: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a seed document from disk
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let seed = Self::from_json(&text)?;
        tracing::info!(
            "Loaded seed {:?}: {} characters, {} locations, {} items, {} listings",
            path.as_ref(),
            seed.characters.len(),
            seed.locations.len(),
            seed.items.len(),
            seed.listings.len()
        );
        Ok(seed)
    }
}

/// Transactional access to world state
pub trait WorldStore: Send + Sync {
    /// All characters
    fn characters(&self) -> StoreResult<Vec<Character>>;

    /// A single character by id
    fn character(&self, id: &str) -> StoreResult<Option<Character>>;

    /// All locations, sub-locations included
    fn locations(&self) -> StoreResult<Vec<Location>>;

    /// Item catalog
    fn items(&self) -> StoreResult<Vec<Item>>;

    /// Open market listings
    fn listings(&self) -> StoreResult<Vec<MarketListing>>;

    /// Inventory rows held by a character
    fn inventory(&self, character_id: &str) -> StoreResult<Vec<InventoryEntry>>;

    /// Most recent activity first, optionally for one character
    fn recent_activity(
        &self,
        character_id: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<ActivityEntry>>;

    /// Atomically apply every write and append the activity record
    fn apply(&self, change: &WorldChange) -> StoreResult<ActivityEntry>;

    /// Insert or replace every record in the seed
    fn seed(&self, seed: &WorldSeed) -> StoreResult<()>;
}

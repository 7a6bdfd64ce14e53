//! World Store - state behind the NPC simulation
//!
//! This crate provides:
//! - Record types for characters, locations, items, listings and activity
//! - `WorldChange` sets that commit atomically with their activity record
//! - The `WorldStore` port with in-memory and sled-backed implementations

pub mod changes;
pub mod error;
pub mod memory;
pub mod persistence;
pub mod state;
pub mod store;

pub use changes::{NewActivity, WorldChange, WorldWrite};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use persistence::SledStore;
pub use state::{
    ActionType, ActivityEntry, Character, InventoryEntry, Item, ItemCategory, Location,
    LocationResource, MarketListing, Rarity, MAX_ENERGY,
};
pub use store::{WorldSeed, WorldStore};

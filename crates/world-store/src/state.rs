//! World State
//!
//! Record types for characters, locations, items, market listings and
//! the activity log. Field names serialize in camelCase to match the
//! game client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum character energy
pub const MAX_ENERGY: u8 = 100;

/// Highest location difficulty tier
pub const MAX_DIFFICULTY: u8 = 5;

/// A playable or simulated character
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    /// Current energy (0-100)
    pub energy: u8,
    /// Location the character is standing in
    pub current_location_id: String,
    #[serde(default)]
    pub coins: u64,
}

impl Character {
    /// Copy with energy clamped to `MAX_ENERGY`, used when seeding
    pub fn normalized(&self) -> Character {
        let mut character = self.clone();
        if character.energy > MAX_ENERGY {
            tracing::warn!(
                "Clamping energy of {} from {} to {}",
                self.id,
                self.energy,
                MAX_ENERGY
            );
            character.energy = MAX_ENERGY;
        }
        character
    }
}

/// One inventory row, unique per (character, item)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    pub character_id: String,
    pub item_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub is_equipped: bool,
}

impl InventoryEntry {
    /// Storage key for this row
    pub fn key(&self) -> String {
        inventory_key(&self.character_id, &self.item_id)
    }
}

/// Storage key for an inventory row
pub fn inventory_key(character_id: &str, item_id: &str) -> String {
    format!("{}/{}", character_id, item_id)
}

/// Item category
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    Hat,
    Clothing,
    Accessory,
    Tool,
    Consumable,
    Material,
    #[serde(other)]
    Other,
}

impl ItemCategory {
    /// Categories that occupy an equipment slot
    pub fn is_equippable(&self) -> bool {
        matches!(self, Self::Hat | Self::Clothing | Self::Accessory | Self::Tool)
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hat => "HAT",
            Self::Clothing => "CLOTHING",
            Self::Accessory => "ACCESSORY",
            Self::Tool => "TOOL",
            Self::Consumable => "CONSUMABLE",
            Self::Material => "MATERIAL",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Item rarity tier
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Common => "COMMON",
            Self::Uncommon => "UNCOMMON",
            Self::Rare => "RARE",
            Self::Epic => "EPIC",
            Self::Legendary => "LEGENDARY",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Catalog item
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category: ItemCategory,
    pub rarity: Rarity,
}

/// A mineable resource at a location
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationResource {
    pub item_id: String,
    /// Chance (0.0-1.0) that a mining attempt yields this item
    pub spawn_rate: f64,
}

/// A location or sub-location in the world
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    /// Difficulty tier (1-5)
    pub difficulty: u8,
    #[serde(default)]
    pub player_count: u32,
    #[serde(default)]
    pub has_mining: bool,
    #[serde(default)]
    pub resources: Vec<LocationResource>,
    /// Parent location for sub-locations
    #[serde(default)]
    pub parent_location_id: Option<String>,
    /// Last time a character arrived here
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
}

impl Location {
    /// Difficulty mapped onto 0.0-1.0
    pub fn normalized_difficulty(&self) -> f64 {
        let tier = self.difficulty.clamp(1, MAX_DIFFICULTY);
        (tier - 1) as f64 / (MAX_DIFFICULTY - 1) as f64
    }

    /// Whether characters can mine here
    pub fn is_mineable(&self) -> bool {
        self.has_mining && !self.resources.is_empty()
    }
}

/// An item offered for sale at a location
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketListing {
    pub id: String,
    pub location_id: String,
    pub item_id: String,
    pub price: u64,
    pub quantity: u32,
}

/// Kind of simulated action
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Travel,
    Mine,
    Buy,
    Sell,
    Equip,
    Unequip,
}

impl ActionType {
    pub const ALL: [ActionType; 6] = [
        Self::Travel,
        Self::Mine,
        Self::Buy,
        Self::Sell,
        Self::Equip,
        Self::Unequip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Travel => "TRAVEL",
            Self::Mine => "MINE",
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Equip => "EQUIP",
            Self::Unequip => "UNEQUIP",
        }
    }

    /// Actions that spend energy
    pub fn drains_energy(&self) -> bool {
        matches!(self, Self::Travel | Self::Mine)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown action type: {}", s))
    }
}

/// Persisted activity log record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: u64,
    pub character_id: String,
    pub action: ActionType,
    pub description: String,
    pub changes: serde_json::Map<String, serde_json::Value>,
    pub location_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

//! In-memory world storage
//!
//! Holds the whole world behind one `RwLock`. Writes are applied in place
//! while an undo log records the prior value of every touched record; a
//! failing write replays the log so the change leaves no trace. The activity
//! log keeps only the most recent entries.

use crate::{
    changes::{WorldChange, WorldWrite},
    error::{StoreError, StoreResult},
    state::{
        inventory_key, ActivityEntry, Character, InventoryEntry, Item, Location, MarketListing,
    },
    store::{WorldSeed, WorldStore},
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Activity entries kept in memory by default
pub const DEFAULT_ACTIVITY_LIMIT: usize = 10_000;

/// Prior value of one record touched by a change
enum Undo {
    Character(String, Option<Character>),
    Location(String, Option<Location>),
    Listing(String, Option<MarketListing>),
    Inventory(String, Option<InventoryEntry>),
}

fn restore<V>(map: &mut BTreeMap<String, V>, key: String, prior: Option<V>) {
    match prior {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

struct WorldData {
    characters: BTreeMap<String, Character>,
    locations: BTreeMap<String, Location>,
    items: BTreeMap<String, Item>,
    listings: BTreeMap<String, MarketListing>,
    /// Keyed by `character_id/item_id`
    inventory: BTreeMap<String, InventoryEntry>,
    activity: VecDeque<ActivityEntry>,
    activity_limit: usize,
    next_activity_id: u64,
}

impl Default for WorldData {
    fn default() -> Self {
        Self {
            characters: BTreeMap::new(),
            locations: BTreeMap::new(),
            items: BTreeMap::new(),
            listings: BTreeMap::new(),
            inventory: BTreeMap::new(),
            activity: VecDeque::new(),
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
            next_activity_id: 0,
        }
    }
}

impl WorldData {
    /// Capture the record a write is about to change
    fn undo_for(&self, write: &WorldWrite) -> Undo {
        match write {
            WorldWrite::DrainEnergy { character_id, .. }
            | WorldWrite::MoveCharacter { character_id, .. } => Undo::Character(
                character_id.clone(),
                self.characters.get(character_id).cloned(),
            ),
            WorldWrite::AdjustPlayerCount { location_id, .. }
            | WorldWrite::TouchLocation { location_id, .. } => Undo::Location(
                location_id.clone(),
                self.locations.get(location_id).cloned(),
            ),
            WorldWrite::CreditItem {
                character_id,
                item_id,
                ..
            }
            | WorldWrite::DebitItem {
                character_id,
                item_id,
                ..
            }
            | WorldWrite::SetEquipped {
                character_id,
                item_id,
                ..
            } => {
                let key = inventory_key(character_id, item_id);
                let prior = self.inventory.get(&key).cloned();
                Undo::Inventory(key, prior)
            }
            WorldWrite::TakeFromListing { listing_id, .. } => {
                Undo::Listing(listing_id.clone(), self.listings.get(listing_id).cloned())
            }
        }
    }

    /// Replay an undo log, newest first
    fn roll_back(&mut self, undo: Vec<Undo>) {
        for step in undo.into_iter().rev() {
            match step {
                Undo::Character(key, prior) => restore(&mut self.characters, key, prior),
                Undo::Location(key, prior) => restore(&mut self.locations, key, prior),
                Undo::Listing(key, prior) => restore(&mut self.listings, key, prior),
                Undo::Inventory(key, prior) => restore(&mut self.inventory, key, prior),
            }
        }
    }

    fn apply_write(&mut self, write: &WorldWrite) -> StoreResult<()> {
        match write {
            WorldWrite::DrainEnergy {
                character_id,
                amount,
            } => {
                let character = self
                    .characters
                    .get_mut(character_id)
                    .ok_or_else(|| StoreError::CharacterNotFound(character_id.clone()))?;
                character.energy = character.energy.saturating_sub(*amount);
            }
            WorldWrite::MoveCharacter {
                character_id,
                location_id,
            } => {
                if !self.locations.contains_key(location_id) {
                    return Err(StoreError::LocationNotFound(location_id.clone()));
                }
                let character = self
                    .characters
                    .get_mut(character_id)
                    .ok_or_else(|| StoreError::CharacterNotFound(character_id.clone()))?;
                character.current_location_id = location_id.clone();
            }
            WorldWrite::AdjustPlayerCount { location_id, delta } => {
                let location = self
                    .locations
                    .get_mut(location_id)
                    .ok_or_else(|| StoreError::LocationNotFound(location_id.clone()))?;
                location.player_count = location.player_count.saturating_add_signed(*delta);
            }
            WorldWrite::TouchLocation { location_id, at } => {
                let location = self
                    .locations
                    .get_mut(location_id)
                    .ok_or_else(|| StoreError::LocationNotFound(location_id.clone()))?;
                location.last_active = Some(*at);
            }
            WorldWrite::CreditItem {
                character_id,
                item_id,
                quantity,
            } => {
                self.inventory
                    .entry(inventory_key(character_id, item_id))
                    .and_modify(|row| row.quantity = row.quantity.saturating_add(*quantity))
                    .or_insert_with(|| InventoryEntry {
                        character_id: character_id.clone(),
                        item_id: item_id.clone(),
                        quantity: *quantity,
                        is_equipped: false,
                    });
            }
            WorldWrite::DebitItem {
                character_id,
                item_id,
                quantity,
            } => {
                let key = inventory_key(character_id, item_id);
                let row = self
                    .inventory
                    .get_mut(&key)
                    .ok_or_else(|| StoreError::InventoryNotFound(key.clone()))?;
                if row.quantity < *quantity {
                    return Err(StoreError::InsufficientQuantity {
                        key,
                        available: row.quantity,
                        requested: *quantity,
                    });
                }
                row.quantity -= quantity;
                if row.quantity == 0 {
                    self.inventory.remove(&key);
                }
            }
            WorldWrite::TakeFromListing {
                listing_id,
                quantity,
            } => {
                let listing = self
                    .listings
                    .get_mut(listing_id)
                    .ok_or_else(|| StoreError::ListingNotFound(listing_id.clone()))?;
                if listing.quantity < *quantity {
                    return Err(StoreError::InsufficientQuantity {
                        key: listing_id.clone(),
                        available: listing.quantity,
                        requested: *quantity,
                    });
                }
                listing.quantity -= quantity;
                if listing.quantity == 0 {
                    self.listings.remove(listing_id);
                }
            }
            WorldWrite::SetEquipped {
                character_id,
                item_id,
                equipped,
            } => {
                let key = inventory_key(character_id, item_id);
                let row = self
                    .inventory
                    .get_mut(&key)
                    .ok_or(StoreError::InventoryNotFound(key))?;
                row.is_equipped = *equipped;
            }
        }
        Ok(())
    }
}

/// Thread-safe in-memory world store
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<WorldData>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated from a seed
    pub fn from_seed(seed: &WorldSeed) -> Self {
        let store = Self::new();
        store.insert_seed(seed);
        store
    }

    fn insert_seed(&self, seed: &WorldSeed) {
        let mut data = self.data.write();
        for character in &seed.characters {
            data.characters.insert(character.id.clone(), character.normalized());
        }
        for location in &seed.locations {
            data.locations.insert(location.id.clone(), location.clone());
        }
        for item in &seed.items {
            data.items.insert(item.id.clone(), item.clone());
        }
        for listing in &seed.listings {
            data.listings.insert(listing.id.clone(), listing.clone());
        }
        for row in &seed.inventory {
            data.inventory.insert(row.key(), row.clone());
        }
    }

    /// Get a listing by id (for inspection)
    pub fn listing(&self, id: &str) -> Option<MarketListing> {
        self.data.read().listings.get(id).cloned()
    }

    /// Get a location by id (for inspection)
    pub fn location(&self, id: &str) -> Option<Location> {
        self.data.read().locations.get(id).cloned()
    }

    /// Keep at most `limit` activity entries, dropping the oldest
    pub fn with_activity_limit(self, limit: usize) -> Self {
        {
            let mut data = self.data.write();
            data.activity_limit = limit.max(1);
            while data.activity.len() > data.activity_limit {
                data.activity.pop_front();
            }
        }
        self
    }

    /// Number of activity records currently held
    pub fn activity_count(&self) -> usize {
        self.data.read().activity.len()
    }
}

impl WorldStore for MemoryStore {
    fn characters(&self) -> StoreResult<Vec<Character>> {
        Ok(self.data.read().characters.values().cloned().collect())
    }

    fn character(&self, id: &str) -> StoreResult<Option<Character>> {
        Ok(self.data.read().characters.get(id).cloned())
    }

    fn locations(&self) -> StoreResult<Vec<Location>> {
        Ok(self.data.read().locations.values().cloned().collect())
    }

    fn items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.data.read().items.values().cloned().collect())
    }

    fn listings(&self) -> StoreResult<Vec<MarketListing>> {
        Ok(self.data.read().listings.values().cloned().collect())
    }

    fn inventory(&self, character_id: &str) -> StoreResult<Vec<InventoryEntry>> {
        Ok(self
            .data
            .read()
            .inventory
            .values()
            .filter(|row| row.character_id == character_id)
            .cloned()
            .collect())
    }

    fn recent_activity(
        &self,
        character_id: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<ActivityEntry>> {
        Ok(self
            .data
            .read()
            .activity
            .iter()
            .rev()
            .filter(|entry| character_id.map_or(true, |id| entry.character_id == id))
            .take(limit)
            .cloned()
            .collect())
    }

    fn apply(&self, change: &WorldChange) -> StoreResult<ActivityEntry> {
        let mut data = self.data.write();
        let mut undo = Vec::with_capacity(change.writes.len());

        for write in &change.writes {
            undo.push(data.undo_for(write));
            if let Err(e) = data.apply_write(write) {
                data.roll_back(undo);
                return Err(e);
            }
        }

        let entry = ActivityEntry {
            id: data.next_activity_id,
            character_id: change.entry.character_id.clone(),
            action: change.entry.action,
            description: change.entry.description.clone(),
            changes: change.entry.changes.clone(),
            location_id: change.entry.location_id.clone(),
            created_at: change.entry.created_at,
        };
        data.next_activity_id += 1;
        data.activity.push_back(entry.clone());
        if data.activity.len() > data.activity_limit {
            data.activity.pop_front();
        }

        Ok(entry)
    }

    fn seed(&self, seed: &WorldSeed) -> StoreResult<()> {
        self.insert_seed(seed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActionType;

    fn seed() -> WorldSeed {
        WorldSeed {
            characters: vec![Character {
                id: "npc-1".to_string(),
                name: "Pepe".to_string(),
                energy: 8,
                current_location_id: "plains".to_string(),
                coins: 0,
            }],
            locations: vec![Location {
                id: "plains".to_string(),
                name: "Plains".to_string(),
                difficulty: 1,
                player_count: 1,
                has_mining: true,
                resources: Vec::new(),
                parent_location_id: None,
                last_active: None,
            }],
            listings: vec![MarketListing {
                id: "listing-1".to_string(),
                location_id: "plains".to_string(),
                item_id: "hat".to_string(),
                price: 20,
                quantity: 1,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_drain_energy_saturates() {
        let store = MemoryStore::from_seed(&seed());
        let change = WorldChange::new("npc-1", ActionType::Mine, "dig").write(
            WorldWrite::DrainEnergy {
                character_id: "npc-1".to_string(),
                amount: 10,
            },
        );

        store.apply(&change).unwrap();

        assert_eq!(store.character("npc-1").unwrap().unwrap().energy, 0);
        assert_eq!(store.activity_count(), 1);
    }

    #[test]
    fn test_failed_change_leaves_no_trace() {
        let store = MemoryStore::from_seed(&seed());
        let change = WorldChange::new("npc-1", ActionType::Buy, "buy")
            .write(WorldWrite::CreditItem {
                character_id: "npc-1".to_string(),
                item_id: "hat".to_string(),
                quantity: 1,
            })
            .write(WorldWrite::TakeFromListing {
                listing_id: "missing".to_string(),
                quantity: 1,
            });

        assert!(matches!(
            store.apply(&change),
            Err(StoreError::ListingNotFound(_))
        ));
        assert!(store.inventory("npc-1").unwrap().is_empty());
        assert_eq!(store.activity_count(), 0);
    }

    #[test]
    fn test_rollback_restores_earlier_writes() {
        let store = MemoryStore::from_seed(&seed());
        let change = WorldChange::new("npc-1", ActionType::Travel, "lost")
            .write(WorldWrite::DrainEnergy {
                character_id: "npc-1".to_string(),
                amount: 5,
            })
            .write(WorldWrite::AdjustPlayerCount {
                location_id: "plains".to_string(),
                delta: -1,
            })
            .write(WorldWrite::TakeFromListing {
                listing_id: "listing-1".to_string(),
                quantity: 1,
            })
            .write(WorldWrite::MoveCharacter {
                character_id: "npc-1".to_string(),
                location_id: "nowhere".to_string(),
            });

        assert!(matches!(
            store.apply(&change),
            Err(StoreError::LocationNotFound(_))
        ));
        let character = store.character("npc-1").unwrap().unwrap();
        assert_eq!(character.energy, 8);
        assert_eq!(character.current_location_id, "plains");
        assert_eq!(store.location("plains").unwrap().player_count, 1);
        assert_eq!(store.listing("listing-1").unwrap().quantity, 1);
        assert_eq!(store.activity_count(), 0);
    }

    #[test]
    fn test_activity_log_is_capped() {
        let store = MemoryStore::from_seed(&seed()).with_activity_limit(3);
        for description in ["a", "b", "c", "d", "e"] {
            store
                .apply(&WorldChange::new("npc-1", ActionType::Travel, description))
                .unwrap();
        }

        assert_eq!(store.activity_count(), 3);
        let recent = store.recent_activity(None, 10).unwrap();
        let ids: Vec<u64> = recent.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 3, 2]);
        assert_eq!(recent[0].description, "e");
    }

    #[test]
    fn test_seed_clamps_energy() {
        let mut world = seed();
        world.characters[0].energy = 200;
        let store = MemoryStore::from_seed(&world);
        assert_eq!(store.character("npc-1").unwrap().unwrap().energy, 100);
    }

    #[test]
    fn test_listing_deleted_at_zero() {
        let store = MemoryStore::from_seed(&seed());
        let change = WorldChange::new("npc-1", ActionType::Buy, "buy").write(
            WorldWrite::TakeFromListing {
                listing_id: "listing-1".to_string(),
                quantity: 1,
            },
        );

        store.apply(&change).unwrap();
        assert!(store.listing("listing-1").is_none());
    }

    #[test]
    fn test_debit_removes_row_and_rejects_overdraw() {
        let store = MemoryStore::from_seed(&seed());
        let credit = WorldChange::new("npc-1", ActionType::Mine, "found").write(
            WorldWrite::CreditItem {
                character_id: "npc-1".to_string(),
                item_id: "ore".to_string(),
                quantity: 2,
            },
        );
        store.apply(&credit).unwrap();

        let overdraw = WorldChange::new("npc-1", ActionType::Sell, "sell").write(
            WorldWrite::DebitItem {
                character_id: "npc-1".to_string(),
                item_id: "ore".to_string(),
                quantity: 3,
            },
        );
        assert!(matches!(
            store.apply(&overdraw),
            Err(StoreError::InsufficientQuantity { available: 2, .. })
        ));

        let debit = WorldChange::new("npc-1", ActionType::Sell, "sell").write(
            WorldWrite::DebitItem {
                character_id: "npc-1".to_string(),
                item_id: "ore".to_string(),
                quantity: 2,
            },
        );
        store.apply(&debit).unwrap();
        assert!(store.inventory("npc-1").unwrap().is_empty());
    }

    #[test]
    fn test_recent_activity_newest_first() {
        let store = MemoryStore::from_seed(&seed());
        for description in ["first", "second", "third"] {
            store
                .apply(&WorldChange::new("npc-1", ActionType::Travel, description))
                .unwrap();
        }

        let recent = store.recent_activity(Some("npc-1"), 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].description, "third");
        assert_eq!(recent[1].description, "second");
        assert!(store.recent_activity(Some("nobody"), 10).unwrap().is_empty());
    }
}

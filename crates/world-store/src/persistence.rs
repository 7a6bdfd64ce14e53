//! Persistence Layer for World State
//!
//! Uses sled embedded database so the world survives restarts. Every table
//! lives in its own tree and values are stored as JSON. Changes run inside a
//! single multi-tree transaction.

use crate::{
    changes::{WorldChange, WorldWrite},
    error::{StoreError, StoreResult},
    state::{
        inventory_key, ActivityEntry, Character, InventoryEntry, Item, Location, MarketListing,
    },
    store::{WorldSeed, WorldStore},
};
use serde::{de::DeserializeOwned, Serialize};
use sled::{
    transaction::{ConflictableTransactionError, TransactionError, TransactionalTree},
    Db, Transactional,
};
use std::path::Path;

type TxResult<T> = Result<T, ConflictableTransactionError<StoreError>>;

/// Persistent world storage
pub struct SledStore {
    /// Sled database instance
    db: Db,
    characters: sled::Tree,
    locations: sled::Tree,
    items: sled::Tree,
    listings: sled::Tree,
    /// Keyed by `character_id/item_id`
    inventory: sled::Tree,
    /// Keyed by big-endian activity id
    activity: sled::Tree,
}

impl SledStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let db = sled::open(&path)?;
        let store = Self::from_db(db)?;
        tracing::info!("Opened world store at {:?}", path.as_ref());
        Ok(store)
    }

    /// Open a throwaway store that is removed on drop
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        Ok(Self {
            characters: db.open_tree("characters")?,
            locations: db.open_tree("locations")?,
            items: db.open_tree("items")?,
            listings: db.open_tree("listings")?,
            inventory: db.open_tree("inventory")?,
            activity: db.open_tree("activity")?,
            db,
        })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Whether the store holds no characters yet
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Clear all data (for testing)
    pub fn clear(&self) -> StoreResult<()> {
        for tree in [
            &self.characters,
            &self.locations,
            &self.items,
            &self.listings,
            &self.inventory,
            &self.activity,
        ] {
            tree.clear()?;
        }
        Ok(())
    }
}

fn put<T: Serialize>(tree: &sled::Tree, key: &str, value: &T) -> StoreResult<()> {
    tree.insert(key.as_bytes(), serde_json::to_vec(value)?)?;
    Ok(())
}

fn get<T: DeserializeOwned>(tree: &sled::Tree, key: &str) -> StoreResult<Option<T>> {
    match tree.get(key.as_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn values<T: DeserializeOwned>(iter: sled::Iter) -> StoreResult<Vec<T>> {
    let mut out = Vec::new();
    for result in iter {
        let (_, value) = result?;
        out.push(serde_json::from_slice(&value)?);
    }
    Ok(out)
}

fn abort(err: impl Into<StoreError>) -> ConflictableTransactionError<StoreError> {
    ConflictableTransactionError::Abort(err.into())
}

fn tx_get<T: DeserializeOwned>(tree: &TransactionalTree, key: &str) -> TxResult<Option<T>> {
    match tree.get(key.as_bytes())? {
        Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(abort),
        None => Ok(None),
    }
}

fn tx_put<T: Serialize>(tree: &TransactionalTree, key: &str, value: &T) -> TxResult<()> {
    let bytes = serde_json::to_vec(value).map_err(abort)?;
    tree.insert(key.as_bytes(), bytes)?;
    Ok(())
}

fn tx_character(tree: &TransactionalTree, id: &str) -> TxResult<Character> {
    tx_get(tree, id)?.ok_or_else(|| abort(StoreError::CharacterNotFound(id.to_string())))
}

fn tx_location(tree: &TransactionalTree, id: &str) -> TxResult<Location> {
    tx_get(tree, id)?.ok_or_else(|| abort(StoreError::LocationNotFound(id.to_string())))
}

/// Trees a change can touch, in transaction order
struct TxTrees<'a> {
    characters: &'a TransactionalTree,
    locations: &'a TransactionalTree,
    listings: &'a TransactionalTree,
    inventory: &'a TransactionalTree,
}

impl TxTrees<'_> {
    fn apply_write(&self, write: &WorldWrite) -> TxResult<()> {
        match write {
            WorldWrite::DrainEnergy {
                character_id,
                amount,
            } => {
                let mut character = tx_character(self.characters, character_id)?;
                character.energy = character.energy.saturating_sub(*amount);
                tx_put(self.characters, character_id, &character)
            }
            WorldWrite::MoveCharacter {
                character_id,
                location_id,
            } => {
                tx_location(self.locations, location_id)?;
                let mut character = tx_character(self.characters, character_id)?;
                character.current_location_id = location_id.clone();
                tx_put(self.characters, character_id, &character)
            }
            WorldWrite::AdjustPlayerCount { location_id, delta } => {
                let mut location = tx_location(self.locations, location_id)?;
                location.player_count = location.player_count.saturating_add_signed(*delta);
                tx_put(self.locations, location_id, &location)
            }
            WorldWrite::TouchLocation { location_id, at } => {
                let mut location = tx_location(self.locations, location_id)?;
                location.last_active = Some(*at);
                tx_put(self.locations, location_id, &location)
            }
            WorldWrite::CreditItem {
                character_id,
                item_id,
                quantity,
            } => {
                let key = inventory_key(character_id, item_id);
                let row = match tx_get::<InventoryEntry>(self.inventory, &key)? {
                    Some(mut row) => {
                        row.quantity = row.quantity.saturating_add(*quantity);
                        row
                    }
                    None => InventoryEntry {
                        character_id: character_id.clone(),
                        item_id: item_id.clone(),
                        quantity: *quantity,
                        is_equipped: false,
                    },
                };
                tx_put(self.inventory, &key, &row)
            }
            WorldWrite::DebitItem {
                character_id,
                item_id,
                quantity,
            } => {
                let key = inventory_key(character_id, item_id);
                let mut row: InventoryEntry = tx_get(self.inventory, &key)?
                    .ok_or_else(|| abort(StoreError::InventoryNotFound(key.clone())))?;
                if row.quantity < *quantity {
                    return Err(abort(StoreError::InsufficientQuantity {
                        key,
                        available: row.quantity,
                        requested: *quantity,
                    }));
                }
                row.quantity -= quantity;
                if row.quantity == 0 {
                    self.inventory.remove(key.as_bytes())?;
                    Ok(())
                } else {
                    tx_put(self.inventory, &key, &row)
                }
            }
            WorldWrite::TakeFromListing {
                listing_id,
                quantity,
            } => {
                let mut listing: MarketListing = tx_get(self.listings, listing_id)?
                    .ok_or_else(|| abort(StoreError::ListingNotFound(listing_id.clone())))?;
                if listing.quantity < *quantity {
                    return Err(abort(StoreError::InsufficientQuantity {
                        key: listing_id.clone(),
                        available: listing.quantity,
                        requested: *quantity,
                    }));
                }
                listing.quantity -= quantity;
                if listing.quantity == 0 {
                    self.listings.remove(listing_id.as_bytes())?;
                    Ok(())
                } else {
                    tx_put(self.listings, listing_id, &listing)
                }
            }
            WorldWrite::SetEquipped {
                character_id,
                item_id,
                equipped,
            } => {
                let key = inventory_key(character_id, item_id);
                let mut row: InventoryEntry = tx_get(self.inventory, &key)?
                    .ok_or_else(|| abort(StoreError::InventoryNotFound(key.clone())))?;
                row.is_equipped = *equipped;
                tx_put(self.inventory, &key, &row)
            }
        }
    }
}

impl WorldStore for SledStore {
    fn characters(&self) -> StoreResult<Vec<Character>> {
        values(self.characters.iter())
    }

    fn character(&self, id: &str) -> StoreResult<Option<Character>> {
        get(&self.characters, id)
    }

    fn locations(&self) -> StoreResult<Vec<Location>> {
        values(self.locations.iter())
    }

    fn items(&self) -> StoreResult<Vec<Item>> {
        values(self.items.iter())
    }

    fn listings(&self) -> StoreResult<Vec<MarketListing>> {
        values(self.listings.iter())
    }

    fn inventory(&self, character_id: &str) -> StoreResult<Vec<InventoryEntry>> {
        values(self.inventory.scan_prefix(format!("{}/", character_id)))
    }

    fn recent_activity(
        &self,
        character_id: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<ActivityEntry>> {
        let mut out = Vec::with_capacity(limit.min(64));
        for result in self.activity.iter().rev() {
            if out.len() >= limit {
                break;
            }
            let (_, value) = result?;
            let entry: ActivityEntry = serde_json::from_slice(&value)?;
            if character_id.map_or(true, |id| entry.character_id == id) {
                out.push(entry);
            }
        }
        Ok(out)
    }

    fn apply(&self, change: &WorldChange) -> StoreResult<ActivityEntry> {
        let id = self.db.generate_id()?;
        let entry = ActivityEntry {
            id,
            character_id: change.entry.character_id.clone(),
            action: change.entry.action,
            description: change.entry.description.clone(),
            changes: change.entry.changes.clone(),
            location_id: change.entry.location_id.clone(),
            created_at: change.entry.created_at,
        };
        let encoded = serde_json::to_vec(&entry)?;

        let result: Result<(), TransactionError<StoreError>> = (
            &self.characters,
            &self.locations,
            &self.listings,
            &self.inventory,
            &self.activity,
        )
            .transaction(|(characters, locations, listings, inventory, activity)| {
                let trees = TxTrees {
                    characters,
                    locations,
                    listings,
                    inventory,
                };
                for write in &change.writes {
                    trees.apply_write(write)?;
                }
                activity.insert(id.to_be_bytes().to_vec(), encoded.clone())?;
                Ok(())
            });

        match result {
            Ok(()) => Ok(entry),
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(err)) => Err(StoreError::Sled(err)),
        }
    }

    fn seed(&self, seed: &WorldSeed) -> StoreResult<()> {
        for character in &seed.characters {
            put(&self.characters, &character.id, &character.normalized())?;
        }
        for location in &seed.locations {
            put(&self.locations, &location.id, location)?;
        }
        for item in &seed.items {
            put(&self.items, &item.id, item)?;
        }
        for listing in &seed.listings {
            put(&self.listings, &listing.id, listing)?;
        }
        for row in &seed.inventory {
            put(&self.inventory, &row.key(), row)?;
        }
        self.flush()?;

        tracing::info!(
            "Seeded world store: {} characters, {} locations",
            seed.characters.len(),
            seed.locations.len()
        );
        Ok(())
    }
}

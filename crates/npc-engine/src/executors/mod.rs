//! Action Executors
//!
//! One executor per action type. An executor checks its preconditions
//! against the batch snapshot, plans a `WorldChange`, and has the store
//! commit it. Unmet preconditions are a `Skipped` outcome, never an error.

mod equipment;
mod market;
mod mine;
mod travel;

pub use market::{base_price, sale_price};
pub use travel::{choose_destination, LocationBias};

use crate::error::EngineResult;
use crate::personality::Personality;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use world_store::{
    ActionType, Character, Item, Location, MarketListing, WorldChange, WorldStore,
};

/// World data read once per batch
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    pub locations: Vec<Location>,
    pub items: HashMap<String, Item>,
    pub listings: Vec<MarketListing>,
}

impl WorldSnapshot {
    /// Read locations, item catalog and market listings from a store
    pub fn load(store: &dyn WorldStore) -> EngineResult<Self> {
        let items = store
            .items()?
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        Ok(Self {
            locations: store.locations()?,
            items,
            listings: store.listings()?,
        })
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    /// Display name for an item id, falling back to the id itself
    pub fn item_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.item(id).map(|item| item.name.as_str()).unwrap_or(id)
    }

    /// Display name for a location id, falling back to the id itself
    pub fn location_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.location(id).map(|l| l.name.as_str()).unwrap_or(id)
    }
}

/// Result reported for an applied action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub description: String,
    pub changes: serde_json::Map<String, serde_json::Value>,
}

/// Why an executor declined to act
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoDestination,
    AlreadyThere,
    NoMiningHere,
    NotEnoughEnergy,
    NoListings,
    NothingAffordable,
    NothingToSell,
    NothingToEquip,
    NothingEquipped,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NoDestination => "no destination found",
            Self::AlreadyThere => "already at destination",
            Self::NoMiningHere => "location has no mining",
            Self::NotEnoughEnergy => "not enough energy",
            Self::NoListings => "no market listings",
            Self::NothingAffordable => "nothing affordable",
            Self::NothingToSell => "no materials to sell",
            Self::NothingToEquip => "nothing to equip",
            Self::NothingEquipped => "nothing equipped",
        };
        f.write_str(reason)
    }
}

/// Outcome of running one executor
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Skipped(SkipReason),
    Applied(ActionResult),
}

/// What an executor intends to do
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Skip(SkipReason),
    Commit(WorldChange),
}

/// Everything an executor may look at
pub struct ActionContext<'a> {
    pub store: &'a dyn WorldStore,
    pub snapshot: &'a WorldSnapshot,
    pub character: &'a Character,
    pub personality: &'a Personality,
    pub location_bias: LocationBias,
}

/// Plan an action without committing it
pub fn plan<R: Rng + ?Sized>(
    action: ActionType,
    ctx: &ActionContext<'_>,
    rng: &mut R,
) -> EngineResult<Plan> {
    match action {
        ActionType::Travel => Ok(travel::plan(ctx, rng)),
        ActionType::Mine => Ok(mine::plan(ctx, rng)),
        ActionType::Buy => Ok(market::plan_buy(ctx, rng)),
        ActionType::Sell => market::plan_sell(ctx, rng),
        ActionType::Equip => equipment::plan_equip(ctx, rng),
        ActionType::Unequip => equipment::plan_unequip(ctx, rng),
    }
}

/// Plan an action and commit it through the store
pub fn execute<R: Rng + ?Sized>(
    action: ActionType,
    ctx: &ActionContext<'_>,
    rng: &mut R,
) -> EngineResult<Outcome> {
    match plan(action, ctx, rng)? {
        Plan::Skip(reason) => {
            tracing::debug!("{} skipped {}: {}", ctx.character.name, action, reason);
            Ok(Outcome::Skipped(reason))
        }
        Plan::Commit(change) => {
            let entry = ctx.store.apply(&change)?;
            tracing::debug!("Activity {}: {}", entry.id, entry.description);
            Ok(Outcome::Applied(ActionResult {
                success: true,
                description: entry.description,
                changes: entry.changes,
            }))
        }
    }
}

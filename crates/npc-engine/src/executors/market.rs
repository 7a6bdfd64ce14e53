//! Buy and Sell executors

use super::{ActionContext, Plan, SkipReason};
use crate::error::EngineResult;
use rand::seq::SliceRandom;
use rand::Rng;
use world_store::{ActionType, ItemCategory, MarketListing, Rarity, WorldChange, WorldWrite};

/// Flat price ceiling for NPC purchases
pub const AFFORDABILITY_CEILING: u64 = 100;

/// Sale prices land between these fractions of the base price
pub const SALE_FACTOR_MIN: f64 = 0.6;
pub const SALE_FACTOR_MAX: f64 = 1.0;

/// Base sale price for a rarity tier
pub fn base_price(rarity: Rarity) -> u64 {
    match rarity {
        Rarity::Common => 15,
        Rarity::Uncommon => 35,
        Rarity::Rare => 75,
        Rarity::Epic => 150,
        Rarity::Legendary => 500,
        Rarity::Unknown => 25,
    }
}

/// Realized price for a sale, rounded down
pub fn sale_price<R: Rng + ?Sized>(rarity: Rarity, rng: &mut R) -> u64 {
    let factor = rng.gen_range(SALE_FACTOR_MIN..=SALE_FACTOR_MAX);
    (base_price(rarity) as f64 * factor).floor() as u64
}

pub(super) fn plan_buy<R: Rng + ?Sized>(ctx: &ActionContext<'_>, rng: &mut R) -> Plan {
    let character = ctx.character;
    let listings = &ctx.snapshot.listings;
    if listings.is_empty() {
        return Plan::Skip(SkipReason::NoListings);
    }

    let affordable: Vec<&MarketListing> = listings
        .iter()
        .filter(|l| l.quantity > 0 && l.price <= AFFORDABILITY_CEILING)
        .collect();
    if affordable.is_empty() {
        return Plan::Skip(SkipReason::NothingAffordable);
    }

    let preferred = ctx.personality.preferred_categories;
    let favored: Vec<&MarketListing> = affordable
        .iter()
        .copied()
        .filter(|l| {
            ctx.snapshot
                .item(&l.item_id)
                .is_some_and(|item| preferred.contains(&item.category))
        })
        .collect();
    let pool = if favored.is_empty() { &affordable } else { &favored };

    let Some(listing) = pool.choose(rng) else {
        return Plan::Skip(SkipReason::NothingAffordable);
    };

    let item_name = ctx.snapshot.item_name(&listing.item_id);
    let location_name = ctx.snapshot.location_name(&listing.location_id);
    let description = format!(
        "{} bought {} for {} coins at {}",
        character.name, item_name, listing.price, location_name
    );

    let change = WorldChange::new(&character.id, ActionType::Buy, description)
        .write(WorldWrite::CreditItem {
            character_id: character.id.clone(),
            item_id: listing.item_id.clone(),
            quantity: 1,
        })
        .write(WorldWrite::TakeFromListing {
            listing_id: listing.id.clone(),
            quantity: 1,
        })
        .at_location(&listing.location_id)
        .detail("itemBought", item_name)
        .detail("price", listing.price)
        .detail("listingId", listing.id.as_str())
        .detail("location", location_name);

    Plan::Commit(change)
}

pub(super) fn plan_sell<R: Rng + ?Sized>(ctx: &ActionContext<'_>, rng: &mut R) -> EngineResult<Plan> {
    let character = ctx.character;
    let inventory = ctx.store.inventory(&character.id)?;

    let sellable: Vec<_> = inventory
        .iter()
        .filter(|row| !row.is_equipped && row.quantity > 0)
        .filter_map(|row| {
            ctx.snapshot
                .item(&row.item_id)
                .filter(|item| item.category == ItemCategory::Material)
                .map(|item| (row, item))
        })
        .collect();

    let Some((row, item)) = sellable.choose(rng) else {
        return Ok(Plan::Skip(SkipReason::NothingToSell));
    };

    let price = sale_price(item.rarity, rng);
    let description = format!("{} sold {} for {} coins", character.name, item.name, price);

    let change = WorldChange::new(&character.id, ActionType::Sell, description)
        .write(WorldWrite::DebitItem {
            character_id: character.id.clone(),
            item_id: row.item_id.clone(),
            quantity: 1,
        })
        .at_location(&character.current_location_id)
        .detail("itemSold", item.name.as_str())
        .detail("price", price)
        .detail("rarity", item.rarity.to_string());

    Ok(Plan::Commit(change))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::{execute, plan, ActionContext, LocationBias, Outcome};
    use super::*;
    use crate::personality::{CASUAL, HARDCORE, SOCIAL};
    use rand::{rngs::StdRng, SeedableRng};
    use world_store::{WorldSeed, WorldStore};

    #[test]
    fn test_sale_price_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for rarity in [
            Rarity::Common,
            Rarity::Uncommon,
            Rarity::Rare,
            Rarity::Epic,
            Rarity::Legendary,
            Rarity::Unknown,
        ] {
            let base = base_price(rarity) as f64;
            for _ in 0..500 {
                let price = sale_price(rarity, &mut rng);
                assert!(price >= (base * 0.6).floor() as u64);
                assert!(price <= base as u64);
            }
        }
    }

    #[test]
    fn test_buy_decrements_listing() {
        let npc = character(50, "plains");
        let (store, snapshot) = world(WorldSeed {
            characters: vec![npc.clone()],
            locations: vec![location("plains", 1, 1)],
            items: vec![item("cap", ItemCategory::Hat, Rarity::Common)],
            listings: vec![listing("l-1", "cap", 40, 3)],
            ..Default::default()
        });
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &CASUAL,
            location_bias: LocationBias::Random,
        };

        let outcome = execute(ActionType::Buy, &ctx, &mut StdRng::seed_from_u64(4)).unwrap();
        assert!(matches!(outcome, Outcome::Applied(ref r) if r.changes["price"] == 40));
        assert_eq!(store.listing("l-1").unwrap().quantity, 2);
        assert_eq!(store.inventory("npc-1").unwrap()[0].quantity, 1);
    }

    #[test]
    fn test_buy_last_unit_deletes_listing() {
        let npc = character(50, "plains");
        let (store, snapshot) = world(WorldSeed {
            characters: vec![npc.clone()],
            locations: vec![location("plains", 1, 1)],
            items: vec![item("cap", ItemCategory::Hat, Rarity::Common)],
            listings: vec![listing("l-1", "cap", 40, 1)],
            inventory: vec![held("cap", 2, false)],
        });
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &CASUAL,
            location_bias: LocationBias::Random,
        };

        execute(ActionType::Buy, &ctx, &mut StdRng::seed_from_u64(4)).unwrap();
        assert!(store.listing("l-1").is_none());
        assert_eq!(store.inventory("npc-1").unwrap()[0].quantity, 3);
    }

    #[test]
    fn test_buy_skips_expensive_listings() {
        let npc = character(50, "plains");
        let (store, snapshot) = world(WorldSeed {
            characters: vec![npc.clone()],
            items: vec![item("crown", ItemCategory::Hat, Rarity::Legendary)],
            listings: vec![listing("l-1", "crown", 101, 1)],
            ..Default::default()
        });
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &CASUAL,
            location_bias: LocationBias::Random,
        };

        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(
            plan(ActionType::Buy, &ctx, &mut rng).unwrap(),
            super::super::Plan::Skip(SkipReason::NothingAffordable)
        );

        let empty = super::super::WorldSnapshot::default();
        let ctx = ActionContext {
            snapshot: &empty,
            ..ctx
        };
        assert_eq!(
            plan(ActionType::Buy, &ctx, &mut rng).unwrap(),
            super::super::Plan::Skip(SkipReason::NoListings)
        );
    }

    #[test]
    fn test_buy_prefers_archetype_categories() {
        let npc = character(50, "plains");
        let (store, snapshot) = world(WorldSeed {
            characters: vec![npc.clone()],
            items: vec![
                item("pickaxe", ItemCategory::Tool, Rarity::Common),
                item("snack", ItemCategory::Consumable, Rarity::Common),
                item("ring", ItemCategory::Accessory, Rarity::Common),
            ],
            listings: vec![
                listing("l-pick", "pickaxe", 30, 50),
                listing("l-snack", "snack", 5, 50),
                listing("l-ring", "ring", 60, 50),
            ],
            ..Default::default()
        });
        let mut rng = StdRng::seed_from_u64(8);

        let miner = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &HARDCORE,
            location_bias: LocationBias::Random,
        };
        for _ in 0..20 {
            let super::super::Plan::Commit(change) = plan(ActionType::Buy, &miner, &mut rng).unwrap()
            else {
                panic!("expected a purchase");
            };
            assert_eq!(change.entry.changes["itemBought"], "pickaxe item");
        }

        let butterfly = ActionContext {
            personality: &SOCIAL,
            ..miner
        };
        for _ in 0..20 {
            let super::super::Plan::Commit(change) =
                plan(ActionType::Buy, &butterfly, &mut rng).unwrap()
            else {
                panic!("expected a purchase");
            };
            assert_ne!(change.entry.changes["itemBought"], "pickaxe item");
        }
    }

    #[test]
    fn test_sell_only_unequipped_materials() {
        let npc = character(50, "plains");
        let (store, snapshot) = world(WorldSeed {
            characters: vec![npc.clone()],
            locations: vec![location("plains", 1, 1)],
            items: vec![
                item("gem", ItemCategory::Material, Rarity::Rare),
                item("cap", ItemCategory::Hat, Rarity::Common),
            ],
            inventory: vec![held("gem", 1, false), held("cap", 1, false)],
            ..Default::default()
        });
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &CASUAL,
            location_bias: LocationBias::Random,
        };

        let outcome = execute(ActionType::Sell, &ctx, &mut StdRng::seed_from_u64(6)).unwrap();
        let Outcome::Applied(result) = outcome else {
            panic!("expected a sale");
        };
        let price = result.changes["price"].as_u64().unwrap();
        assert!((45..=75).contains(&price));

        let remaining = store.inventory("npc-1").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].item_id, "cap");

        // Only the hat is left, which is not a material
        let outcome = execute(ActionType::Sell, &ctx, &mut StdRng::seed_from_u64(6)).unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::NothingToSell));
    }
}

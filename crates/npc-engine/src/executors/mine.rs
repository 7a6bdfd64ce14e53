//! Mine executor

use super::{ActionContext, Plan, SkipReason};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use world_store::{ActionType, WorldChange, WorldWrite};

/// Energy spent per mining attempt
pub const MINING_ENERGY_COST: u8 = 10;

pub(super) fn plan<R: Rng + ?Sized>(ctx: &ActionContext<'_>, rng: &mut R) -> Plan {
    let character = ctx.character;
    let Some(location) = ctx
        .snapshot
        .location(&character.current_location_id)
        .filter(|l| l.is_mineable())
    else {
        return Plan::Skip(SkipReason::NoMiningHere);
    };

    if character.energy < MINING_ENERGY_COST {
        return Plan::Skip(SkipReason::NotEnoughEnergy);
    }

    let remaining_energy = character.energy.saturating_sub(MINING_ENERGY_COST);
    let Some(resource) = location.resources.choose(rng) else {
        return Plan::Skip(SkipReason::NoMiningHere);
    };
    let found = rng.gen::<f64>() < resource.spawn_rate;

    let change = WorldChange::new(&character.id, ActionType::Mine, String::new())
        .write(WorldWrite::DrainEnergy {
            character_id: character.id.clone(),
            amount: MINING_ENERGY_COST,
        })
        .at_location(&location.id)
        .detail("energyCost", MINING_ENERGY_COST)
        .detail("remainingEnergy", remaining_energy)
        .detail("location", location.name.as_str());

    let mut change = if found {
        let item_name = ctx.snapshot.item_name(&resource.item_id);
        let mut change = change
            .write(WorldWrite::CreditItem {
                character_id: character.id.clone(),
                item_id: resource.item_id.clone(),
                quantity: 1,
            })
            .detail("foundItem", item_name);
        if let Some(item) = ctx.snapshot.item(&resource.item_id) {
            change = change.detail("rarity", item.rarity.to_string());
        }
        change.entry.description = format!(
            "{} mined at {} and found {}",
            character.name, location.name, item_name
        );
        change
    } else {
        let mut change = change.detail("foundItem", Value::Null);
        change.entry.description = format!(
            "{} mined at {} but found nothing",
            character.name, location.name
        );
        change
    };
    change.entry.changes.insert("found".to_string(), Value::Bool(found));

    Plan::Commit(change)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::{execute, plan as plan_action, ActionContext, LocationBias, Outcome, Plan};
    use super::*;
    use crate::personality::HARDCORE;
    use rand::{rngs::StdRng, SeedableRng};
    use world_store::{ItemCategory, Rarity, WorldSeed, WorldStore};

    fn seed(energy: u8, spawn_rate: f64) -> WorldSeed {
        WorldSeed {
            characters: vec![character(energy, "quarry")],
            locations: vec![mine("quarry", &[("ore", spawn_rate)]), location("plains", 1, 0)],
            items: vec![item("ore", ItemCategory::Material, Rarity::Common)],
            ..Default::default()
        }
    }

    #[test]
    fn test_certain_find_credits_inventory() {
        let npc = character(50, "quarry");
        let (store, snapshot) = world(seed(50, 1.0));
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &HARDCORE,
            location_bias: LocationBias::Random,
        };

        let outcome = execute(ActionType::Mine, &ctx, &mut StdRng::seed_from_u64(1)).unwrap();
        let Outcome::Applied(result) = outcome else {
            panic!("expected mining to apply");
        };
        assert!(result.success);
        assert_eq!(result.changes["foundItem"], "ore item");
        assert_eq!(store.character("npc-1").unwrap().unwrap().energy, 40);
        assert_eq!(store.inventory("npc-1").unwrap()[0].quantity, 1);
        assert_eq!(store.activity_count(), 1);
    }

    #[test]
    fn test_failed_roll_still_succeeds_and_logs_once() {
        let npc = character(50, "quarry");
        let (store, snapshot) = world(seed(50, 0.0));
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &HARDCORE,
            location_bias: LocationBias::Random,
        };

        let outcome = execute(ActionType::Mine, &ctx, &mut StdRng::seed_from_u64(1)).unwrap();
        let Outcome::Applied(result) = outcome else {
            panic!("expected mining to apply");
        };
        assert!(result.success);
        assert!(result.changes["foundItem"].is_null());
        assert!(result.description.contains("found nothing"));
        assert!(store.inventory("npc-1").unwrap().is_empty());
        assert_eq!(store.activity_count(), 1);
    }

    #[test]
    fn test_energy_never_negative() {
        // Snapshot says 10 but the stored character has 4 left
        let npc = character(10, "quarry");
        let (store, snapshot) = world(seed(4, 1.0));
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &HARDCORE,
            location_bias: LocationBias::Random,
        };

        execute(ActionType::Mine, &ctx, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(store.character("npc-1").unwrap().unwrap().energy, 0);
    }

    #[test]
    fn test_preconditions() {
        let (store, snapshot) = world(seed(50, 1.0));
        let mut rng = StdRng::seed_from_u64(3);

        let tired = character(9, "quarry");
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &tired,
            personality: &HARDCORE,
            location_bias: LocationBias::Random,
        };
        assert_eq!(
            plan_action(ActionType::Mine, &ctx, &mut rng).unwrap(),
            Plan::Skip(SkipReason::NotEnoughEnergy)
        );

        let elsewhere = character(50, "plains");
        let ctx = ActionContext {
            character: &elsewhere,
            ..ctx
        };
        assert_eq!(
            plan_action(ActionType::Mine, &ctx, &mut rng).unwrap(),
            Plan::Skip(SkipReason::NoMiningHere)
        );
        assert_eq!(store.activity_count(), 0);
    }
}

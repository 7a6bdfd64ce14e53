//! Equip and Unequip executors
//!
//! Each equippable category is a single slot: equipping an item first
//! takes off whatever else the character wears in that category.

use super::{ActionContext, Plan, SkipReason};
use crate::error::EngineResult;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use world_store::{ActionType, WorldChange, WorldWrite};

pub(super) fn plan_equip<R: Rng + ?Sized>(
    ctx: &ActionContext<'_>,
    rng: &mut R,
) -> EngineResult<Plan> {
    let character = ctx.character;
    let inventory = ctx.store.inventory(&character.id)?;

    let candidates: Vec<_> = inventory
        .iter()
        .filter(|row| !row.is_equipped)
        .filter_map(|row| {
            ctx.snapshot
                .item(&row.item_id)
                .filter(|item| item.category.is_equippable())
                .map(|item| (row, item))
        })
        .collect();

    let Some((row, item)) = candidates.choose(rng) else {
        return Ok(Plan::Skip(SkipReason::NothingToEquip));
    };

    let mut change = WorldChange::new(
        &character.id,
        ActionType::Equip,
        format!("{} equipped {}", character.name, item.name),
    );

    let mut replaced = Vec::new();
    for worn in inventory.iter().filter(|r| r.is_equipped) {
        let same_slot = ctx
            .snapshot
            .item(&worn.item_id)
            .is_some_and(|other| other.category == item.category);
        if same_slot {
            change = change.write(WorldWrite::SetEquipped {
                character_id: character.id.clone(),
                item_id: worn.item_id.clone(),
                equipped: false,
            });
            replaced.push(Value::from(ctx.snapshot.item_name(&worn.item_id)));
        }
    }

    let change = change
        .write(WorldWrite::SetEquipped {
            character_id: character.id.clone(),
            item_id: row.item_id.clone(),
            equipped: true,
        })
        .at_location(&character.current_location_id)
        .detail("itemEquipped", item.name.as_str())
        .detail("category", item.category.to_string())
        .detail("replaced", Value::Array(replaced));

    Ok(Plan::Commit(change))
}

pub(super) fn plan_unequip<R: Rng + ?Sized>(
    ctx: &ActionContext<'_>,
    rng: &mut R,
) -> EngineResult<Plan> {
    let character = ctx.character;
    let inventory = ctx.store.inventory(&character.id)?;
    let equipped: Vec<_> = inventory.iter().filter(|row| row.is_equipped).collect();

    let Some(row) = equipped.choose(rng) else {
        return Ok(Plan::Skip(SkipReason::NothingEquipped));
    };

    let item_name = ctx.snapshot.item_name(&row.item_id);
    let change = WorldChange::new(
        &character.id,
        ActionType::Unequip,
        format!("{} unequipped {}", character.name, item_name),
    )
    .write(WorldWrite::SetEquipped {
        character_id: character.id.clone(),
        item_id: row.item_id.clone(),
        equipped: false,
    })
    .at_location(&character.current_location_id)
    .detail("itemUnequipped", item_name);

    Ok(Plan::Commit(change))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::{execute, ActionContext, LocationBias, Outcome};
    use super::*;
    use crate::personality::CASUAL;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashMap;
    use world_store::{ItemCategory, MemoryStore, Rarity, WorldSeed, WorldStore};

    fn equipped_per_category(store: &MemoryStore, snapshot: &super::super::WorldSnapshot) -> HashMap<ItemCategory, usize> {
        let mut counts = HashMap::new();
        for row in store.inventory("npc-1").unwrap().iter().filter(|r| r.is_equipped) {
            let category = snapshot.item(&row.item_id).unwrap().category;
            *counts.entry(category).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_equip_keeps_one_item_per_slot() {
        let npc = character(50, "plains");
        let (store, snapshot) = world(WorldSeed {
            characters: vec![npc.clone()],
            items: vec![
                item("cap", ItemCategory::Hat, Rarity::Common),
                item("helmet", ItemCategory::Hat, Rarity::Rare),
                item("crown", ItemCategory::Hat, Rarity::Epic),
                item("pickaxe", ItemCategory::Tool, Rarity::Common),
                item("ore", ItemCategory::Material, Rarity::Common),
            ],
            inventory: vec![
                held("cap", 1, true),
                held("helmet", 1, false),
                held("crown", 1, false),
                held("pickaxe", 1, false),
                held("ore", 5, false),
            ],
            ..Default::default()
        });
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &CASUAL,
            location_bias: LocationBias::Random,
        };

        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..10 {
            let outcome = execute(ActionType::Equip, &ctx, &mut rng).unwrap();
            assert!(matches!(outcome, Outcome::Applied(_)));
            assert!(equipped_per_category(&store, &snapshot).values().all(|n| *n <= 1));
        }

        let ore = store
            .inventory("npc-1")
            .unwrap()
            .into_iter()
            .find(|r| r.item_id == "ore")
            .unwrap();
        assert!(!ore.is_equipped);
    }

    #[test]
    fn test_equip_nothing_eligible() {
        let npc = character(50, "plains");
        let (store, snapshot) = world(WorldSeed {
            characters: vec![npc.clone()],
            items: vec![
                item("ore", ItemCategory::Material, Rarity::Common),
                item("cap", ItemCategory::Hat, Rarity::Common),
            ],
            inventory: vec![held("ore", 5, false), held("cap", 1, true)],
            ..Default::default()
        });
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &CASUAL,
            location_bias: LocationBias::Random,
        };

        let outcome = execute(ActionType::Equip, &ctx, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::NothingToEquip));
    }

    #[test]
    fn test_unequip() {
        let npc = character(50, "plains");
        let (store, snapshot) = world(WorldSeed {
            characters: vec![npc.clone()],
            items: vec![item("cap", ItemCategory::Hat, Rarity::Common)],
            inventory: vec![held("cap", 1, true)],
            ..Default::default()
        });
        let ctx = ActionContext {
            store: &store,
            snapshot: &snapshot,
            character: &npc,
            personality: &CASUAL,
            location_bias: LocationBias::Random,
        };
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = execute(ActionType::Unequip, &ctx, &mut rng).unwrap();
        let Outcome::Applied(result) = outcome else {
            panic!("expected unequip to apply");
        };
        assert_eq!(result.changes["itemUnequipped"], "cap item");
        assert!(!store.inventory("npc-1").unwrap()[0].is_equipped);

        let outcome = execute(ActionType::Unequip, &ctx, &mut rng).unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::NothingEquipped));
    }
}

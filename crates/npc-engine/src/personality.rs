//! Personality Catalog
//!
//! Static weighting profiles assigned to NPCs for one batch turn. A profile
//! controls which actions an NPC prefers, when it feels tired, how much
//! danger it seeks out when traveling, and what it likes to buy.

use world_store::{ActionType, ItemCategory};

/// A named weighting profile
#[derive(Debug, PartialEq)]
pub struct Personality {
    pub key: &'static str,
    pub display_name: &'static str,
    /// Preference per action type; unlisted actions fall back to a small default
    pub action_weights: &'static [(ActionType, f64)],
    /// Below this energy the NPC avoids draining actions
    pub energy_threshold: u8,
    /// 0.0 (safe) to 1.0 (reckless), matched against location difficulty
    pub risk_tolerance: f64,
    /// 0.0 (frugal) to 1.0 (spendthrift)
    pub spending_habit: f64,
    /// Categories favored when buying
    pub preferred_categories: &'static [ItemCategory],
}

impl Personality {
    /// Configured weight for an action, if any
    pub fn weight(&self, action: ActionType) -> Option<f64> {
        self.action_weights
            .iter()
            .find(|(listed, _)| *listed == action)
            .map(|(_, weight)| *weight)
    }
}

pub const CASUAL: Personality = Personality {
    key: "casual",
    display_name: "Casual Explorer",
    action_weights: &[
        (ActionType::Travel, 0.35),
        (ActionType::Mine, 0.20),
        (ActionType::Buy, 0.20),
        (ActionType::Sell, 0.10),
        (ActionType::Equip, 0.10),
        (ActionType::Unequip, 0.05),
    ],
    energy_threshold: 30,
    risk_tolerance: 0.3,
    spending_habit: 0.4,
    preferred_categories: &[],
};

pub const HARDCORE: Personality = Personality {
    key: "hardcore",
    display_name: "Hardcore Miner",
    action_weights: &[
        (ActionType::Mine, 0.50),
        (ActionType::Travel, 0.20),
        (ActionType::Sell, 0.15),
        (ActionType::Buy, 0.10),
        (ActionType::Equip, 0.05),
    ],
    energy_threshold: 20,
    risk_tolerance: 0.8,
    spending_habit: 0.2,
    preferred_categories: &[ItemCategory::Tool, ItemCategory::Hat],
};

pub const SOCIAL: Personality = Personality {
    key: "social",
    display_name: "Social Butterfly",
    action_weights: &[
        (ActionType::Travel, 0.40),
        (ActionType::Buy, 0.30),
        (ActionType::Equip, 0.15),
        (ActionType::Mine, 0.10),
        (ActionType::Unequip, 0.05),
    ],
    energy_threshold: 40,
    risk_tolerance: 0.4,
    spending_habit: 0.7,
    preferred_categories: &[ItemCategory::Consumable, ItemCategory::Accessory],
};

pub const TRADER: Personality = Personality {
    key: "trader",
    display_name: "Market Trader",
    action_weights: &[
        (ActionType::Buy, 0.35),
        (ActionType::Sell, 0.35),
        (ActionType::Travel, 0.20),
        (ActionType::Mine, 0.10),
    ],
    energy_threshold: 35,
    risk_tolerance: 0.5,
    spending_habit: 0.8,
    preferred_categories: &[ItemCategory::Material, ItemCategory::Consumable],
};

pub const EXPLORER: Personality = Personality {
    key: "explorer",
    display_name: "Wanderer",
    action_weights: &[
        (ActionType::Travel, 0.60),
        (ActionType::Mine, 0.20),
        (ActionType::Buy, 0.10),
        (ActionType::Equip, 0.10),
    ],
    energy_threshold: 25,
    risk_tolerance: 0.9,
    spending_habit: 0.3,
    preferred_categories: &[ItemCategory::Clothing, ItemCategory::Hat],
};

/// Every known personality
pub static CATALOG: [&Personality; 5] = [&CASUAL, &HARDCORE, &SOCIAL, &TRADER, &EXPLORER];

/// Pool used when a request names none (or only unknown ones)
pub const DEFAULT_POOL: [&str; 3] = ["casual", "hardcore", "social"];

/// Find a personality by key
pub fn lookup(key: &str) -> Option<&'static Personality> {
    CATALOG
        .iter()
        .copied()
        .find(|p| p.key.eq_ignore_ascii_case(key.trim()))
}

/// Resolve requested keys into a non-empty pool
pub fn resolve_pool<S: AsRef<str>>(keys: &[S]) -> Vec<&'static Personality> {
    let mut pool = Vec::with_capacity(keys.len());
    for key in keys {
        match lookup(key.as_ref()) {
            Some(personality) => pool.push(personality),
            None => tracing::warn!("Ignoring unknown personality: {}", key.as_ref()),
        }
    }

    if pool.is_empty() {
        pool = DEFAULT_POOL.iter().filter_map(|key| lookup(key)).collect();
    }
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("Hardcore").unwrap().display_name, "Hardcore Miner");
        assert!(lookup("grumpy").is_none());
    }

    #[test]
    fn test_resolve_pool_falls_back_to_defaults() {
        let pool = resolve_pool(&["grumpy", "sleepy"]);
        let keys: Vec<_> = pool.iter().map(|p| p.key).collect();
        assert_eq!(keys, DEFAULT_POOL);

        let pool = resolve_pool(&["trader", "grumpy"]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].key, "trader");
    }

    #[test]
    fn test_catalog_values_in_range() {
        for personality in CATALOG {
            assert!((0.0..=1.0).contains(&personality.risk_tolerance));
            assert!((0.0..=1.0).contains(&personality.spending_habit));
            assert!(personality.energy_threshold <= 80);
            assert!(personality.action_weights.iter().all(|(_, w)| *w > 0.0));
        }
    }
}

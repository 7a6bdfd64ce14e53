//! Action Selector
//!
//! Energy-adjusted weighted random choice over the allowed action types.

use crate::personality::Personality;
use rand::Rng;
use world_store::{ActionType, Character};

/// Below this energy an NPC is too tired to act unless forced
pub const MIN_ACTION_ENERGY: u8 = 5;

/// Weight for actions a personality does not list
pub const DEFAULT_WEIGHT: f64 = 0.05;

/// Scale applied to draining actions when below the personality threshold
pub const TIRED_DRAIN_FACTOR: f64 = 0.2;

/// Scale applied to buying when below the personality threshold
pub const TIRED_BUY_FACTOR: f64 = 1.5;

/// Energy above which draining actions become more attractive
pub const ENERGETIC_LEVEL: u8 = 80;

/// Scale applied to draining actions when energetic
pub const ENERGETIC_DRAIN_FACTOR: f64 = 1.5;

/// Weight of one action after state-dependent adjustment.
///
/// High energy takes precedence over the personality threshold, which keeps
/// the two adjustments mutually exclusive.
pub fn effective_weight(action: ActionType, personality: &Personality, energy: u8) -> f64 {
    let base = personality.weight(action).unwrap_or(DEFAULT_WEIGHT);

    if energy > ENERGETIC_LEVEL {
        if action.drains_energy() {
            return base * ENERGETIC_DRAIN_FACTOR;
        }
    } else if energy < personality.energy_threshold {
        if action.drains_energy() {
            return base * TIRED_DRAIN_FACTOR;
        }
        if action == ActionType::Buy {
            return base * TIRED_BUY_FACTOR;
        }
    }
    base
}

/// Adjusted weights for every allowed action, in order
pub fn effective_weights(
    allowed: &[ActionType],
    personality: &Personality,
    energy: u8,
) -> Vec<(ActionType, f64)> {
    allowed
        .iter()
        .map(|action| (*action, effective_weight(*action, personality, energy)))
        .collect()
}

/// Pick an action for a character, or `None` if it should sit this turn out
pub fn select_action<R: Rng + ?Sized>(
    allowed: &[ActionType],
    personality: &Personality,
    character: &Character,
    force_actions: bool,
    rng: &mut R,
) -> Option<ActionType> {
    if character.energy < MIN_ACTION_ENERGY && !force_actions {
        tracing::debug!("{} is too tired to act ({} energy)", character.name, character.energy);
        return None;
    }

    let weights = effective_weights(allowed, personality, character.energy);
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return None;
    }

    let mut remaining = rng.gen::<f64>() * total;
    for (action, weight) in &weights {
        remaining -= weight;
        if remaining <= 0.0 {
            return Some(*action);
        }
    }

    // Floating point residue
    allowed.first().copied()
}

//! Batch Orchestrator
//!
//! Runs a bounded number of NPC turns against one world snapshot. Characters
//! are sampled without replacement, so nobody acts twice in a batch.

use crate::error::{EngineError, EngineResult};
use crate::executors::{self, ActionContext, LocationBias, Outcome, WorldSnapshot};
use crate::personality::{self, Personality, DEFAULT_POOL};
use crate::selector::select_action;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use world_store::{ActionType, Character, WorldStore};

/// Actions allowed when a request names none
pub const DEFAULT_ACTIVITY_TYPES: [ActionType; 3] =
    [ActionType::Travel, ActionType::Mine, ActionType::Buy];

pub const DEFAULT_ACTIVITY_COUNT: usize = 5;
pub const DEFAULT_MARKET_VOLATILITY: f64 = 0.3;

/// The player character the simulation must never drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedCharacter {
    pub name: String,
    pub id: String,
}

impl Default for ExcludedCharacter {
    fn default() -> Self {
        Self {
            name: "Wojak #1337".to_string(),
            id: "main-character".to_string(),
        }
    }
}

impl ExcludedCharacter {
    pub fn matches(&self, character: &Character) -> bool {
        character.name == self.name || character.id == self.id
    }
}

/// Parameters for one batch
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub activity_count: usize,
    pub activity_types: Vec<ActionType>,
    pub location_bias: LocationBias,
    pub personalities: Vec<&'static Personality>,
    /// Accepted and reported; no executor reads it yet
    pub market_volatility: f64,
    /// Let exhausted characters act anyway
    pub force_actions: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            activity_count: DEFAULT_ACTIVITY_COUNT,
            activity_types: DEFAULT_ACTIVITY_TYPES.to_vec(),
            location_bias: LocationBias::Random,
            personalities: personality::resolve_pool(&DEFAULT_POOL[..]),
            market_volatility: DEFAULT_MARKET_VOLATILITY,
            force_actions: false,
        }
    }
}

/// One action taken during a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub character_id: String,
    pub character_name: String,
    pub personality: String,
    pub action: ActionType,
    pub success: bool,
    pub description: String,
    pub changes: serde_json::Map<String, serde_json::Value>,
}

/// Everything a batch produced
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub actions: Vec<ActionRecord>,
    /// Turns requested by the caller
    pub requested: usize,
    /// Characters that were eligible to act
    pub eligible: usize,
    /// Turns that produced no action
    pub skipped: usize,
    /// Executors that failed mid-commit
    pub failed: usize,
}

/// Drives NPC turns against an injected store
#[derive(Clone)]
pub struct ActivityEngine {
    store: Arc<dyn WorldStore>,
    excluded: ExcludedCharacter,
}

impl ActivityEngine {
    pub fn new(store: Arc<dyn WorldStore>) -> Self {
        Self {
            store,
            excluded: ExcludedCharacter::default(),
        }
    }

    /// Override the protected main character
    pub fn with_excluded(mut self, excluded: ExcludedCharacter) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn store(&self) -> &Arc<dyn WorldStore> {
        &self.store
    }

    /// Characters the engine may drive
    pub fn eligible_characters(&self) -> EngineResult<Vec<Character>> {
        Ok(self
            .store
            .characters()?
            .into_iter()
            .filter(|c| !self.excluded.matches(c))
            .collect())
    }

    /// Run one batch of NPC turns
    pub fn run_batch<R: Rng + ?Sized>(
        &self,
        config: &BatchConfig,
        rng: &mut R,
    ) -> EngineResult<BatchReport> {
        let mut candidates = self.eligible_characters()?;
        if candidates.is_empty() {
            return Err(EngineError::NoEligibleCharacters);
        }

        let snapshot = WorldSnapshot::load(self.store.as_ref())?;
        let personalities = if config.personalities.is_empty() {
            personality::resolve_pool(&DEFAULT_POOL[..])
        } else {
            config.personalities.clone()
        };

        tracing::info!(
            "Running NPC batch: {} turns requested, {} eligible, bias {}, volatility {:.2}",
            config.activity_count,
            candidates.len(),
            config.location_bias,
            config.market_volatility
        );

        let mut report = BatchReport {
            requested: config.activity_count,
            eligible: candidates.len(),
            ..Default::default()
        };

        candidates.shuffle(rng);
        candidates.truncate(config.activity_count);

        for character in &candidates {
            let Some(personality) = personalities.choose(rng).copied() else {
                break;
            };

            match self.take_turn(character, personality, &snapshot, config, rng) {
                Ok(Some(record)) => report.actions.push(record),
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!("NPC {} ({}) action failed: {}", character.name, character.id, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "NPC batch complete: {} actions, {} skipped, {} failed",
            report.actions.len(),
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    fn take_turn<R: Rng + ?Sized>(
        &self,
        character: &Character,
        personality: &'static Personality,
        snapshot: &WorldSnapshot,
        config: &BatchConfig,
        rng: &mut R,
    ) -> EngineResult<Option<ActionRecord>> {
        let Some(action) = select_action(
            &config.activity_types,
            personality,
            character,
            config.force_actions,
            rng,
        ) else {
            return Ok(None);
        };

        let ctx = ActionContext {
            store: self.store.as_ref(),
            snapshot,
            character,
            personality,
            location_bias: config.location_bias,
        };

        match executors::execute(action, &ctx, rng)? {
            Outcome::Skipped(_) => Ok(None),
            Outcome::Applied(result) => Ok(Some(ActionRecord {
                character_id: character.id.clone(),
                character_name: character.name.clone(),
                personality: personality.display_name.to_string(),
                action,
                success: result.success,
                description: result.description,
                changes: result.changes,
            })),
        }
    }
}

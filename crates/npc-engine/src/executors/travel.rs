//! Travel executor

use super::{ActionContext, Plan, SkipReason};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use world_store::{ActionType, Location, WorldChange, WorldWrite};

/// How many of the busiest locations `Popular` picks from
pub const POPULAR_TOP_N: usize = 5;

/// Maximum distance between normalized difficulty and risk tolerance
pub const DIFFICULTY_WINDOW: f64 = 0.4;

/// Destination strategy
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LocationBias {
    #[default]
    Random,
    Popular,
    DifficultyBased,
}

impl LocationBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Popular => "popular",
            Self::DifficultyBased => "difficulty-based",
        }
    }
}

impl fmt::Display for LocationBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LocationBias {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "popular" => Ok(Self::Popular),
            "difficulty-based" | "difficulty" => Ok(Self::DifficultyBased),
            other => Err(format!("unknown location bias: {}", other)),
        }
    }
}

/// Pick a destination according to the strategy
pub fn choose_destination<'a, R: Rng + ?Sized>(
    locations: &'a [Location],
    bias: LocationBias,
    risk_tolerance: f64,
    rng: &mut R,
) -> Option<&'a Location> {
    match bias {
        LocationBias::Random => locations.choose(rng),
        LocationBias::Popular => {
            let mut busiest: Vec<&Location> = locations.iter().collect();
            busiest.sort_by(|a, b| b.player_count.cmp(&a.player_count));
            busiest.truncate(POPULAR_TOP_N);
            busiest.choose(rng).copied()
        }
        LocationBias::DifficultyBased => {
            let suitable: Vec<&Location> = locations
                .iter()
                .filter(|l| (l.normalized_difficulty() - risk_tolerance).abs() <= DIFFICULTY_WINDOW)
                .collect();
            if suitable.is_empty() {
                locations.first()
            } else {
                suitable.choose(rng).copied()
            }
        }
    }
}

pub(super) fn plan<R: Rng + ?Sized>(ctx: &ActionContext<'_>, rng: &mut R) -> Plan {
    let character = ctx.character;
    let Some(destination) = choose_destination(
        &ctx.snapshot.locations,
        ctx.location_bias,
        ctx.personality.risk_tolerance,
        rng,
    ) else {
        return Plan::Skip(SkipReason::NoDestination);
    };

    if destination.id == character.current_location_id {
        return Plan::Skip(SkipReason::AlreadyThere);
    }

    let from_name = ctx.snapshot.location_name(&character.current_location_id);
    let description = format!(
        "{} traveled from {} to {}",
        character.name, from_name, destination.name
    );

    let mut change = WorldChange::new(&character.id, ActionType::Travel, description)
        .write(WorldWrite::MoveCharacter {
            character_id: character.id.clone(),
            location_id: destination.id.clone(),
        });

    if ctx.snapshot.location(&character.current_location_id).is_some() {
        change = change.write(WorldWrite::AdjustPlayerCount {
            location_id: character.current_location_id.clone(),
            delta: -1,
        });
    }

    let change = change
        .write(WorldWrite::AdjustPlayerCount {
            location_id: destination.id.clone(),
            delta: 1,
        })
        .write(WorldWrite::TouchLocation {
            location_id: destination.id.clone(),
            at: Utc::now(),
        })
        .at_location(&destination.id)
        .detail("from", from_name)
        .detail("to", destination.name.as_str())
        .detail("toLocationId", destination.id.as_str())
        .detail("strategy", ctx.location_bias.as_str());

    Plan::Commit(change)
}

//! API Methods - request handlers for the activity endpoint
//!
//! Request bodies are lenient: anything missing or malformed falls back to
//! the defaults rather than failing the call.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use npc_engine::{
    personality, ActionRecord, ActivityEngine, BatchConfig, BatchReport, EngineError,
    LocationBias, DEFAULT_ACTIVITY_COUNT, DEFAULT_ACTIVITY_TYPES, DEFAULT_MARKET_VOLATILITY,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use world_store::{ActionType, ActivityEntry};

/// Default number of feed entries returned
pub const DEFAULT_FEED_LIMIT: usize = 20;

/// Largest feed page
pub const MAX_FEED_LIMIT: usize = 200;

/// Context shared across handlers
pub struct ServerContext {
    pub engine: ActivityEngine,
    /// Upper bound on `activityCount` per call
    pub max_activity_count: usize,
}

// ============ Request/Response Types ============

/// Batch request body; every field is optional
#[derive(Debug, Default, PartialEq)]
pub struct GenerateActivityRequest {
    pub activity_count: Option<usize>,
    pub activity_types: Option<Vec<String>>,
    pub location_bias: Option<String>,
    pub npc_personalities: Option<Vec<String>>,
    pub market_volatility: Option<f64>,
    pub force_actions: Option<bool>,
}

impl GenerateActivityRequest {
    /// Parse a request body field by field.
    ///
    /// A field with the wrong type falls back to its own default; only a
    /// body that is not a JSON object falls back entirely.
    pub fn parse(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Self::from_fields(&fields),
            Ok(other) => {
                tracing::warn!("Activity request is not a JSON object, using defaults: {}", other);
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Malformed activity request, using defaults: {}", e);
                Self::default()
            }
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            activity_count: field(fields, "activityCount", |v| {
                v.as_u64().and_then(|n| usize::try_from(n).ok())
            }),
            activity_types: field(fields, "activityTypes", string_list),
            location_bias: field(fields, "locationBias", |v| v.as_str().map(str::to_string)),
            npc_personalities: field(fields, "npcPersonalities", string_list),
            market_volatility: field(fields, "marketVolatility", Value::as_f64),
            force_actions: field(fields, "forceActions", Value::as_bool),
        }
    }

    /// Resolve into a batch configuration
    pub fn into_config(self, max_activity_count: usize) -> BatchConfig {
        let activity_count = self
            .activity_count
            .unwrap_or(DEFAULT_ACTIVITY_COUNT)
            .min(max_activity_count);

        let mut activity_types: Vec<ActionType> = Vec::new();
        for name in self.activity_types.unwrap_or_default() {
            match name.parse::<ActionType>() {
                Ok(action) if !activity_types.contains(&action) => activity_types.push(action),
                Ok(_) => {}
                Err(e) => tracing::warn!("Ignoring {}", e),
            }
        }
        if activity_types.is_empty() {
            activity_types = DEFAULT_ACTIVITY_TYPES.to_vec();
        }

        let location_bias = match self.location_bias.as_deref().map(str::parse::<LocationBias>) {
            Some(Ok(bias)) => bias,
            Some(Err(e)) => {
                tracing::warn!("{}, traveling at random", e);
                LocationBias::Random
            }
            None => LocationBias::Random,
        };

        let personalities = match self.npc_personalities {
            Some(keys) => personality::resolve_pool(keys.as_slice()),
            None => personality::resolve_pool(&personality::DEFAULT_POOL[..]),
        };

        let market_volatility = self
            .market_volatility
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_MARKET_VOLATILITY)
            .clamp(0.0, 1.0);

        BatchConfig {
            activity_count,
            activity_types,
            location_bias,
            personalities,
            market_volatility,
            force_actions: self.force_actions.unwrap_or(false),
        }
    }
}

/// Read one optional field, warning when it is present but unusable
fn field<T>(
    fields: &Map<String, Value>,
    key: &str,
    read: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let parsed = read(value);
            if parsed.is_none() {
                tracing::warn!("Ignoring invalid {}: {}", key, value);
            }
            parsed
        }
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item.as_str() {
                Some(text) => Some(text.to_string()),
                None => {
                    tracing::warn!("Ignoring non-string list entry: {}", item);
                    None
                }
            })
            .collect(),
    )
}

#[derive(Debug, Serialize)]
pub struct GenerateActivityResponse {
    pub success: bool,
    pub message: String,
    pub actions: Vec<ActionRecord>,
    pub timestamp: String,
}

impl From<BatchReport> for GenerateActivityResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            success: true,
            message: format!("Generated {} NPC activities", report.actions.len()),
            actions: report.actions,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityQuery {
    pub limit: Option<usize>,
    pub character_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityFeedResponse {
    pub entries: Vec<ActivityEntry>,
}

// ============ Handlers ============

/// Run one NPC batch on the blocking pool
pub async fn handle_generate_activity(
    ctx: &ServerContext,
    request: GenerateActivityRequest,
) -> Result<GenerateActivityResponse, ApiError> {
    let config = request.into_config(ctx.max_activity_count);
    let engine = ctx.engine.clone();

    let report = tokio::task::spawn_blocking(move || {
        let mut rng = StdRng::from_entropy();
        engine.run_batch(&config, &mut rng)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("batch task failed: {}", e)))??;

    Ok(report.into())
}

/// Read the most recent activity records
pub fn handle_recent_activity(
    ctx: &ServerContext,
    query: ActivityQuery,
) -> Result<ActivityFeedResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT).min(MAX_FEED_LIMIT);
    let entries = ctx
        .engine
        .store()
        .recent_activity(query.character_id.as_deref(), limit)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(ActivityFeedResponse { entries })
}

// ============ Error Types ============

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No NPC characters available")]
    NoCharacters,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::NoEligibleCharacters => Self::NoCharacters,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NoCharacters => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "No NPC characters available",
                    "message": "Every character is excluded from simulation",
                }),
            ),
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "error": "Method not allowed" }),
            ),
            Self::Internal(message) => {
                tracing::error!("Failed to generate NPC activity: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Failed to generate NPC activity",
                        "message": message,
                    }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

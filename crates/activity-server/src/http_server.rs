//! HTTP Activity Server
//!
//! Exposes the batch generator on `POST /` and `POST /generate-npc-activity`,
//! plus a small read-only activity feed.

use crate::methods::{
    handle_generate_activity, handle_recent_activity, ActivityFeedResponse, ActivityQuery,
    ApiError, GenerateActivityRequest, GenerateActivityResponse, ServerContext,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, Method, StatusCode},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// HTTP server for the NPC activity endpoint
pub struct ActivityServer {
    context: Arc<ServerContext>,
}

impl ActivityServer {
    pub fn new(context: Arc<ServerContext>) -> Self {
        Self { context }
    }

    /// Create the Axum router
    pub fn router(self) -> Router {
        // Browser clients call this cross-origin
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

        Router::new()
            .route("/", generate_route())
            .route("/generate-npc-activity", generate_route())
            .route("/activity", get(recent_activity))
            .route("/health", get(health))
            .layer(cors)
            .with_state(self.context)
    }

    /// Run the server
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("NPC activity server listening on {}", addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// POST runs a batch, anything else is 405.
///
/// OPTIONS never reaches this router: the CORS layer answers every OPTIONS
/// request itself with 200.
fn generate_route() -> MethodRouter<Arc<ServerContext>> {
    post(generate).fallback(method_not_allowed)
}

async fn generate(
    State(context): State<Arc<ServerContext>>,
    body: Bytes,
) -> Result<Json<GenerateActivityResponse>, ApiError> {
    let request = GenerateActivityRequest::parse(&body);
    tracing::debug!("Generate activity request: {:?}", request);
    let response = handle_generate_activity(&context, request).await?;
    Ok(Json(response))
}

async fn recent_activity(
    State(context): State<Arc<ServerContext>>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityFeedResponse>, ApiError> {
    Ok(Json(handle_recent_activity(&context, query)?))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn health() -> &'static str {
    "ok"
}

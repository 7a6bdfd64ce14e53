//! Activity Server - HTTP surface for the NPC engine
//!
//! Endpoints:
//! - `POST /` and `POST /generate-npc-activity`: run one batch of NPC turns
//! - `GET /activity`: recent activity records, newest first
//! - `GET /health`

pub mod http_server;
pub mod methods;

pub use http_server::ActivityServer;
pub use methods::{ApiError, GenerateActivityRequest, ServerContext};

/// Activity server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// HTTP bind address
    pub http_addr: String,
    /// Upper bound on `activityCount` per request
    pub max_activity_count: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8888".to_string(),
            max_activity_count: 50,
        }
    }
}

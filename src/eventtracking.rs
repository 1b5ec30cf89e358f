//! Best-effort usage telemetry

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const EVENT_ID_CREATE_ACCOUNT_START: &str = "create_account_start";
pub const EVENT_ID_CREATE_ACCOUNT_END: &str = "create_account_end";

/// Fire-and-forget analytics sink. Implementations never fail the caller.
#[async_trait]
pub trait EventTracker: Send + Sync {
    async fn track(&self, event_id: &str, payload: Value);
}

pub struct NoopTracker;

#[async_trait]
impl EventTracker for NoopTracker {
    async fn track(&self, event_id: &str, _payload: Value) {
        debug!("Telemetry disabled, dropping {}", event_id);
    }
}

pub struct HttpEventTracker {
    endpoint: String,
    distinct_id: String,
    client: Client,
}

impl HttpEventTracker {
    pub fn new(endpoint: String, distinct_id: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { endpoint, distinct_id, client }
    }

    fn event_body(&self, event_id: &str, payload: Value) -> Value {
        json!({
            "event": event_id,
            "properties": payload,
            "distinct_id": self.distinct_id,
            "time": chrono::Utc::now().timestamp(),
        })
    }
}

#[async_trait]
impl EventTracker for HttpEventTracker {
    async fn track(&self, event_id: &str, payload: Value) {
        let body = self.event_body(event_id, payload);
        match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => debug!("Tracked {}", event_id),
            Ok(resp) => warn!("Telemetry endpoint returned {} for {}", resp.status(), event_id),
            Err(e) => warn!("Failed to send telemetry event {}: {}", event_id, e),
        }
    }
}

/// Persisted per-install telemetry identity (`settings.json`)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSettings {
    pub tracking_session_id: String,
}

impl TrackingSettings {
    /// Reads the install id, creating it on first use. Never fails; an
    /// unreadable file just yields a fresh id.
    pub fn load_or_create(path: &Path) -> Self {
        if let Ok(s) = std::fs::read_to_string(path) {
            match serde_json::from_str::<TrackingSettings>(&s) {
                Ok(settings) => return settings,
                Err(e) => warn!("Ignoring unreadable settings file {}: {}", path.display(), e),
            }
        }

        let settings = TrackingSettings { tracking_session_id: uuid::Uuid::new_v4().to_string() };
        if let Some(dir) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                debug!("Could not create settings directory {}: {}", dir.display(), e);
            }
        }
        if let Ok(s) = serde_json::to_string_pretty(&settings) {
            if let Err(e) = std::fs::write(path, s) {
                debug!("Could not persist settings to {}: {}", path.display(), e);
            }
        }
        settings
    }
}

use serde::{Deserialize, Serialize};

use crate::sync::TriggerOutcome;

// JWT claims; tokens are issued elsewhere and only verified here.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i32,
    pub exp: usize,
}

/// Request extension set by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequestResponse {
    pub user_id: i32,
    pub status: &'static str,
}

impl SyncRequestResponse {
    pub fn new(user_id: i32, outcome: TriggerOutcome) -> Self {
        let status = match outcome {
            TriggerOutcome::Queued => "queued",
            TriggerOutcome::Coalesced => "coalesced",
        };
        Self { user_id, status }
    }
}

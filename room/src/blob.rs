use serde::{Deserialize, Serialize};
use types::{PrivateState, PublicState};

/// Everything stored under one room key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBlob {
    pub public_state: PublicState,
    pub private_state: PrivateState,
    pub host_heartbeat: i64,
}

/// What a Display decodes. The private partition is never deserialized.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayView {
    pub public_state: PublicState,
    #[serde(default)]
    pub host_heartbeat: i64,
}

/// What a Host decodes when taking over a room.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostView {
    pub private_state: PrivateState,
}

/// Top-level patch that refreshes only the heartbeat.
pub fn heartbeat_patch(now_ms: i64) -> serde_json::Value {
    serde_json::json!({ "hostHeartbeat": now_ms })
}

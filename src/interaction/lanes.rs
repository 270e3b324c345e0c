//! The Traffic Light lane table.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::base::types::Lane;

/// One row of the lane table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneInfo {
    /// The lane.
    pub lane: Lane,
    /// Maximum tasks in the lane; `null` for storage.
    pub limit: Option<usize>,
    /// Human-readable time box.
    pub time_box: String,
    /// Default focus session length, in minutes.
    pub focus_minutes: u32,
}

impl From<Lane> for LaneInfo {
    fn from(lane: Lane) -> Self {
        Self {
            lane,
            limit: lane.limit(),
            time_box: lane.time_box().to_string(),
            focus_minutes: lane.focus_minutes(),
        }
    }
}

/// `GET /api/lanes`.
pub async fn get_lanes() -> Json<Vec<LaneInfo>> {
    Json(Lane::ALL.into_iter().map(LaneInfo::from).collect())
}

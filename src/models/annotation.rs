use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form metadata attached to experiments, samples and results. Always
/// delivered inline, so it is a plain record rather than a lazy entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    pub id: Option<i64>,
    pub data: Option<Value>,
    pub is_ccdl: Option<bool>,
    #[serde(with = "crate::entity::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::entity::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
}

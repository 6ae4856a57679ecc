use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, Resource, lazy_fields};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorRecord {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub docker_image: Option<String>,
    pub environment: Option<Value>,
}

impl Resource for ProcessorRecord {
    const NAME: &'static str = "Processor";
    const ENDPOINT: &'static str = "processors";
    type Key = i64;

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn keyed(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}

/// A processing step (pipeline, version and container) that produced results.
pub type Processor = Entity<ProcessorRecord>;

lazy_fields!(ProcessorRecord {
    id: Option<i64>,
    name: Option<String>,
    version: Option<String>,
    docker_image: Option<String>,
    environment: Option<Value>,
});

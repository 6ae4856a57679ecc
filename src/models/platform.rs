use serde::{Deserialize, Serialize};

use crate::client::Api;
use crate::error::RefineError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    pub platform_accession_code: Option<String>,
    pub platform_name: Option<String>,
}

impl Platform {
    /// Every platform known to refine.bio. The endpoint is not paginated.
    pub fn all(api: &Api) -> Result<Vec<Platform>, RefineError> {
        api.get("platforms", &[])
    }
}

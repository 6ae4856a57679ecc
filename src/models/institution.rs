use serde::{Deserialize, Serialize};

use crate::client::Api;
use crate::error::RefineError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Institution {
    pub submitter_institution: Option<String>,
}

impl Institution {
    /// Every submitter institution. The endpoint is not paginated.
    pub fn all(api: &Api) -> Result<Vec<Institution>, RefineError> {
        api.get("institutions", &[])
    }
}

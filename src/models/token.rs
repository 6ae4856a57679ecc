use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::Api;
use crate::error::RefineError;

const ENDPOINT: &str = "token";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRecord {
    pub id: Option<String>,
    pub is_activated: Option<bool>,
    pub terms_and_conditions: Option<String>,
}

/// An API token. Tokens are needed for download URLs and must be activated,
/// which records agreement with the refine.bio Terms of Use
/// (<https://www.refine.bio/terms>) and Privacy Policy
/// (<https://www.refine.bio/privacy>).
#[derive(Debug, Clone)]
pub struct Token {
    api: Api,
    record: TokenRecord,
}

impl Token {
    /// Requests a new, unactivated token.
    pub fn create(api: &Api) -> Result<Self, RefineError> {
        let record: TokenRecord = api.post(ENDPOINT, &json!({}))?;
        tracing::debug!(token = record.id.as_deref().unwrap_or_default(), "token created");
        Ok(Self {
            api: api.clone(),
            record,
        })
    }

    pub fn get(api: &Api, id: &str) -> Result<Self, RefineError> {
        let record: TokenRecord = api.get(&format!("{ENDPOINT}/{id}"), &[])?;
        Ok(Self {
            api: api.clone(),
            record,
        })
    }

    /// The token currently configured on `api`, without asking the server.
    pub fn load(api: &Api) -> Option<Self> {
        let id = api.config().token?;
        Some(Self {
            api: api.clone(),
            record: TokenRecord {
                id: Some(id),
                ..TokenRecord::default()
            },
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.record.id.as_deref()
    }

    pub fn is_activated(&self) -> bool {
        self.record.is_activated.unwrap_or(false)
    }

    pub fn terms_and_conditions(&self) -> Option<&str> {
        self.record.terms_and_conditions.as_deref()
    }

    pub fn record(&self) -> &TokenRecord {
        &self.record
    }

    /// Activates the token and makes it the API key of the shared handle.
    pub fn agree_to_terms_and_conditions(&mut self) -> Result<(), RefineError> {
        let id = self.require_id()?;
        let record: TokenRecord = self
            .api
            .put(&format!("{ENDPOINT}/{id}"), &json!({ "is_activated": true }))?;
        self.record = TokenRecord {
            id: record.id.or(Some(id.clone())),
            is_activated: record.is_activated.or(Some(true)),
            terms_and_conditions: record
                .terms_and_conditions
                .or(self.record.terms_and_conditions.take()),
        };
        self.api.set_token(Some(id));
        tracing::info!("token activated");
        Ok(())
    }

    /// Writes the token to the config file after confirming with the server
    /// that it exists and is activated.
    pub fn save(&self) -> Result<(), RefineError> {
        let id = self.require_id()?;
        let server = match Self::get(&self.api, &id) {
            Ok(token) => token,
            Err(RefineError::NotFound { .. }) => {
                return Err(RefineError::BadRequest(format!(
                    "Token with id '{id}' does not exist in refine.bio. \
                     Please create a new token."
                )));
            }
            Err(err) => return Err(err),
        };
        if !server.is_activated() {
            return Err(RefineError::BadRequest(format!(
                "Token with id '{id}' is not activated. Please activate your token with \
                 `agree_to_terms_and_conditions()` before saving it."
            )));
        }

        self.api.set_token(Some(id));
        self.api.save_config()?;
        tracing::info!(path = %self.api.config().path.display(), "token saved");
        Ok(())
    }

    fn require_id(&self) -> Result<String, RefineError> {
        self.record
            .id
            .clone()
            .ok_or_else(|| RefineError::InvalidArgument("the token has no id".to_string()))
    }
}

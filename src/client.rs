use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::error::RefineError;
use crate::http::{
    ApiRequest, ApiResponse, DownloadStream, HttpTransport, Method, RateLimiter, Transport,
    check_status,
};

/// Shared handle to the refine.bio API. Cloning is cheap; clones share the
/// transport, the configuration, and the rate limiter.
#[derive(Clone)]
pub struct Api {
    transport: Arc<dyn Transport>,
    config: Arc<RwLock<Config>>,
    limiter: Arc<RateLimiter>,
}

impl Api {
    pub fn new(config: Config) -> Result<Self, RefineError> {
        Ok(Self::with_transport(config, HttpTransport::new()?))
    }

    pub fn with_transport<T: Transport + 'static>(config: Config, transport: T) -> Self {
        let limiter = RateLimiter::new(config.api_max_calls_per_second);
        Self {
            transport: Arc::new(transport),
            config: Arc::new(RwLock::new(config)),
            limiter: Arc::new(limiter),
        }
    }

    pub fn config(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the API key sent with every subsequent request.
    pub fn set_token(&self, token: Option<String>) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .token = token;
    }

    pub fn save_config(&self) -> Result<(), RefineError> {
        self.config().save()
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        format!("{}{}/", config.base_url, endpoint.trim_matches('/'))
    }

    pub fn request(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<ApiResponse, RefineError> {
        let request = ApiRequest {
            method,
            url: url.to_string(),
            query: query.to_vec(),
            body,
            api_key: self.config().token,
        };
        self.limiter.acquire();
        tracing::debug!(method = %method, url, "refine.bio request");
        let response = self.transport.send(&request)?;
        check_status(response)
    }

    pub fn get_url<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<T, RefineError> {
        let response = self.request(Method::Get, url, query, None)?;
        decode(&response)
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<T, RefineError> {
        self.get_url(&self.endpoint_url(endpoint), query)
    }

    pub fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        payload: &B,
    ) -> Result<T, RefineError> {
        let response = self.request(
            Method::Post,
            &self.endpoint_url(endpoint),
            &[],
            Some(encode(payload)?),
        )?;
        decode(&response)
    }

    pub fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        payload: &B,
    ) -> Result<T, RefineError> {
        let response = self.request(
            Method::Put,
            &self.endpoint_url(endpoint),
            &[],
            Some(encode(payload)?),
        )?;
        decode(&response)
    }

    pub fn open(&self, url: &str) -> Result<DownloadStream, RefineError> {
        tracing::debug!(url, "opening download stream");
        self.transport.open(url)
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Api")
            .field("base_url", &config.base_url)
            .field("has_token", &config.token.is_some())
            .finish()
    }
}

fn encode<B: Serialize>(payload: &B) -> Result<Value, RefineError> {
    serde_json::to_value(payload).map_err(|err| RefineError::Decode(err.to_string()))
}

fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T, RefineError> {
    serde_json::from_str(&response.body)
        .map_err(|err| RefineError::Decode(format!("{}: {err}", response.url)))
}

use std::collections::VecDeque;
use std::fmt;
use std::io::Read;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::error::RefineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

pub struct DownloadStream {
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

/// The network seam. [`HttpTransport`] talks to the real API; tests plug in
/// recording mocks.
pub trait Transport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RefineError>;
    fn open(&self, url: &str) -> Result<DownloadStream, RefineError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, RefineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("refinebio-rs/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| RefineError::Transport(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| RefineError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RefineError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        };
        builder = builder
            .header(CONTENT_TYPE, "application/json")
            .query(&request.query);
        if let Some(key) = &request.api_key {
            builder = builder.header("API-KEY", key);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(map_send_error)?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().map_err(map_send_error)?;
        Ok(ApiResponse { status, url, body })
    }

    fn open(&self, url: &str) -> Result<DownloadStream, RefineError> {
        let response = self.client.get(url).send().map_err(map_send_error)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let url = response.url().to_string();
            let body = response
                .text()
                .unwrap_or_else(|_| "download request failed".to_string());
            return Err(match check_status(ApiResponse { status, url, body }) {
                Err(err) => err,
                Ok(_) => RefineError::Http {
                    status,
                    message: "unexpected download response".to_string(),
                },
            });
        }
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        Ok(DownloadStream {
            content_length,
            body: Box::new(response),
        })
    }
}

fn map_send_error(err: reqwest::Error) -> RefineError {
    if err.is_connect() || err.is_timeout() {
        RefineError::ServerError(Some(err.to_string()))
    } else {
        RefineError::Transport(err.to_string())
    }
}

/// Turns non-2xx responses into typed errors.
pub fn check_status(response: ApiResponse) -> Result<ApiResponse, RefineError> {
    match response.status {
        200..=299 => Ok(response),
        400 => Err(decode_error_envelope(&response.body)),
        404 => Err(RefineError::NotFound { url: response.url }),
        500 => Err(RefineError::ServerError(None)),
        status => Err(RefineError::Http {
            status,
            message: response.body,
        }),
    }
}

/// Decodes a 400 body of the form `{error_type, message, details}`.
pub fn decode_error_envelope(body: &str) -> RefineError {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => decode_error_value(&value).unwrap_or_else(|| fallback(&value, body)),
        Err(_) => RefineError::BadRequest(body.to_string()),
    }
}

fn fallback(value: &Value, body: &str) -> RefineError {
    match value.as_str() {
        Some(text) => RefineError::BadRequest(text.to_string()),
        None => RefineError::BadRequest(body.to_string()),
    }
}

fn decode_error_value(value: &Value) -> Option<RefineError> {
    let error_type = value.get("error_type")?.as_str()?;
    let message = value.get("message")?.as_str()?.to_string();
    let details = value.get("details")?;

    let error = match error_type {
        "multiple_errors" => {
            let nested = details
                .as_array()?
                .iter()
                .map(|item| {
                    decode_error_value(item).unwrap_or_else(|| fallback(item, &item.to_string()))
                })
                .collect();
            RefineError::MultipleErrors(nested)
        }
        "invalid_filters" => RefineError::InvalidFilters(render_details(details)),
        "invalid_data" => RefineError::InvalidData {
            message,
            details: render_details(details),
        },
        "invalid" | "invalid_choice" => RefineError::InvalidFilterType {
            message,
            details: render_details(details),
        },
        _ => RefineError::BadRequest(message),
    };
    Some(error)
}

fn render_details(details: &Value) -> String {
    match details {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Sliding one-second window shared by every request made through an
/// [`crate::client::Api`] handle. Zero disables throttling.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_second: u32,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_per_second: u32) -> Self {
        Self {
            max_per_second,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    pub fn acquire(&self) {
        if self.max_per_second == 0 {
            return;
        }
        let window = Duration::from_secs(1);
        loop {
            let wait = {
                let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
                let now = Instant::now();
                while calls
                    .front()
                    .is_some_and(|first| now.duration_since(*first) >= window)
                {
                    calls.pop_front();
                }
                if calls.len() < self.max_per_second as usize {
                    calls.push_back(now);
                    return;
                }
                match calls.front() {
                    Some(first) => window.saturating_sub(now.duration_since(*first)),
                    None => Duration::ZERO,
                }
            };
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit reached");
            thread::sleep(wait);
        }
    }
}

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use refinebio::client::Api;
use refinebio::config::Config;
use refinebio::download::Confirm;
use refinebio::error::RefineError;
use refinebio::http::{ApiRequest, ApiResponse, DownloadStream, Method, Transport};

pub const BASE_URL: &str = "https://api.test/v1/";

struct Route {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    responses: VecDeque<(u16, String)>,
}

#[derive(Default)]
struct State {
    routes: Vec<Route>,
    requests: Vec<ApiRequest>,
    files: HashMap<String, (Option<u64>, Vec<u8>)>,
    opened: Vec<String>,
}

/// Routes requests by method, path relative to [`BASE_URL`] and a subset of
/// query pairs. Each route replays its responses in order and repeats the
/// last one. Unrouted requests get a 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api(&self) -> Api {
        self.api_with_token(None)
    }

    pub fn api_with_token(&self, token: Option<&str>) -> Api {
        let config = Config {
            token: token.map(str::to_string),
            base_url: BASE_URL.to_string(),
            api_max_calls_per_second: 0,
            path: PathBuf::from("unused.yaml"),
        };
        Api::with_transport(config, self.clone())
    }

    pub fn on(&self, method: Method, path: &str, query: &[(&str, &str)], body: Value) -> &Self {
        self.respond(method, path, query, 200, body)
    }

    pub fn respond(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        status: u16,
        body: Value,
    ) -> &Self {
        let mut state = self.state.lock().unwrap();
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let body = body.to_string();
        match state
            .routes
            .iter_mut()
            .find(|route| route.method == method && route.path == path && route.query == query)
        {
            Some(route) => route.responses.push_back((status, body)),
            None => state.routes.push(Route {
                method,
                path: path.to_string(),
                query,
                responses: VecDeque::from([(status, body)]),
            }),
        }
        self
    }

    pub fn serve_file(&self, url: &str, content_length: Option<u64>, bytes: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(url.to_string(), (content_length, bytes.to_vec()));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RefineError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();

        // Most specific route first.
        let route = state
            .routes
            .iter_mut()
            .filter(|route| {
                route.method == request.method
                    && route.path == path
                    && route.query.iter().all(|pair| request.query.contains(pair))
            })
            .max_by_key(|route| route.query.len());
        let (status, body) = match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front().unwrap(),
            Some(route) => route.responses.front().cloned().unwrap(),
            None => (404, r#"{"detail": "Not found."}"#.to_string()),
        };
        Ok(ApiResponse {
            status,
            url: request.url.clone(),
            body,
        })
    }

    fn open(&self, url: &str) -> Result<DownloadStream, RefineError> {
        let mut state = self.state.lock().unwrap();
        state.opened.push(url.to_string());
        match state.files.get(url) {
            Some((content_length, bytes)) => Ok(DownloadStream {
                content_length: *content_length,
                body: Box::new(Cursor::new(bytes.clone())),
            }),
            None => Err(RefineError::NotFound {
                url: url.to_string(),
            }),
        }
    }
}

/// Answers every confirmation with `answer` and records the questions.
pub struct ScriptedConfirm {
    answer: bool,
    pub asked: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, message: &str) -> bool {
        self.asked.lock().unwrap().push(message.to_string());
        self.answer
    }
}

pub fn query_value<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

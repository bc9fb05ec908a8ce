#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::{HashMap, VecDeque},
    fmt::{self, Display},
    future::Future,
    sync::Mutex,
};

use reqwest::{Client, header};
use serde::de::DeserializeOwned;

use crate::{
    error::{AnnotationError, Result},
    payload::validation_messages,
};

/// HTTP method of a backend call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Partial update.
    Patch,
    /// Delete.
    Delete,
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A backend call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the backend root, or an absolute url.
    pub path:   String,
    /// JSON body.
    pub body:   Option<serde_json::Value>,
}

impl ApiRequest {
    /// `GET path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path:   path.into(),
            body:   None,
        }
    }

    /// `POST path` with a JSON body.
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path:   path.into(),
            body:   Some(body),
        }
    }

    /// `PATCH path` with a JSON body.
    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Patch,
            path:   path.into(),
            body:   Some(body),
        }
    }

    /// `DELETE path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path:   path.into(),
            body:   None,
        }
    }
}

/// A backend answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: u16,
    /// Raw body.
    pub body:   String,
}

impl ApiResponse {
    /// Builds a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the JSON body.
    pub fn json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|source| AnnotationError::Decode {
            path: path.to_string(),
            source,
        })
    }

    /// Turns a non-2xx response into a rejection carrying its validation
    /// messages.
    pub fn rejection(&self) -> AnnotationError {
        AnnotationError::Rejected {
            status: self.status,
            errors: validation_messages(&self.body),
        }
    }
}

/// Carries backend calls. The production implementation is
/// [`HttpTransport`]; tests script responses with [`ScriptedTransport`].
pub trait Transport: Send + Sync {
    /// Performs one call. Non-2xx statuses are returned as responses, only
    /// transport failures are errors.
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<ApiResponse>> + Send;
}

/// Transport backed by a shared reqwest client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    /// Shared HTTP client.
    client:     Client,
    /// Backend root, without trailing slash.
    base_url:   String,
    /// Token sent as `X-CSRF-Token`.
    csrf_token: Option<String>,
}

impl HttpTransport {
    /// Creates a transport for the backend rooted at `base_url`.
    pub fn new(client: Client, base_url: impl Into<String>, csrf_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            csrf_token,
        }
    }

    /// Backend root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a request path against the backend root.
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url(&request.path);
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.csrf_token {
            builder = builder.header("X-CSRF-Token", token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let transport_error = |e: reqwest::Error| AnnotationError::Transport {
            path:    request.path.clone(),
            message: e.to_string(),
        };
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        Ok(ApiResponse { status, body })
    }
}

/// In-memory transport answering from scripted responses and recording every
/// call it receives.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    /// Queued responses per route; the last one is repeated once the queue
    /// would run dry.
    routes:   Mutex<HashMap<(Method, String), VecDeque<ApiResponse>>>,
    /// Calls received so far.
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    /// Creates a transport without routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `method path`.
    pub fn respond(
        &self,
        method: Method,
        path: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> &Self {
        self.routes
            .lock()
            .expect("scripted routes poisoned")
            .entry((method, path.into()))
            .or_default()
            .push_back(ApiResponse::new(status, body));
        self
    }

    /// Calls received so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .expect("scripted requests poisoned")
            .clone()
    }

    /// Number of calls received for `method path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .expect("scripted requests poisoned")
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests
            .lock()
            .expect("scripted requests poisoned")
            .push(request.clone());

        let mut routes = self.routes.lock().expect("scripted routes poisoned");
        let queue = routes
            .get_mut(&(request.method, request.path.clone()))
            .ok_or_else(|| AnnotationError::Transport {
                path:    request.path.clone(),
                message: format!("no scripted response for {} {}", request.method, request.path),
            })?;

        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(|| AnnotationError::Transport {
            path:    request.path.clone(),
            message: "scripted route has no responses".to_string(),
        })
    }
}

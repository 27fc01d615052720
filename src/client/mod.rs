//! Remote implementations of the store and auth seams, speaking to the
//! server's JSON routes.

pub mod auth;
pub mod store;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::StoreError;

pub use auth::HttpAuthBackend;
pub use store::HttpDocumentStore;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    code: Option<String>,
}

/// Shared HTTP plumbing: base URL, client and the operator bearer token.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, crate::error::Error> {
        let mut base = Url::parse(base_url)
            .map_err(|e| crate::error::Error::Config(format!("Invalid API URL {}: {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn url(&self, path: &str) -> Result<Url, StoreError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| StoreError::Other(format!("invalid path {}: {}", path, e)))
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|p| p.into_inner()) = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Attaches the bearer token when one is held.
    pub fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Sends and converts non-success responses into [`StoreError`].
    pub async fn send(&self, req: RequestBuilder) -> Result<Response, StoreError> {
        let res = req.send().await.map_err(transport_error)?;
        if res.status().is_success() {
            return Ok(res);
        }
        Err(error_from_response(res).await)
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Other(err.to_string())
    }
}

pub(crate) async fn error_from_response(res: Response) -> StoreError {
    let status = res.status();
    let body: Option<ErrorBody> = res.json().await.ok();
    let detail = body
        .as_ref()
        .and_then(|b| b.error.clone())
        .unwrap_or_else(|| status.to_string());

    if let Some(code) = body.as_ref().and_then(|b| b.code.as_deref()) {
        return StoreError::from_code(code, detail);
    }
    match status {
        StatusCode::UNAUTHORIZED => StoreError::Unauthenticated(detail),
        StatusCode::FORBIDDEN => StoreError::PermissionDenied(detail),
        StatusCode::NOT_FOUND => StoreError::NotFound(detail),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            StoreError::Unavailable(detail)
        }
        _ => StoreError::Other(detail),
    }
}

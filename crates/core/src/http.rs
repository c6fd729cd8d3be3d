//! HTTP seam used by every remote finder.
//!
//! Finders talk to [`HttpTransport`] only, so tests can substitute an
//! in-memory server and count calls.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

use crate::error::{Result, SourceScopeError};

pub const ACCEPT_JSON: &str = "application/json";

/// HTTP Basic credentials for a repository service
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub accept: Option<&'static str>,
    pub headers: Vec<(String, String)>,
    pub credentials: Option<Credentials>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            accept: None,
            headers: Vec::new(),
            credentials: None,
        }
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self {
            method: Method::Head,
            ..Self::get(url)
        }
    }

    pub fn json(mut self) -> Self {
        self.accept = Some(ACCEPT_JSON);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn credentials(mut self, credentials: Option<&Credentials>) -> Self {
        self.credentials = credentials.cloned();
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode a JSON body, treating a non-2xx status as an error.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if !self.is_success() {
            return Err(SourceScopeError::Http(format!("status {}", self.status)));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Blocking HTTP client abstraction.
///
/// Transport failures (DNS, connect, timeout) are `Err`; any HTTP status,
/// including 4xx/5xx, is returned as a response.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Production transport on `reqwest::blocking`.
///
/// The blocking client has no per-read timeout, so `request_timeout` bounds
/// the whole exchange including the body.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("sourcescope/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Head => self.client.head(&request.url),
        };

        if let Some(accept) = request.accept {
            builder = builder.header(reqwest::header::ACCEPT, accept);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(creds) = &request.credentials {
            builder = builder.basic_auth(&creds.username, creds.password.as_ref());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = match request.method {
            Method::Head => Vec::new(),
            Method::Get => response.bytes()?.to_vec(),
        };

        Ok(HttpResponse { status, body })
    }
}

/// Join a base URL and a relative path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Append query parameters, percent-encoding the values.
pub fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    match url::Url::parse_with_params(base, params) {
        Ok(url) => url.to_string(),
        Err(_) => {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{k}={}", url::form_urlencoded::byte_serialize(v.as_bytes()).collect::<String>()))
                .collect();
            format!("{base}?{}", query.join("&"))
        }
    }
}

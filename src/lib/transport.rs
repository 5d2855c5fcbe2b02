//! The HTTP transport used by remote handlers.
//!
//! Handlers only need "send a GET, get back a status and a body". The [`Transport`] trait captures
//! exactly that so the real `reqwest` client can be swapped for a canned one in tests. Timeouts,
//! proxies, TLS verification and cancellation all belong to the transport: errors it reports are
//! propagated untouched.

use std::io::Read;

use url::Url;

use crate::Error;

/// Basic authentication credentials extracted from a URL's userinfo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl Credentials {
    /// Remove any `user:password@` from `url`, returning it as credentials.
    pub fn take_from(url: &mut Url) -> Option<Self> {
        if url.username().is_empty() {
            return None;
        }
        let decode = |s: &str| {
            percent_encoding::percent_decode_str(s)
                .decode_utf8_lossy()
                .into_owned()
        };
        let credentials = Self {
            username: decode(url.username()),
            password: url.password().map(decode),
        };
        // Only fails for URLs which cannot carry userinfo, and those never have a username
        let _ = url.set_username("");
        let _ = url.set_password(None);
        Some(credentials)
    }
}

/// A response whose body has not been read yet.
pub struct Response {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The canonical reason phrase for the status code, or an empty string.
    pub fn reason(&self) -> &'static str {
        reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("")
    }

    /// Turn a non-2xx response into [`Error::HttpStatus`], capturing the body as diagnostic text.
    pub fn error_for_status(self) -> Result<Self, Error> {
        if self.is_success() {
            return Ok(self);
        }
        let (status, reason) = (self.status, self.reason().to_string());
        let mut buf = Vec::new();
        let body = match self.body.take(64 * 1024).read_to_end(&mut buf) {
            Ok(_) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        };
        Err(Error::HttpStatus {
            status,
            reason,
            body,
        })
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Something which can perform a blocking HTTP GET.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url, credentials: Option<&Credentials>) -> Result<Response, Error>;
}

impl Transport for reqwest::blocking::Client {
    fn get(&self, url: &Url, credentials: Option<&Credentials>) -> Result<Response, Error> {
        let mut request = reqwest::blocking::Client::get(self, url.as_str());
        if let Some(credentials) = credentials {
            request = request.basic_auth(&credentials.username, credentials.password.as_ref());
        }
        let response = request.send()?;
        tracing::debug!(%url, status = %response.status(), "received response");
        Ok(Response {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}

/// Settings for the `reqwest` client built by [`HttpConfig::build_client`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Route every request through this proxy. When unset, `reqwest` honours the usual
    /// `HTTP_PROXY`/`HTTPS_PROXY` environment variables.
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            insecure: false,
            proxy: None,
            user_agent: concat!("fetch-zip/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    /// Build a blocking client with no overall request timeout.
    pub fn build_client(&self) -> Result<reqwest::blocking::Client, Error> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(None::<std::time::Duration>)
            .danger_accept_invalid_certs(self.insecure);
        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(builder.build()?)
    }
}

//! TOML configuration.
//!
//! ```toml
//! [http]
//! insecure = false
//! proxy = "http://proxy:3128"
//!
//! [local]
//! ignore_file = ".zipignore"
//! ```

use std::path::Path;

use crate::Error;
use crate::handler::local::LocalConfig;
use crate::transport::HttpConfig;

/// Settings for every handler. Missing tables and keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub local: LocalConfig,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    /// Read the config file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| Error::path(path, err))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Self::from_toml_str(&text)
    }
}

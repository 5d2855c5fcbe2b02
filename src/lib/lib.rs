//! Fetch a git repository, remote archive or local directory as a single zip archive.
//!
//! Every kind of source is fetched by a [`Handler`]. A [`Registry`] picks the handler for a
//! source, either by name or by asking each handler in turn whether it recognises it, and binds
//! the two into a [`Session`]. A session produces:
//!
//! - a zip archive of the source ([`Session::zip`]). Tarballs are transcoded on the fly, with a
//!   wrapping top-level folder removed, and directories are archived minus whatever their
//!   `.zipignore` file excludes.
//! - a fingerprint ([`Session::fingerprint`]): the resolved commit for a repository, otherwise the
//!   SHA-1 of the first 5 KiB of the content. Compare it with a stored value using
//!   [`Session::has_changed`] to find out whether a source needs fetching again.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fetch_zip::{Config, Registry};
//!
//! # fn main() -> Result<(), fetch_zip::Error> {
//! let registry = Registry::from_config(&Config::default())?;
//! let session = registry.open("https://github.com/dtolnay/syn.git#1.0.0", None)?;
//! println!("commit {}", session.fingerprint()?);
//! let bytes = session.zip()?.persist("syn.zip")?;
//! println!("wrote {bytes} bytes");
//! # Ok(())
//! # }
//! ```
//!
//! Handlers can also be requested by name, which skips detection:
//!
//! ```rust,no_run
//! # use fetch_zip::{Config, Registry};
//! # fn main() -> Result<(), fetch_zip::Error> {
//! # let registry = Registry::from_config(&Config::default())?;
//! let session = registry.open("./vendor/lib", Some("local"))?;
//! if session.has_changed("2fd4e1c67a2d28fced849ee1bb76e7391b93eb12").is_changed() {
//!     session.zip()?.persist("lib.zip")?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
mod error;
pub mod fingerprint;
pub mod handler;
pub mod ignore;
pub mod registry;
pub mod source;
pub mod transcode;
pub mod transport;

#[cfg(test)]
mod helper;

pub use crate::archive::ZipArtefact;
pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::handler::Handler;
pub use crate::registry::{Change, Registry, Session};
pub use crate::source::Source;
pub use crate::transport::{Credentials, HttpConfig, Response, Transport};

//! Handlers turn one kind of [`Source`] into a zip archive and a fingerprint.

use crate::Error;
use crate::archive::ZipArtefact;
use crate::source::Source;

pub mod git;
pub mod http;
pub mod local;

pub use git::{Git2, GitHandler, Revision, RevisionKind, Vcs};
pub use http::HttpHandler;
pub use local::LocalHandler;

/// A stateless capability for one class of source.
///
/// Handlers are registered once in a [`Registry`](crate::Registry) and shared by every session
/// that resolves to them, so they must not keep per-request state.
pub trait Handler: Send + Sync {
    /// Unique, case-insensitive name used to request this handler explicitly.
    fn name(&self) -> &str;

    /// Whether this handler can fetch `source`. May perform I/O.
    fn detect(&self, source: &Source) -> bool;

    /// Fetch `source` and normalise it into a single zip archive.
    fn zip(&self, source: &Source) -> Result<ZipArtefact, Error>;

    /// A cheap token which changes when the content of `source` changes.
    fn fingerprint(&self, source: &Source) -> Result<String, Error>;
}

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handler({})", self.name())
    }
}

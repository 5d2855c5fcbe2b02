//! The source descriptor passed to every handler.

use std::sync::Arc;

use crate::transport::Transport;

/// A location to fetch from: a local path, an HTTP(S) URL, or a repository URL optionally carrying
/// a `#<ref>` fragment naming a branch, tag or commit.
///
/// A `Source` is never mutated once built. Attaching a transport produces a new value, so a
/// descriptor shared with another thread is never changed underneath it.
#[derive(Clone)]
pub struct Source {
    path: String,
    transport: Option<Arc<dyn Transport>>,
}

impl Source {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            transport: None,
        }
    }

    /// The location exactly as given, fragment included.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The location without any `#<ref>` fragment.
    pub fn location(&self) -> &str {
        match self.path.split_once('#') {
            Some((location, _)) => location,
            None => &self.path,
        }
    }

    /// The non-empty `#<ref>` fragment, if any.
    pub fn reference(&self) -> Option<&str> {
        self.path
            .split_once('#')
            .map(|(_, reference)| reference)
            .filter(|reference| !reference.is_empty())
    }

    /// The HTTP transport handlers should use for this source.
    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    /// A copy of this source which carries `transport`.
    pub fn with_transport(&self, transport: Arc<dyn Transport>) -> Self {
        Self {
            path: self.path.clone(),
            transport: Some(transport),
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("path", &self.path)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for Source {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod test_source_descriptor {
    use super::*;
    use crate::helper::FakeTransport;

    #[test]
    fn reference_is_taken_from_fragment() {
        let source = Source::new("https://example.com/repo.git#v1.2.3");
        assert_eq!(source.location(), "https://example.com/repo.git");
        assert_eq!(source.reference(), Some("v1.2.3"));
    }

    #[test]
    fn missing_or_empty_fragment_has_no_reference() {
        assert_eq!(Source::new("https://example.com/repo.git").reference(), None);
        assert_eq!(Source::new("https://example.com/repo.git#").reference(), None);
        assert_eq!(
            Source::new("https://example.com/repo.git#").location(),
            "https://example.com/repo.git"
        );
    }

    #[test]
    fn with_transport_leaves_base_untouched() {
        let base = Source::new("http://example.com/app.zip");
        let derived = base.with_transport(Arc::new(FakeTransport::default()));
        assert!(base.transport().is_none());
        assert!(derived.transport().is_some());
        assert_eq!(base.path(), derived.path());
    }
}

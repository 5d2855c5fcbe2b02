//! Resolving a source to a handler and binding the two into a [`Session`].

use std::sync::Arc;

use crate::Error;
use crate::archive::ZipArtefact;
use crate::config::Config;
use crate::handler::{GitHandler, Handler, HttpHandler, LocalHandler};
use crate::source::Source;
use crate::transport::Transport;

/// The set of handlers a program can fetch with, and the transport attached to every source it
/// opens.
///
/// Handlers are tried for auto-detection in the order they were registered.
pub struct Registry {
    handlers: Vec<Arc<dyn Handler>>,
    transport: Arc<dyn Transport>,
}

impl Registry {
    /// An empty registry.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            handlers: Vec::new(),
            transport,
        }
    }

    /// A registry holding the `git`, `http` and `local` handlers, tried in that order.
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        let mut registry = Self::new(transport);
        registry.handlers = vec![
            Arc::new(GitHandler::default()),
            Arc::new(HttpHandler),
            Arc::new(LocalHandler::default()),
        ];
        registry
    }

    /// The default handlers, with an HTTP client and local handler built from `config`.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let transport = Arc::new(config.http.build_client()?);
        let local = LocalHandler::new(config.local.clone());
        let mut registry = Self::new(transport);
        registry.handlers = vec![
            Arc::new(GitHandler::new(local.clone())),
            Arc::new(HttpHandler),
            Arc::new(local),
        ];
        Ok(registry)
    }

    /// Add `handler`, failing if one with the same name (ignoring case) is already registered.
    pub fn register(&mut self, handler: Arc<dyn Handler>) -> Result<(), Error> {
        if self.handler(handler.name()).is_some() {
            return Err(Error::HandlerExists {
                name: handler.name().to_lowercase(),
            });
        }
        self.handlers.push(handler);
        Ok(())
    }

    /// Register each of `handlers` in turn, stopping at the first conflict.
    pub fn register_all<I>(&mut self, handlers: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Arc<dyn Handler>>,
    {
        handlers
            .into_iter()
            .try_for_each(|handler| self.register(handler))
    }

    pub fn handler(&self, name: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers
            .iter()
            .find(|handler| handler.name().eq_ignore_ascii_case(name))
    }

    /// Lowercase names of the registered handlers, in registration order.
    pub fn handler_names(&self) -> Vec<String> {
        self.handlers
            .iter()
            .map(|handler| handler.name().to_lowercase())
            .collect()
    }

    /// The handler named `name`, or when no name is given the first handler which detects
    /// `source`.
    pub fn resolve(&self, source: &Source, name: Option<&str>) -> Result<Arc<dyn Handler>, Error> {
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            return self
                .handler(name)
                .cloned()
                .ok_or_else(|| Error::UnknownHandler {
                    name: name.to_string(),
                });
        }
        let handler = self
            .handlers
            .iter()
            .find(|handler| handler.detect(source))
            .ok_or_else(|| Error::NoHandler {
                path: source.path().to_string(),
            })?;
        tracing::info!(source = %source, handler = handler.name(), "detected handler");
        Ok(handler.clone())
    }

    /// Attach this registry's transport to `source` and bind it to its handler.
    pub fn open<S: Into<Source>>(&self, source: S, name: Option<&str>) -> Result<Session, Error> {
        let source = source.into().with_transport(self.transport.clone());
        let handler = self.resolve(&source, name)?;
        Ok(Session { handler, source })
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("handlers", &self.handler_names())
            .finish_non_exhaustive()
    }
}

/// One source bound to the handler that fetches it. Nothing is cached: every call goes back to the
/// handler.
#[derive(Debug, Clone)]
pub struct Session {
    handler: Arc<dyn Handler>,
    source: Source,
}

impl Session {
    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn zip(&self) -> Result<ZipArtefact, Error> {
        tracing::debug!(source = %self.source, handler = self.handler.name(), "fetching");
        self.handler.zip(&self.source)
    }

    pub fn fingerprint(&self) -> Result<String, Error> {
        self.handler.fingerprint(&self.source)
    }

    /// Compare the current fingerprint with `previous`.
    pub fn has_changed(&self, previous: &str) -> Change {
        match self.fingerprint() {
            Ok(current) if current == previous => Change::Unchanged { current },
            Ok(current) => Change::Changed { current },
            Err(err) => Change::Failed(err),
        }
    }
}

/// The outcome of [`Session::has_changed`].
#[derive(Debug)]
pub enum Change {
    Unchanged { current: String },
    Changed { current: String },
    /// The fingerprint could not be computed.
    Failed(Error),
}

impl Change {
    /// True unless the fingerprint was computed and matched. A failure counts as changed so that a
    /// needed refresh is never skipped.
    pub fn is_changed(&self) -> bool {
        !matches!(self, Change::Unchanged { .. })
    }

    /// Whether the source changed, or the error which prevented finding out.
    pub fn into_result(self) -> Result<bool, Error> {
        match self {
            Change::Unchanged { .. } => Ok(false),
            Change::Changed { .. } => Ok(true),
            Change::Failed(err) => Err(err),
        }
    }
}

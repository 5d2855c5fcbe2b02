use crate::transcode::Encoding;

/// The main error enum for this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{}: {source}", path.display())]
    Path {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Git2(#[from] git2::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// No registered handler detected the path.
    #[error("handler for path '{path}' cannot be found")]
    NoHandler { path: String },
    /// A handler was requested by name but was never registered.
    #[error("handler '{name}' is not registered")]
    UnknownHandler { name: String },
    /// A handler with the same (lowercased) name is already registered.
    #[error("handler {name} already exists")]
    HandlerExists { name: String },

    #[error("error occurred when downloading file: {status} {reason}:\n{body}")]
    HttpStatus {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("no HTTP transport attached to source '{url}'")]
    NoTransport { url: String },

    #[error("directory {} is empty", path.display())]
    EmptyDirectory { path: std::path::PathBuf },
    #[error("failed to transcode {encoding} stream into a zip archive")]
    Transcode {
        encoding: Encoding,
        #[source]
        source: Box<Error>,
    },
    #[error("reference '{reference}' cannot be resolved in repository {url}")]
    UnresolvedReference { url: String, reference: String },
}

impl Error {
    pub(crate) fn path<P: Into<std::path::PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Path {
            path: path.into(),
            source,
        }
    }
}

use std::process::ExitCode;

/// Categories of application errors that can be matched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    /// Argument validation errors
    ArgValidation,
    /// General IO errors
    IO,
    /// Configuration file reading or parsing errors
    ConfigLoad,
    /// Errors while fetching or fingerprinting a source
    Fetch,
    /// Errors writing the archive to its destination
    WriteOutput,
}

/// Internal error type that contains all application error variants.
#[derive(Debug, thiserror::Error)]
pub enum AppErrorInner {
    #[error("Argument error: {0}")]
    ArgValidation(String),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("failed to load configuration from {}", path.display())]
    ConfigLoad {
        path: std::path::PathBuf,
        #[source]
        err: fetch_zip::Error,
    },
    #[error(transparent)]
    Fetch(#[from] fetch_zip::Error),
    #[error("failed to write archive to {}", path.display())]
    WriteOutput {
        path: std::path::PathBuf,
        #[source]
        err: fetch_zip::Error,
    },
}

/// The main application-level error type. The kind decides the process exit code, the inner error
/// carries what the application was doing when the error happened.
///
/// This type uses the newtype pattern to wrap a boxed inner error, reducing stack size.
#[derive(Debug)]
pub struct AppError(Box<AppErrorInner>, AppErrorKind);

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl AppError {
    pub fn new(inner: AppErrorInner, kind: AppErrorKind) -> Self {
        Self(Box::new(inner), kind)
    }

    pub fn error_kind(&self) -> &AppErrorKind {
        &self.1
    }

    pub fn arg_validation(msg: String) -> Self {
        Self::new(AppErrorInner::ArgValidation(msg), AppErrorKind::ArgValidation)
    }

    pub fn config_load(path: std::path::PathBuf, err: fetch_zip::Error) -> Self {
        Self::new(AppErrorInner::ConfigLoad { path, err }, AppErrorKind::ConfigLoad)
    }

    pub fn write_output(path: std::path::PathBuf, err: fetch_zip::Error) -> Self {
        Self::new(AppErrorInner::WriteOutput { path, err }, AppErrorKind::WriteOutput)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::new(AppErrorInner::IO(err), AppErrorKind::IO)
    }
}

impl From<fetch_zip::Error> for AppError {
    fn from(err: fetch_zip::Error) -> Self {
        Self::new(AppErrorInner::Fetch(err), AppErrorKind::Fetch)
    }
}

impl From<AppError> for ExitCode {
    fn from(error: AppError) -> Self {
        ExitCode::from(match error.error_kind() {
            AppErrorKind::ArgValidation | AppErrorKind::ConfigLoad => 2,
            _ => 3,
        })
    }
}

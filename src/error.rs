//! The public error type.
//!
//! Internally the crate passes `anyhow::Error` around. At the public boundary an error is tagged
//! with an `ErrorType` so that a view (or the MCP server) can decide how to present it.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

/// The classification of an `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The request never completed: unreachable host, timeout, or an unexpected server failure.
    Network,
    /// The backend does not know the requested identifier.
    NotFound,
    /// The backend rejected the input.
    Validation,
    /// The backend refused a withdrawal or transfer because a balance would go negative.
    InsufficientFunds,
    /// The backend answered with a body that could not be understood.
    Decode,
    /// The configuration file or home directory is missing or invalid.
    Config,
    /// Input given to this program could not be understood.
    Request,
    /// The MCP service failed.
    Service,
    /// Anything not otherwise classified.
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorType);

/// An error together with its `ErrorType`.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    /// Shorthand for an error built from a message.
    pub fn msg(error_type: ErrorType, message: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self::new(error_type, anyhow::Error::msg(message))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// Wraps the error with additional context, keeping its classification.
    pub fn context<C>(self, context: C) -> Self
    where
        C: Display + Send + Sync + 'static,
    {
        Self {
            error_type: self.error_type,
            inner: self.inner.context(context),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.inner)
    }
}

impl From<anyhow::Error> for Error {
    /// An `Error` that travelled through `anyhow` keeps its classification, anything else is
    /// `Internal`.
    fn from(inner: anyhow::Error) -> Self {
        let error_type = classification(&inner).unwrap_or(ErrorType::Internal);
        Self { error_type, inner }
    }
}

fn classification(e: &anyhow::Error) -> Option<ErrorType> {
    e.downcast_ref::<Error>().map(Error::error_type)
}

/// Converts an internal result into a public `Result` with the given classification.
pub(crate) trait IntoResult<T> {
    /// Classifies the error as `error_type` unless it already carries a classification.
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            let error_type = classification(&inner).unwrap_or(error_type);
            Error { error_type, inner }
        })
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by stores, the substrate, and the services
//!
//! Every failure a caller can observe is one of the taxonomy variants. Lower
//! layers add context with [`ResultExt::context`]; callers classify with
//! [`Error::root`] or the `is_*` helpers, which look through that context.

use thiserror::Error;

/// Resource kinds named in NotFound and Conflict errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Project,
    Event,
    Job,
    Worker,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceKind::Project => "Project",
            ResourceKind::Event => "Event",
            ResourceKind::Job => "Job",
            ResourceKind::Worker => "Worker",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not authenticate the request: {reason}")]
    Authentication { reason: String },

    #[error("the request is not authorized: {reason}")]
    Authorization { reason: String },

    #[error("bad request: {reason}")]
    BadRequest {
        reason: String,
        details: Vec<String>,
    },

    #[error("{kind} {id:?} not found")]
    NotFound { kind: ResourceKind, id: String },

    #[error("{kind} {id:?} conflict: {reason}")]
    Conflict {
        kind: ResourceKind,
        id: String,
        reason: String,
    },

    #[error("not supported: {reason}")]
    NotSupported { reason: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Error::Authorization {
            reason: reason.into(),
        }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Error::BadRequest {
            reason: reason.into(),
            details: Vec::new(),
        }
    }

    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn conflict(kind: ResourceKind, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Conflict {
            kind,
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Wrap this error with a description of the operation that failed.
    pub fn wrap(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The taxonomy variant underneath any added context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), Error::Conflict { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.root(), Error::Authorization { .. })
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self.root(), Error::BadRequest { .. })
    }
}

/// Adds operation context to fallible results
pub trait ResultExt<T> {
    fn context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<Error>,
{
    fn context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().wrap(f()))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

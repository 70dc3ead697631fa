//! Error types shared by every workspace operation

use thiserror::Error;

use crate::store::EntryId;

/// Broad category of a failure, used by callers to decide how to present it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Name collision, illegal move, unknown id
    Structural,
    /// Corrupt or incompatible archive, wrong password
    Format,
    Io,
    /// Dismissed prompt or aborted download
    Cancelled,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("an entry named \"{0}\" already exists")]
    NameCollision(String),

    #[error("cannot move \"{0}\" into itself or one of its subfolders")]
    MoveIntoDescendant(String),

    #[error("entry {0} does not exist")]
    UnknownEntry(EntryId),

    #[error("\"{0}\" is not a folder")]
    NotADirectory(String),

    #[error("\"{0}\" is a folder")]
    IsADirectory(String),

    #[error("invalid entry name \"{0}\"")]
    InvalidName(String),

    #[error("the root folder cannot be {0}")]
    RootEntry(&'static str),

    #[error("{message}")]
    Format { path: Option<String>, message: String },

    #[error("invalid password")]
    WrongPassword,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("prompt dismissed")]
    Dismissed,

    #[error("download aborted")]
    Aborted,

    #[error("{inner} ({name})")]
    Annotated { name: String, inner: Box<Error> },

    #[error("{}", join_messages(.0))]
    Multiple(Vec<Error>),
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    pub fn format(path: Option<String>, message: impl Into<String>) -> Self {
        Self::Format {
            path,
            message: message.into(),
        }
    }

    /// Attach the display name or archive path of the entry that failed
    pub fn annotate(self, name: impl Into<String>) -> Self {
        Self::Annotated {
            name: name.into(),
            inner: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NameCollision(_)
            | Error::MoveIntoDescendant(_)
            | Error::UnknownEntry(_)
            | Error::NotADirectory(_)
            | Error::IsADirectory(_)
            | Error::InvalidName(_)
            | Error::RootEntry(_) => ErrorKind::Structural,
            Error::Format { .. } | Error::WrongPassword => ErrorKind::Format,
            Error::Io(_) => ErrorKind::Io,
            Error::Dismissed | Error::Aborted => ErrorKind::Cancelled,
            Error::Annotated { inner, .. } => inner.kind(),
            Error::Multiple(errors) => errors
                .last()
                .map(Error::kind)
                .unwrap_or(ErrorKind::Structural),
        }
    }

    /// Collapse a list of per-entry failures into a single error
    pub fn from_many(mut errors: Vec<Error>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Error::Multiple(errors)),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

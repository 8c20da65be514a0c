//! The errors of the record store.
//!
//! Every backend reports the same two expected conditions: a record that
//! is already there when creating it and a record that isn’t there when
//! trying to use it. Everything else is an unclassified failure of the
//! underlying storage medium which is passed on to the caller untouched.

use std::{error, fmt};
use tokio::task::JoinError;
use crate::commons::storage::{
    BackendError, CodecError, CollectionBuf, RecordId, RecordNameBuf,
};


//------------ Action --------------------------------------------------------

/// The store operation that was attempted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    Create,
    Load,
    Save,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Load => "load",
            Action::Save => "save",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


//------------ ErrorKind -----------------------------------------------------

/// The classification of a [`StoreError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A record is already present at the key.
    AlreadyExists,

    /// There is no record at the key.
    NotFound,

    /// The storage medium or the codec failed.
    Io,
}


//------------ StoreError ----------------------------------------------------

#[derive(Debug)]
pub enum StoreError {
    /// `create` found a record at the key.
    AlreadyExists {
        name: RecordNameBuf,
        collection: CollectionBuf,
    },

    /// There is no record at the key.
    NotFound {
        name: RecordNameBuf,
        collection: CollectionBuf,
        action: Action,
    },

    /// The backend failed.
    Backend(BackendError),

    /// The payload could not be encoded or decoded.
    Codec(CodecError),

    /// The blocking task running the operation died.
    Runtime(String),
}

impl StoreError {
    pub fn already_exists(id: &RecordId) -> Self {
        StoreError::AlreadyExists {
            name: id.name().to_owned(),
            collection: id.resolved_collection().to_owned(),
        }
    }

    pub fn not_found(id: &RecordId, action: Action) -> Self {
        StoreError::NotFound {
            name: id.name().to_owned(),
            collection: id.resolved_collection().to_owned(),
            action,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Backend(_)
            | StoreError::Codec(_)
            | StoreError::Runtime(_) => ErrorKind::Io,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns the HTTP status code an API should respond with.
    ///
    /// Overwriting an existing record is a disabled request (405), a
    /// missing record is 404, and anything else an internal error.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::AlreadyExists => 405,
            ErrorKind::NotFound => 404,
            ErrorKind::Io => 500,
        }
    }
}


//--- From

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        StoreError::Backend(err)
    }
}

impl From<CodecError> for StoreError {
    fn from(err: CodecError) -> Self {
        StoreError::Codec(err)
    }
}

impl From<JoinError> for StoreError {
    fn from(err: JoinError) -> Self {
        StoreError::Runtime(err.to_string())
    }
}


//--- Display and Error

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::AlreadyExists { name, collection } => {
                write!(f,
                    "record '{name}' already exists in collection \
                     '{collection}'. Either delete it first or change \
                     the existing record"
                )
            }
            StoreError::NotFound { name, collection, action } => {
                write!(f,
                    "record '{name}' not found in collection \
                     '{collection}'. Cannot {action}"
                )
            }
            StoreError::Backend(err) => err.fmt(f),
            StoreError::Codec(err) => err.fmt(f),
            StoreError::Runtime(err) => {
                write!(f, "store operation aborted: {err}")
            }
        }
    }
}

impl error::Error for StoreError { }


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_status_codes() {
        let id = RecordId::parse("n1", None).unwrap();

        let err = StoreError::already_exists(&id);
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.status_code(), 405);

        let err = StoreError::not_found(&id, Action::Load);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status_code(), 404);

        let err = StoreError::from(CodecError::NotAnObject);
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn not_found_carries_name_and_action() {
        let id = RecordId::parse("n1", Some("B07")).unwrap();
        match StoreError::not_found(&id, Action::Delete) {
            StoreError::NotFound { name, collection, action } => {
                assert_eq!(name.as_str(), "n1");
                assert_eq!(collection.as_str(), "B07");
                assert_eq!(action, Action::Delete);
            }
            _ => panic!("wrong variant")
        }
    }

    #[test]
    fn display_mentions_action() {
        let id = RecordId::parse("n1", None).unwrap();
        let msg = StoreError::not_found(&id, Action::Load).to_string();
        assert!(msg.contains("'n1'"));
        assert!(msg.ends_with("Cannot load"));
    }
}

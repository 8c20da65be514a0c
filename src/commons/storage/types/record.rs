//! The identity of a stored record.

use std::{fmt, hash};
use crate::constants::DEFAULT_COLLECTION;
use super::collection::{Collection, CollectionBuf};
use super::name::{ParseNameError, RecordName, RecordNameBuf};


//------------ RecordId ------------------------------------------------------

/// The identity of a calculation record.
///
/// A record is identified by its name and an optional collection. If the
/// collection is missing, the [default collection][DEFAULT_COLLECTION] is
/// used instead. Two identities are equal if their names and their
/// resolved collections are equal, so leaving out the collection and
/// explicitly naming the default collection address the same record.
#[derive(Clone, Debug)]
pub struct RecordId {
    name: RecordNameBuf,
    collection: Option<CollectionBuf>,
}

impl RecordId {
    /// Creates a new identity from a name and an optional collection.
    pub fn new(
        name: impl Into<RecordNameBuf>,
        collection: Option<CollectionBuf>,
    ) -> Self {
        RecordId { name: name.into(), collection }
    }

    /// Creates an identity for a record in the default collection.
    pub fn in_default(name: impl Into<RecordNameBuf>) -> Self {
        Self::new(name, None)
    }

    /// Creates an identity for a record in the given collection.
    pub fn in_collection(
        name: impl Into<RecordNameBuf>, collection: impl Into<CollectionBuf>
    ) -> Self {
        Self::new(name, Some(collection.into()))
    }

    /// Parses an identity from the raw strings supplied by a caller.
    pub fn parse(
        name: &str, collection: Option<&str>
    ) -> Result<Self, ParseNameError> {
        Ok(RecordId {
            name: RecordName::parse(name)?.to_owned(),
            collection: match collection {
                Some(collection) => {
                    Some(Collection::parse(collection)?.to_owned())
                }
                None => None,
            },
        })
    }

    /// Returns the name of the record.
    pub fn name(&self) -> &RecordName {
        &self.name
    }

    /// Returns the collection as given by the caller, if any.
    pub fn collection(&self) -> Option<&Collection> {
        self.collection.as_deref()
    }

    /// Returns the collection the record lives in.
    ///
    /// This is the default collection if none was given.
    pub fn resolved_collection(&self) -> &Collection {
        self.collection.as_deref().unwrap_or(DEFAULT_COLLECTION)
    }
}


//--- PartialEq, Eq, Hash

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.resolved_collection() == other.resolved_collection()
    }
}

impl Eq for RecordId { }

impl hash::Hash for RecordId {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.resolved_collection().hash(state);
        self.name.hash(state);
    }
}


//--- Display

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.resolved_collection(), self.name)
    }
}


//============ Tests =========================================================

//! Collection names.

use std::{borrow, fmt, mem, ops, str};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use super::name::{check_name, ParseNameError};


//------------ CollectionBuf -------------------------------------------------

/// An owned collection name.
///
/// See [`Collection`] for more details.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct CollectionBuf(String);


//--- FromStr, TryFrom, From

impl str::FromStr for CollectionBuf {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Collection::parse(s)?.to_owned())
    }
}

impl TryFrom<String> for CollectionBuf {
    type Error = ParseNameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let _ = Collection::parse(s.as_str())?;
        Ok(Self(s))
    }
}

impl From<&Collection> for CollectionBuf {
    fn from(value: &Collection) -> Self {
        value.to_owned()
    }
}


//--- Deref, AsRef, Borrow

impl ops::Deref for CollectionBuf {
    type Target = Collection;

    fn deref(&self) -> &Self::Target {
        unsafe { Collection::from_str_unchecked(&self.0) }
    }
}

impl AsRef<Collection> for CollectionBuf {
    fn as_ref(&self) -> &Collection {
        self
    }
}

impl borrow::Borrow<Collection> for CollectionBuf {
    fn borrow(&self) -> &Collection {
        self
    }
}


//--- Display

impl fmt::Display for CollectionBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}


//--- Serialize, Deserialize

impl Serialize for CollectionBuf {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CollectionBuf {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        CollectionBuf::try_from(s).map_err(serde::de::Error::custom)
    }
}


//------------ Collection ----------------------------------------------------

/// A slice with a collection name.
///
/// Collections group records into separate namespaces. The disk backend
/// keeps one directory per collection while the database backends keep
/// one logical table per collection. Collections are never provisioned
/// explicitly, they spring into existence with their first record.
///
/// Collection names follow the same rules as
/// [record names][super::RecordName].
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Collection(str);

impl Collection {
    /// Parses a collection name from a string slice.
    pub const fn parse(value: &str) -> Result<&Self, ParseNameError> {
        if let Err(err) = check_name(value) {
            return Err(err)
        }
        Ok(unsafe { Self::from_str_unchecked(value) })
    }

    /// Creates a collection name from the given slice or panics.
    ///
    /// This function should be used to create collection constants.
    pub const fn make(s: &str) -> &Self {
        match Self::parse(s) {
            Ok(some) => some,
            Err(_) => panic!("invalid collection name")
        }
    }

    /// Creates a collection name from a string slice without checking.
    ///
    /// # Safety
    ///
    /// The string slice must follow the rules for record names.
    pub const unsafe fn from_str_unchecked(s: &str) -> &Self {
        // SAFETY: Self has #repr(transparent)
        unsafe { mem::transmute(s) }
    }

    /// Returns a string slice of the collection name.
    pub const fn as_str(&self) -> &str {
        &self.0
    }
}


//--- TryFrom

impl<'a> TryFrom<&'a str> for &'a Collection {
    type Error = ParseNameError;

    fn try_from(s: &'a str) -> Result<Self, Self::Error> {
        Collection::parse(s)
    }
}


//--- ToOwned

impl ToOwned for Collection {
    type Owned = CollectionBuf;

    fn to_owned(&self) -> Self::Owned {
        CollectionBuf(self.0.to_owned())
    }
}


//--- Display

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

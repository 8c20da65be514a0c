//! Record names.

use std::{borrow, error, fmt, mem, ops, str};
use serde::{Deserialize, Deserializer, Serialize, Serializer};


//------------ Constants -----------------------------------------------------

/// The maximum length of a name in bytes.
pub const MAX_NAME_LEN: usize = 255;


//------------ RecordNameBuf -------------------------------------------------

/// An owned record name.
///
/// See [`RecordName`] for the rules a name has to follow.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct RecordNameBuf(String);


//--- FromStr, TryFrom, From

impl str::FromStr for RecordNameBuf {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RecordName::parse(s)?.to_owned())
    }
}

impl TryFrom<String> for RecordNameBuf {
    type Error = ParseNameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let _ = RecordName::parse(s.as_str())?;
        Ok(Self(s))
    }
}

impl From<&RecordName> for RecordNameBuf {
    fn from(value: &RecordName) -> Self {
        value.to_owned()
    }
}


//--- Deref, AsRef, Borrow

impl ops::Deref for RecordNameBuf {
    type Target = RecordName;

    fn deref(&self) -> &Self::Target {
        unsafe { RecordName::from_str_unchecked(&self.0) }
    }
}

impl AsRef<RecordName> for RecordNameBuf {
    fn as_ref(&self) -> &RecordName {
        self
    }
}

impl borrow::Borrow<RecordName> for RecordNameBuf {
    fn borrow(&self) -> &RecordName {
        self
    }
}


//--- Display

impl fmt::Display for RecordNameBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}


//--- Serialize, Deserialize

impl Serialize for RecordNameBuf {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordNameBuf {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        RecordNameBuf::try_from(s).map_err(serde::de::Error::custom)
    }
}


//------------ RecordName ----------------------------------------------------

/// A slice with a record name.
///
/// Names are chosen by the caller and identify a record within its
/// collection. Because the disk backend uses them as file names, they must
/// be usable as a single path component: a name must not be empty, must
/// be at most [`MAX_NAME_LEN`] bytes long, must not start with a period,
/// must not start or end with white space, and must not contain a slash or
/// a NUL character.
///
/// For the owned variant, see [`RecordNameBuf`].
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct RecordName(str);

impl RecordName {
    /// Parses a record name from a string slice.
    pub const fn parse(value: &str) -> Result<&Self, ParseNameError> {
        if let Err(err) = check_name(value) {
            return Err(err)
        }
        Ok(unsafe { Self::from_str_unchecked(value) })
    }

    /// Creates a record name from the given slice or panics.
    ///
    /// This function should be used to create name constants.
    pub const fn make(s: &str) -> &Self {
        match Self::parse(s) {
            Ok(some) => some,
            Err(_) => panic!("invalid record name")
        }
    }

    /// Creates a record name from a string slice without checking.
    ///
    /// # Safety
    ///
    /// The string slice must follow the rules described with the type.
    pub const unsafe fn from_str_unchecked(s: &str) -> &Self {
        // SAFETY: Self has #repr(transparent)
        unsafe { mem::transmute(s) }
    }

    /// Returns a string slice of the name.
    pub const fn as_str(&self) -> &str {
        &self.0
    }
}


//--- TryFrom

impl<'a> TryFrom<&'a str> for &'a RecordName {
    type Error = ParseNameError;

    fn try_from(s: &'a str) -> Result<Self, Self::Error> {
        RecordName::parse(s)
    }
}


//--- ToOwned

impl ToOwned for RecordName {
    type Owned = RecordNameBuf;

    fn to_owned(&self) -> Self::Owned {
        RecordNameBuf(self.0.to_owned())
    }
}


//--- Display

impl fmt::Display for RecordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


//------------ check_name ----------------------------------------------------

/// Checks that `value` can be used as a record or collection name.
pub(super) const fn check_name(value: &str) -> Result<(), ParseNameError> {
    let mut bytes = value.as_bytes();

    let Some(first) = bytes.first() else {
        return Err(ParseNameError(ParseErrorEnum::Empty))
    };
    if bytes.len() > MAX_NAME_LEN {
        return Err(ParseNameError(ParseErrorEnum::TooLong))
    }
    if *first == b'.' {
        return Err(ParseNameError(ParseErrorEnum::LeadingDot))
    }
    if first.is_ascii_whitespace() {
        return Err(ParseNameError(ParseErrorEnum::LeadingWhitespace))
    }
    if bytes[bytes.len() - 1].is_ascii_whitespace() {
        return Err(ParseNameError(ParseErrorEnum::TrailingWhitespace))
    }

    while let Some((head, tail)) = bytes.split_first() {
        if *head == b'/' || *head == b'\\' || *head == 0 {
            return Err(ParseNameError(ParseErrorEnum::IllegalCharacter(*head)))
        }
        bytes = tail;
    }
    Ok(())
}


//------------ ParseNameError ------------------------------------------------

/// An error happened while parsing a string into a record or collection
/// name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParseNameError(ParseErrorEnum);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ParseErrorEnum {
    Empty,
    TooLong,
    LeadingDot,
    LeadingWhitespace,
    TrailingWhitespace,
    IllegalCharacter(u8),
}

impl fmt::Display for ParseNameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::ParseErrorEnum::*;

        match self.0 {
            Empty => f.write_str("empty name"),
            TooLong => {
                write!(f, "name longer than {MAX_NAME_LEN} bytes")
            }
            LeadingDot => f.write_str("name starts with a period"),
            LeadingWhitespace => f.write_str("name with leading whitespace"),
            TrailingWhitespace => {
                f.write_str("name with trailing whitespace")
            }
            IllegalCharacter(ch) => {
                write!(f, "illegal character {:?} in name", ch as char)
            }
        }
    }
}

impl error::Error for ParseNameError { }


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::RecordName;

    #[test]
    fn plain_name_succeeds() {
        assert!(RecordName::parse("n1").is_ok());
        assert!(RecordName::parse("crystal with spaces").is_ok());
        assert!(RecordName::parse("a.b-c_d").is_ok());
    }

    #[test]
    fn empty_name_fails() {
        assert!(RecordName::parse("").is_err());
    }

    #[test]
    fn separator_fails() {
        assert!(RecordName::parse("a/b").is_err());
        assert!(RecordName::parse("a\\b").is_err());
        assert!(RecordName::parse("/etc").is_err());
    }

    #[test]
    fn leading_dot_fails() {
        assert!(RecordName::parse(".").is_err());
        assert!(RecordName::parse("..").is_err());
        assert!(RecordName::parse(".tmp").is_err());
    }

    #[test]
    fn surrounding_whitespace_fails() {
        assert!(RecordName::parse(" test").is_err());
        assert!(RecordName::parse("test\n").is_err());
    }

    #[test]
    fn nul_fails() {
        assert!(RecordName::parse("te\0st").is_err());
    }

    #[test]
    fn too_long_fails() {
        assert!(RecordName::parse(&"x".repeat(255)).is_ok());
        assert!(RecordName::parse(&"x".repeat(256)).is_err());
    }

    #[test]
    fn serde_rejects_invalid() {
        let res: Result<super::RecordNameBuf, _> =
            serde_json::from_str("\"a/b\"");
        assert!(res.is_err());
        let res: super::RecordNameBuf =
            serde_json::from_str("\"ab\"").unwrap();
        assert_eq!(res.as_str(), "ab");
    }
}

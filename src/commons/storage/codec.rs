//! Encoding record payloads for storage.
//!
//! The store never looks inside a record’s payload. Instead, it relies on
//! a [`Codec`] supplied by the calculation engine that knows how to create
//! a fresh payload and how to translate a payload into what a backend can
//! store. Depending on the backend, this is either an opaque blob of bytes
//! or a document, i.e., a JSON object.

use std::{error, fmt};
use std::marker::PhantomData;
use serde::de::DeserializeOwned;
use serde::ser::Serialize;
use serde_json::Value;
use super::finite::check_finite;
use super::types::RecordName;


//------------ Document ------------------------------------------------------

/// A document as stored by the document-shaped backends.
pub type Document = serde_json::Map<String, Value>;


//------------ Shape ---------------------------------------------------------

/// The shape of data a backend stores.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shape {
    /// An opaque sequence of bytes.
    Blob,

    /// A JSON object.
    Document,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Shape::Blob => "blob",
            Shape::Document => "document",
        })
    }
}


//------------ Encoded -------------------------------------------------------

/// An encoded payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Encoded {
    Blob(Vec<u8>),
    Document(Document),
}

impl Encoded {
    /// Returns the shape of the encoded payload.
    pub fn shape(&self) -> Shape {
        match self {
            Encoded::Blob(_) => Shape::Blob,
            Encoded::Document(_) => Shape::Document,
        }
    }

    /// Returns the bytes of a blob.
    pub fn as_blob(&self) -> Result<&[u8], CodecError> {
        match self {
            Encoded::Blob(blob) => Ok(blob),
            _ => Err(CodecError::wrong_shape(Shape::Blob, self.shape()))
        }
    }

    /// Returns the content of a document.
    pub fn as_document(&self) -> Result<&Document, CodecError> {
        match self {
            Encoded::Document(document) => Ok(document),
            _ => Err(CodecError::wrong_shape(Shape::Document, self.shape()))
        }
    }
}


//------------ Codec ---------------------------------------------------------

/// The capability to create, encode, and decode payloads.
pub trait Codec: Send + Sync + 'static {
    /// The in-memory payload.
    type Payload: Send + 'static;

    /// Creates the default state for a newly created record.
    fn fresh(&self, name: &RecordName) -> Self::Payload;

    /// Encodes a payload into the given shape.
    fn encode(
        &self, payload: &Self::Payload, shape: Shape
    ) -> Result<Encoded, CodecError>;

    /// Decodes a payload.
    fn decode(&self, encoded: Encoded) -> Result<Self::Payload, CodecError>;
}


//------------ Fresh ---------------------------------------------------------

/// A type that can provide the default state of a new record.
pub trait Fresh {
    fn fresh(name: &RecordName) -> Self;
}

impl Fresh for Value {
    /// An empty JSON object.
    fn fresh(_name: &RecordName) -> Self {
        Value::Object(Document::new())
    }
}


//------------ JsonCodec -----------------------------------------------------

/// A codec using JSON for any serde-enabled payload type.
///
/// Blobs contain the pretty-printed JSON text. Documents are the JSON
/// representation directly, which means that the payload type has to
/// serialize into a JSON object when used with a document backend.
pub struct JsonCodec<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        JsonCodec { marker: PhantomData }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T> Codec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Fresh + Send + 'static
{
    type Payload = T;

    fn fresh(&self, name: &RecordName) -> T {
        T::fresh(name)
    }

    fn encode(&self, payload: &T, shape: Shape) -> Result<Encoded, CodecError> {
        check_finite(payload)?;
        match shape {
            Shape::Blob => {
                serde_json::to_vec_pretty(payload)
                    .map(Encoded::Blob)
                    .map_err(CodecError::serialize)
            }
            Shape::Document => {
                match serde_json::to_value(payload) {
                    Ok(Value::Object(document)) => {
                        Ok(Encoded::Document(document))
                    }
                    Ok(_) => Err(CodecError::NotAnObject),
                    Err(err) => Err(CodecError::serialize(err)),
                }
            }
        }
    }

    fn decode(&self, encoded: Encoded) -> Result<T, CodecError> {
        match encoded {
            Encoded::Blob(blob) => {
                serde_json::from_slice(&blob)
                    .map_err(CodecError::deserialize)
            }
            Encoded::Document(document) => {
                serde_json::from_value(Value::Object(document))
                    .map_err(CodecError::deserialize)
            }
        }
    }
}


//------------ CodecError ----------------------------------------------------

#[derive(Debug)]
pub enum CodecError {
    Serialize(String),
    Deserialize(String),
    NotAnObject,
    NonFinite(String),
    WrongShape {
        expected: Shape,
        found: Shape,
    },
}

impl CodecError {
    pub fn serialize(err: impl fmt::Display) -> Self {
        CodecError::Serialize(err.to_string())
    }

    pub fn deserialize(err: impl fmt::Display) -> Self {
        CodecError::Deserialize(err.to_string())
    }

    pub fn wrong_shape(expected: Shape, found: Shape) -> Self {
        CodecError::WrongShape { expected, found }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodecError::Serialize(err) => {
                write!(f, "failed to serialize payload: {err}")
            }
            CodecError::Deserialize(err) => {
                write!(f, "failed to deserialize payload: {err}")
            }
            CodecError::NotAnObject => {
                f.write_str("payload does not encode into a document")
            }
            CodecError::NonFinite(path) => {
                write!(f, "cannot encode non-finite number at '{path}'")
            }
            CodecError::WrongShape { expected, found } => {
                write!(f, "backend stores a {expected}, got a {found}")
            }
        }
    }
}

impl error::Error for CodecError { }


//============ Tests =========================================================

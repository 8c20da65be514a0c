//! Checking payloads for numbers JSON cannot carry.
//!
//! serde_json silently turns NaN and the infinities into `null`, which
//! then fails to deserialize into a float. [`check_finite`] walks a payload
//! through a serializer that produces nothing but stops at the first
//! non-finite float, so such a payload is refused before it is written.

use std::{error, fmt};
use serde::ser::{self, Serialize};
use super::codec::CodecError;


//------------ check_finite --------------------------------------------------

/// Checks that all floats in `value` are finite.
///
/// On failure, the error names the path of the offending value with
/// struct fields and map keys separated by periods and sequence elements
/// given by their index.
pub fn check_finite<T: Serialize + ?Sized>(
    value: &T
) -> Result<(), CodecError> {
    value.serialize(FiniteCheck::default()).map_err(|err| match err {
        CheckError::NonFinite(path) => CodecError::NonFinite(path),
        CheckError::Custom(msg) => CodecError::Serialize(msg),
    })
}


//------------ FiniteCheck ---------------------------------------------------

#[derive(Default)]
struct FiniteCheck {
    path: String,
}

impl FiniteCheck {
    fn child(&self, name: impl fmt::Display) -> Self {
        if self.path.is_empty() {
            FiniteCheck { path: name.to_string() }
        }
        else {
            FiniteCheck { path: format!("{}.{}", self.path, name) }
        }
    }

    fn float(self, value: f64) -> Result<(), CheckError> {
        if value.is_finite() {
            Ok(())
        }
        else {
            Err(CheckError::NonFinite(self.path))
        }
    }
}

macro_rules! accept {
    ( $( $method:ident($ty:ty) )* ) => {
        $(
            fn $method(self, _: $ty) -> Result<(), CheckError> {
                Ok(())
            }
        )*
    }
}

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = CheckError;
    type SerializeSeq = Compound;
    type SerializeTuple = Compound;
    type SerializeTupleStruct = Compound;
    type SerializeTupleVariant = Compound;
    type SerializeMap = Compound;
    type SerializeStruct = Compound;
    type SerializeStructVariant = Compound;

    accept! {
        serialize_bool(bool)
        serialize_i8(i8) serialize_i16(i16) serialize_i32(i32)
        serialize_i64(i64) serialize_i128(i128)
        serialize_u8(u8) serialize_u16(u16) serialize_u32(u32)
        serialize_u64(u64) serialize_u128(u128)
        serialize_char(char) serialize_str(&str) serialize_bytes(&[u8])
        serialize_unit_struct(&'static str)
    }

    fn serialize_f32(self, value: f32) -> Result<(), CheckError> {
        self.float(value.into())
    }

    fn serialize_f64(self, value: f64) -> Result<(), CheckError> {
        self.float(value)
    }

    fn serialize_none(self) -> Result<(), CheckError> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(
        self, value: &T
    ) -> Result<(), CheckError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), CheckError> {
        Ok(())
    }

    fn serialize_unit_variant(
        self, _: &'static str, _: u32, _: &'static str
    ) -> Result<(), CheckError> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self, _: &'static str, value: &T
    ) -> Result<(), CheckError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self, _: &'static str, _: u32, variant: &'static str, value: &T
    ) -> Result<(), CheckError> {
        value.serialize(self.child(variant))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Compound, CheckError> {
        Ok(Compound::new(self))
    }

    fn serialize_tuple(self, _: usize) -> Result<Compound, CheckError> {
        Ok(Compound::new(self))
    }

    fn serialize_tuple_struct(
        self, _: &'static str, _: usize
    ) -> Result<Compound, CheckError> {
        Ok(Compound::new(self))
    }

    fn serialize_tuple_variant(
        self, _: &'static str, _: u32, variant: &'static str, _: usize
    ) -> Result<Compound, CheckError> {
        Ok(Compound::new(self.child(variant)))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Compound, CheckError> {
        Ok(Compound::new(self))
    }

    fn serialize_struct(
        self, _: &'static str, _: usize
    ) -> Result<Compound, CheckError> {
        Ok(Compound::new(self))
    }

    fn serialize_struct_variant(
        self, _: &'static str, _: u32, variant: &'static str, _: usize
    ) -> Result<Compound, CheckError> {
        Ok(Compound::new(self.child(variant)))
    }
}


//------------ Compound ------------------------------------------------------

/// The checker for the parts of sequences, maps, and structs.
struct Compound {
    parent: FiniteCheck,
    index: usize,
    key: String,
}

impl Compound {
    fn new(parent: FiniteCheck) -> Self {
        Compound { parent, index: 0, key: String::new() }
    }

    fn element<T: Serialize + ?Sized>(
        &mut self, value: &T
    ) -> Result<(), CheckError> {
        let res = value.serialize(self.parent.child(self.index));
        self.index += 1;
        res
    }

    fn field<T: Serialize + ?Sized>(
        &mut self, key: &str, value: &T
    ) -> Result<(), CheckError> {
        value.serialize(self.parent.child(key))
    }
}

impl ser::SerializeSeq for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_element<T: Serialize + ?Sized>(
        &mut self, value: &T
    ) -> Result<(), CheckError> {
        self.element(value)
    }

    fn end(self) -> Result<(), CheckError> {
        Ok(())
    }
}

impl ser::SerializeTuple for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_element<T: Serialize + ?Sized>(
        &mut self, value: &T
    ) -> Result<(), CheckError> {
        self.element(value)
    }

    fn end(self) -> Result<(), CheckError> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self, value: &T
    ) -> Result<(), CheckError> {
        self.element(value)
    }

    fn end(self) -> Result<(), CheckError> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self, value: &T
    ) -> Result<(), CheckError> {
        self.element(value)
    }

    fn end(self) -> Result<(), CheckError> {
        Ok(())
    }
}

impl ser::SerializeMap for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_key<T: Serialize + ?Sized>(
        &mut self, key: &T
    ) -> Result<(), CheckError> {
        key.serialize(self.parent.child("<key>"))?;
        self.key = match serde_json::to_value(key) {
            Ok(serde_json::Value::String(key)) => key,
            Ok(key) => key.to_string(),
            Err(_) => String::from("?"),
        };
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(
        &mut self, value: &T
    ) -> Result<(), CheckError> {
        let key = std::mem::take(&mut self.key);
        self.field(&key, value)
    }

    fn end(self) -> Result<(), CheckError> {
        Ok(())
    }
}

impl ser::SerializeStruct for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self, key: &'static str, value: &T
    ) -> Result<(), CheckError> {
        self.field(key, value)
    }

    fn end(self) -> Result<(), CheckError> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for Compound {
    type Ok = ();
    type Error = CheckError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self, key: &'static str, value: &T
    ) -> Result<(), CheckError> {
        self.field(key, value)
    }

    fn end(self) -> Result<(), CheckError> {
        Ok(())
    }
}


//------------ CheckError ----------------------------------------------------

#[derive(Debug)]
enum CheckError {
    NonFinite(String),
    Custom(String),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CheckError::NonFinite(path) => {
                write!(f, "non-finite number at '{path}'")
            }
            CheckError::Custom(msg) => f.write_str(msg),
        }
    }
}

impl error::Error for CheckError { }

impl ser::Error for CheckError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        CheckError::Custom(msg.to_string())
    }
}


//============ Tests =========================================================

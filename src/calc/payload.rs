//! The state of an HKL calculation.
//!
//! These types only carry the state of the calculation engine so that it
//! can be kept in the store. They don’t calculate anything.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::commons::storage::{Fresh, RecordName};


//------------ HklCalculation ------------------------------------------------

/// The complete state of a calculation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HklCalculation {
    /// The UB matrix calculation.
    pub ubcalc: UbCalculation,

    /// The constraints on the diffractometer angles.
    ///
    /// Maps the name of a constraint to its value. Boolean constraints
    /// are stored with a value of 1.
    #[serde(default)]
    pub constraints: BTreeMap<String, f64>,
}

impl Fresh for HklCalculation {
    fn fresh(name: &RecordName) -> Self {
        HklCalculation {
            ubcalc: UbCalculation::new(name.as_str()),
            constraints: BTreeMap::new(),
        }
    }
}


//------------ UbCalculation -------------------------------------------------

/// The state of a UB matrix calculation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct UbCalculation {
    pub name: String,

    #[serde(default)]
    pub crystal: Option<Crystal>,

    /// The reference vector in the reciprocal lattice.
    #[serde(default)]
    pub reference: Option<Xyz>,

    /// The surface normal vector in the reciprocal lattice.
    #[serde(default)]
    pub surface: Option<Xyz>,

    #[serde(default)]
    pub reflections: Vec<Reflection>,

    #[serde(default)]
    pub orientations: Vec<Orientation>,

    #[serde(default)]
    pub u: Option<Matrix>,

    #[serde(default)]
    pub ub: Option<Matrix>,
}

impl UbCalculation {
    pub fn new(name: impl Into<String>) -> Self {
        UbCalculation {
            name: name.into(),
            crystal: None,
            reference: None,
            surface: None,
            reflections: Vec::new(),
            orientations: Vec::new(),
            u: None,
            ub: None,
        }
    }
}


//------------ Crystal -------------------------------------------------------

/// The crystal lattice.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Crystal {
    pub name: String,

    #[serde(default)]
    pub system: Option<String>,

    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}


//------------ Reflection, Orientation ---------------------------------------

/// A reflection measured at a diffractometer position.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Reflection {
    pub hkl: Hkl,
    pub pos: Position,
    pub energy: f64,

    #[serde(default)]
    pub tag: Option<String>,
}

/// A crystal orientation relative to the laboratory frame.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Orientation {
    pub hkl: Hkl,
    pub xyz: Xyz,

    #[serde(default)]
    pub pos: Option<Position>,

    #[serde(default)]
    pub tag: Option<String>,
}


//------------ Hkl, Xyz, Position, Matrix ------------------------------------

/// Miller indices.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Hkl {
    pub h: f64,
    pub k: f64,
    pub l: f64,
}

/// A vector in real space.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Diffractometer angles in degrees.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Position {
    pub mu: f64,
    pub delta: f64,
    pub nu: f64,
    pub eta: f64,
    pub chi: f64,
    pub phi: f64,
}

/// A 3x3 matrix in row-major order.
pub type Matrix = [[f64; 3]; 3];


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use serde_json::json;
    use crate::commons::storage::{
        Codec, Encoded, JsonCodec, RecordName, Shape,
    };
    use super::*;

    #[test]
    fn fresh_calculation_is_named() {
        let calc = HklCalculation::fresh(RecordName::make("n1"));
        assert_eq!(calc.ubcalc.name, "n1");
        assert!(calc.ubcalc.reflections.is_empty());
        assert!(calc.constraints.is_empty());
    }

    #[test]
    fn encodes_as_document() {
        let codec = JsonCodec::<HklCalculation>::new();
        let mut calc = HklCalculation::fresh(RecordName::make("n1"));
        calc.constraints.insert("delta".into(), 10.);
        calc.ubcalc.reflections.push(Reflection {
            hkl: Hkl { h: 0., k: 0., l: 1. },
            pos: Position {
                mu: 0., delta: 60., nu: 0., eta: 30., chi: 0., phi: 0.
            },
            energy: 12.5,
            tag: Some("refl1".into()),
        });

        let encoded = codec.encode(&calc, Shape::Document).unwrap();
        let Encoded::Document(ref document) = encoded else {
            panic!("not a document")
        };
        assert_eq!(document["ubcalc"]["name"], json!("n1"));
        assert_eq!(document["constraints"]["delta"], json!(10.));
        assert_eq!(codec.decode(encoded).unwrap(), calc);
    }

    #[test]
    fn decodes_sparse_documents() {
        let codec = JsonCodec::<HklCalculation>::new();
        let blob = br#"{ "ubcalc": { "name": "n1" } }"#.to_vec();
        let calc = codec.decode(Encoded::Blob(blob)).unwrap();
        assert_eq!(calc, HklCalculation::fresh(RecordName::make("n1")));
    }
}

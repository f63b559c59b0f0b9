//! Scalar value model
//!
//! Reference semantics of the scalar converter pair: how a native scalar
//! becomes a host value and how a host value is narrowed back into a native
//! scalar. The generator uses it to validate constant literals before they
//! are rendered into the implementation artifact.

use crate::ir::{BasicKind, WordSize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value as the dynamically-typed host runtime sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostValue {
    Bool(bool),
    /// Host integers are unbounded; i128 covers every native integer width
    Int(i128),
    Float(f64),
    Complex(f64, f64),
    Str(String),
}

impl HostValue {
    fn type_name(&self) -> &'static str {
        match self {
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::Complex(..) => "complex",
            HostValue::Str(_) => "str",
        }
    }
}

/// A value in its native representation
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float32(f32),
    Float64(f64),
    Complex64(f32, f32),
    Complex128(f64, f64),
    Str(String),
    Rune(char),
}

/// Conversion failures between host and native values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// Value does not fit the native kind
    #[error("value {value} out of range for {kind}")]
    OutOfRange { kind: BasicKind, value: String },

    /// Value has the wrong shape for the native kind
    #[error("cannot convert {found} to {kind}")]
    Mismatch { kind: BasicKind, found: &'static str },
}

impl BasicKind {
    /// Convert a native value of this kind into its host representation
    pub fn to_host(self, value: &NativeValue) -> Result<HostValue, ValueError> {
        let mismatch = || ValueError::Mismatch {
            kind: self,
            found: "native value of another kind",
        };
        let host = match (self, value) {
            (BasicKind::Bool, NativeValue::Bool(b)) => HostValue::Bool(*b),
            (k, NativeValue::Int(i)) if k.is_signed() => HostValue::Int(*i as i128),
            (k, NativeValue::Uint(u)) if k.is_unsigned() => HostValue::Int(*u as i128),
            (BasicKind::Float32, NativeValue::Float32(f)) => HostValue::Float(*f as f64),
            (BasicKind::Float64, NativeValue::Float64(f)) => HostValue::Float(*f),
            (BasicKind::Complex64, NativeValue::Complex64(re, im)) => {
                HostValue::Complex(*re as f64, *im as f64)
            }
            (BasicKind::Complex128, NativeValue::Complex128(re, im)) => {
                HostValue::Complex(*re, *im)
            }
            (BasicKind::String, NativeValue::Str(s)) => HostValue::Str(s.clone()),
            (BasicKind::Rune, NativeValue::Rune(c)) => HostValue::Str(c.to_string()),
            _ => return Err(mismatch()),
        };
        Ok(host)
    }

    /// Narrow a host value into a native value of this kind
    pub fn to_native(self, value: &HostValue, word: WordSize) -> Result<NativeValue, ValueError> {
        let mismatch = || ValueError::Mismatch {
            kind: self,
            found: value.type_name(),
        };
        let out_of_range = |v: String| ValueError::OutOfRange {
            kind: self,
            value: v,
        };

        match self {
            BasicKind::Bool => match value {
                HostValue::Bool(b) => Ok(NativeValue::Bool(*b)),
                HostValue::Int(i) => Ok(NativeValue::Bool(*i != 0)),
                _ => Err(mismatch()),
            },

            k if k.is_signed() || k.is_unsigned() => {
                let i = match value {
                    HostValue::Int(i) => *i,
                    HostValue::Bool(b) => *b as i128,
                    _ => return Err(mismatch()),
                };
                let (min, max) = k.int_range(word).ok_or_else(mismatch)?;
                if i < min || i > max {
                    return Err(out_of_range(i.to_string()));
                }
                if k.is_signed() {
                    Ok(NativeValue::Int(i as i64))
                } else {
                    Ok(NativeValue::Uint(i as u64))
                }
            }

            BasicKind::Float32 => {
                let f = as_float(value).ok_or_else(mismatch)?;
                Ok(NativeValue::Float32(narrow_f32(f).ok_or_else(|| out_of_range(f.to_string()))?))
            }

            BasicKind::Float64 => {
                let f = as_float(value).ok_or_else(mismatch)?;
                Ok(NativeValue::Float64(f))
            }

            BasicKind::Complex64 => {
                let (re, im) = as_complex(value).ok_or_else(mismatch)?;
                let narrowed = narrow_f32(re).zip(narrow_f32(im));
                let (re32, im32) =
                    narrowed.ok_or_else(|| out_of_range(format!("({}+{}j)", re, im)))?;
                Ok(NativeValue::Complex64(re32, im32))
            }

            BasicKind::Complex128 => {
                let (re, im) = as_complex(value).ok_or_else(mismatch)?;
                Ok(NativeValue::Complex128(re, im))
            }

            BasicKind::String => match value {
                HostValue::Str(s) => Ok(NativeValue::Str(s.clone())),
                _ => Err(mismatch()),
            },

            BasicKind::Rune => match value {
                HostValue::Str(s) => {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Ok(NativeValue::Rune(c)),
                        _ => Err(out_of_range(format!("{:?}", s))),
                    }
                }
                HostValue::Int(i) => u32::try_from(*i)
                    .ok()
                    .and_then(char::from_u32)
                    .map(NativeValue::Rune)
                    .ok_or_else(|| out_of_range(i.to_string())),
                _ => Err(mismatch()),
            },

            _ => Err(mismatch()),
        }
    }
}

fn as_float(value: &HostValue) -> Option<f64> {
    match value {
        HostValue::Float(f) => Some(*f),
        HostValue::Int(i) => Some(*i as f64),
        _ => None,
    }
}

fn as_complex(value: &HostValue) -> Option<(f64, f64)> {
    match value {
        HostValue::Complex(re, im) => Some((*re, *im)),
        other => as_float(other).map(|re| (re, 0.0)),
    }
}

/// Narrow to f32, failing when a finite value overflows
fn narrow_f32(f: f64) -> Option<f32> {
    let narrowed = f as f32;
    if f.is_finite() && !narrowed.is_finite() {
        None
    } else {
        Some(narrowed)
    }
}

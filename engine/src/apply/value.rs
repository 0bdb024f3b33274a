//! Submitted values, decoded from JSON and coerced to the domain of their template.

use std::fmt::{self, Display};

use schema::{FloatParmTemplate, IntParmTemplate, MenuParmTemplate, ParmTemplate};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParmScalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl Display for ParmScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParmScalar::Int(v) => write!(f, "{v}"),
            ParmScalar::Float(v) => write!(f, "{v}"),
            ParmScalar::Bool(v) => write!(f, "{v}"),
            ParmScalar::String(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParmScalar {
    fn from(value: i64) -> Self {
        ParmScalar::Int(value)
    }
}

impl From<f64> for ParmScalar {
    fn from(value: f64) -> Self {
        ParmScalar::Float(value)
    }
}

impl From<bool> for ParmScalar {
    fn from(value: bool) -> Self {
        ParmScalar::Bool(value)
    }
}

impl From<&str> for ParmScalar {
    fn from(value: &str) -> Self {
        ParmScalar::String(value.to_owned())
    }
}

/// A value to apply to one parameter: a single scalar, or one scalar per component.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParmValue {
    Scalar(ParmScalar),
    Tuple(Vec<ParmScalar>),
}

impl Display for ParmValue {
    /// Tuples are comma separated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParmValue::Scalar(scalar) => scalar.fmt(f),
            ParmValue::Tuple(scalars) => {
                for (i, scalar) in scalars.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    scalar.fmt(f)?;
                }
                Ok(())
            }
        }
    }
}

impl From<ParmScalar> for ParmValue {
    fn from(value: ParmScalar) -> Self {
        ParmValue::Scalar(value)
    }
}

/// Decodes the JSON text submitted for `template`.
///
/// Returns [None] for an empty array, which supplies no value.
pub(crate) fn decode(template: &ParmTemplate, raw: &str) -> Result<Option<ParmValue>> {
    let name = template.name();
    if template.is_layout() {
        return Err(decode_err(name, "layout parameters take no values"));
    }

    let decoded: Value =
        serde_json::from_str(raw).map_err(|err| decode_err(name, format!("invalid JSON: {err}")))?;

    let value = match decoded {
        Value::Array(mut items) => match items.len() {
            0 => return Ok(None),
            1 => ParmValue::Scalar(coerce(template, items.swap_remove(0))?),
            got if got > template.num_components() => {
                return Err(Error::ValueArity {
                    name: name.to_owned(),
                    max: template.num_components(),
                    got,
                });
            }
            _ => ParmValue::Tuple(
                items
                    .into_iter()
                    .map(|item| coerce(template, item))
                    .collect::<Result<_>>()?,
            ),
        },
        scalar => ParmValue::Scalar(coerce(template, scalar)?),
    };
    Ok(Some(value))
}

fn decode_err(name: &str, reason: impl Into<String>) -> Error {
    Error::ValueDecode {
        name: name.to_owned(),
        reason: reason.into(),
    }
}

/// Converts `f` to an integer if it is integral and within the range of `i64`.
pub(crate) fn integral_float(f: f64) -> Option<i64> {
    // i64::MAX is not representable, so `as f64` rounds it up to 2^63.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn coerce(template: &ParmTemplate, value: Value) -> Result<ParmScalar> {
    let name = template.name();
    if matches!(value, Value::Null | Value::Array(_) | Value::Object(_)) {
        return Err(decode_err(name, format!("expected a scalar, got {value}")));
    }

    match template {
        ParmTemplate::Int(t) => coerce_int(t, &value),
        ParmTemplate::Float(t) => coerce_float(t, &value),
        ParmTemplate::String(_) => Ok(coerce_string(value)),
        ParmTemplate::Toggle(_) => coerce_bool(name, &value),
        ParmTemplate::Menu(t) => coerce_menu(t, value),
        _ => Err(decode_err(name, "layout parameters take no values")),
    }
}

fn coerce_int(t: &IntParmTemplate, value: &Value) -> Result<ParmScalar> {
    let name = &t.common.name;
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_float)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| decode_err(name, format!("expected an integer, got {value}")))?;

    if (t.min_is_strict && parsed < t.min_value) || (t.max_is_strict && parsed > t.max_value) {
        return Err(decode_err(
            name,
            format!("{parsed} is outside [{}, {}]", t.min_value, t.max_value),
        ));
    }
    Ok(ParmScalar::Int(parsed))
}

fn coerce_float(t: &FloatParmTemplate, value: &Value) -> Result<ParmScalar> {
    let name = &t.common.name;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
    .ok_or_else(|| decode_err(name, format!("expected a number, got {value}")))?;

    if (t.min_is_strict && parsed < t.min_value) || (t.max_is_strict && parsed > t.max_value) {
        return Err(decode_err(
            name,
            format!("{parsed} is outside [{}, {}]", t.min_value, t.max_value),
        ));
    }
    Ok(ParmScalar::Float(parsed))
}

fn coerce_string(value: Value) -> ParmScalar {
    ParmScalar::String(match value {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn coerce_bool(name: &str, value: &Value) -> Result<ParmScalar> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
    .ok_or_else(|| decode_err(name, format!("expected a boolean, got {value}")))?;
    Ok(ParmScalar::Bool(parsed))
}

/// Menus accept either the index of an item or its token.
fn coerce_menu(t: &MenuParmTemplate, value: Value) -> Result<ParmScalar> {
    let name = &t.common.name;
    let scalar = match value {
        Value::Number(n) => n
            .as_i64()
            .map(ParmScalar::Int)
            .ok_or_else(|| decode_err(name, format!("expected a menu item index, got {n}")))?,
        Value::String(s) => ParmScalar::String(s),
        other => {
            return Err(decode_err(
                name,
                format!("expected a menu item index or token, got {other}"),
            ));
        }
    };

    if !t.menu_items.is_empty() {
        let known = match &scalar {
            ParmScalar::Int(index) => usize::try_from(*index)
                .map(|index| index < t.menu_items.len())
                .unwrap_or(false),
            ParmScalar::String(token) => t.menu_items.contains(token),
            _ => false,
        };
        if !known {
            return Err(decode_err(name, format!("{scalar} is not a menu item")));
        }
    }
    Ok(scalar)
}

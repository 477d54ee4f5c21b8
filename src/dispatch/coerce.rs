//! Parameter coercion
//!
//! Converts raw query/form text into typed values. Scalars read only the
//! first raw value, arrays read all of them in order. No raw values at all
//! coerce to `None` for every type.

use std::str::FromStr;

use super::error::CoercionError;
use super::types::{ArrayValue, ParamType, ScalarType, Value};

impl ScalarType {
    /// Parse one raw value using the type's canonical text form
    pub fn parse(self, raw: &str) -> Result<Value, CoercionError> {
        Ok(match self {
            Self::Text => Value::Text(raw.to_string()),
            Self::I8 => Value::I8(parse_raw(raw, self)?),
            Self::I16 => Value::I16(parse_raw(raw, self)?),
            Self::I32 => Value::I32(parse_raw(raw, self)?),
            Self::I64 => Value::I64(parse_raw(raw, self)?),
            Self::F32 => Value::F32(parse_raw(raw, self)?),
            Self::F64 => Value::F64(parse_raw(raw, self)?),
            Self::Bool => Value::Bool(parse_raw(raw, self)?),
        })
    }

    /// Parse every raw value; the first failure aborts the whole array
    pub fn parse_all(self, raws: &[String]) -> Result<ArrayValue, CoercionError> {
        Ok(match self {
            Self::Text => ArrayValue::Text(raws.to_vec()),
            Self::I8 => ArrayValue::I8(parse_each(raws, self)?),
            Self::I16 => ArrayValue::I16(parse_each(raws, self)?),
            Self::I32 => ArrayValue::I32(parse_each(raws, self)?),
            Self::I64 => ArrayValue::I64(parse_each(raws, self)?),
            Self::F32 => ArrayValue::F32(parse_each(raws, self)?),
            Self::F64 => ArrayValue::F64(parse_each(raws, self)?),
            Self::Bool => ArrayValue::Bool(parse_each(raws, self)?),
        })
    }
}

fn parse_raw<T: FromStr>(raw: &str, expected: ScalarType) -> Result<T, CoercionError> {
    raw.parse().map_err(|_| CoercionError::Invalid {
        raw: raw.to_string(),
        expected,
    })
}

fn parse_each<T: FromStr>(raws: &[String], expected: ScalarType) -> Result<Vec<T>, CoercionError> {
    raws.iter().map(|raw| parse_raw(raw, expected)).collect()
}

/// Coerce raw values into `ty`
pub fn coerce(ty: &ParamType, values: &[String]) -> Result<Option<Value>, CoercionError> {
    let Some(first) = values.first() else {
        return Ok(None);
    };

    match ty {
        ParamType::Scalar(scalar) => scalar.parse(first).map(Some),
        ParamType::Array(element) => element.parse_all(values).map(|a| Some(Value::Array(a))),
        ParamType::Payload(payload) => {
            Err(CoercionError::Unsupported(payload.type_name().to_string()))
        }
    }
}

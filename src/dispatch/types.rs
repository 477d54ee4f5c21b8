//! Handler parameter vocabulary
//!
//! Declared parameter types, the values they coerce into, and the positional
//! argument list a handler receives.

use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::error::DispatchError;

/// Raw multi-valued parameters from a query string or form body.
/// Repeated keys keep their values in arrival order.
pub type ParameterMap = HashMap<String, Vec<String>>;

/// Scalar types a raw text value can be coerced into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Text,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
}

impl ScalarType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type DecodeFn = fn(&[u8]) -> Result<Box<dyn Any + Send>, serde_json::Error>;

/// Structured type decoded from a JSON request body
#[derive(Clone, Copy)]
pub struct PayloadType {
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn,
}

impl PayloadType {
    pub fn of<T: DeserializeOwned + Send + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            decode: decode_boxed::<T>,
        }
    }

    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// For messages only; not guaranteed unique
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn decode(&self, body: &[u8]) -> Result<Payload, serde_json::Error> {
        (self.decode)(body).map(|inner| Payload {
            type_id: self.type_id,
            type_name: self.type_name,
            inner,
        })
    }
}

fn decode_boxed<T: DeserializeOwned + Send + 'static>(
    body: &[u8],
) -> Result<Box<dyn Any + Send>, serde_json::Error> {
    let value: T = serde_json::from_slice(body)?;
    Ok(Box::new(value))
}

impl fmt::Debug for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadType")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Declared type of a handler parameter
#[derive(Debug, Clone, Copy)]
pub enum ParamType {
    Scalar(ScalarType),
    Array(ScalarType),
    /// Only bindable from a request body
    Payload(PayloadType),
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::Array(element) => write!(f, "[{element}]"),
            Self::Payload(payload) => f.write_str(payload.type_name()),
        }
    }
}

/// One declared handler parameter
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    /// Used in place of a missing required value unless blank
    pub default_value: Option<String>,
}

impl ParamDescriptor {
    pub fn optional(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            default_value: None,
        }
    }

    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            required: true,
            ..Self::optional(name, ty)
        }
    }

    #[must_use]
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

/// Handler name, its ordered parameter list and declared return type
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<ParamDescriptor>,
    /// Diagnostic label; the handler's output is serialized whatever it is
    pub return_type: Option<&'static str>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, params: Vec<ParamDescriptor>) -> Self {
        Self {
            name: name.into(),
            params,
            return_type: None,
        }
    }

    #[must_use]
    pub fn returning<T: ?Sized>(mut self) -> Self {
        self.return_type = Some(std::any::type_name::<T>());
        self
    }

    /// `name(param: type, ..) -> return`, for logs and diagnostics
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        match self.return_type {
            Some(ret) => format!("{}({}) -> {ret}", self.name, params.join(", ")),
            None => format!("{}({})", self.name, params.join(", ")),
        }
    }
}

/// A coerced scalar or array value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Array(ArrayValue),
}

/// Fixed-length typed array, one element per raw value
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Text(Vec<String>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
}

impl ArrayValue {
    pub const fn element_type(&self) -> ScalarType {
        match self {
            Self::Text(_) => ScalarType::Text,
            Self::I8(_) => ScalarType::I8,
            Self::I16(_) => ScalarType::I16,
            Self::I32(_) => ScalarType::I32,
            Self::I64(_) => ScalarType::I64,
            Self::F32(_) => ScalarType::F32,
            Self::F64(_) => ScalarType::F64,
            Self::Bool(_) => ScalarType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Value {
    pub const fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Self::Text(_) => Some(ScalarType::Text),
            Self::I8(_) => Some(ScalarType::I8),
            Self::I16(_) => Some(ScalarType::I16),
            Self::I32(_) => Some(ScalarType::I32),
            Self::I64(_) => Some(ScalarType::I64),
            Self::F32(_) => Some(ScalarType::F32),
            Self::F64(_) => Some(ScalarType::F64),
            Self::Bool(_) => Some(ScalarType::Bool),
            Self::Array(_) => None,
        }
    }

    pub fn conforms_to(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (Self::Array(array), ParamType::Array(element)) => array.element_type() == *element,
            (scalar, ParamType::Scalar(expected)) => scalar.scalar_type() == Some(*expected),
            _ => false,
        }
    }

    pub fn type_label(&self) -> String {
        match self {
            Self::Array(array) => format!("[{}]", array.element_type()),
            scalar => scalar
                .scalar_type()
                .map_or_else(String::new, |ty| ty.name().to_string()),
        }
    }
}

/// A decoded request body of some registered payload type
pub struct Payload {
    type_id: TypeId,
    type_name: &'static str,
    inner: Box<dyn Any + Send>,
}

impl Payload {
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        let Self {
            type_id,
            type_name,
            inner,
        } = self;
        match inner.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(inner) => Err(Self {
                type_id,
                type_name,
                inner,
            }),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.type_name).finish()
    }
}

/// One bound handler argument
#[derive(Debug)]
pub enum Argument {
    Null,
    Value(Value),
    Payload(Payload),
}

impl Argument {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null conforms to every declared type
    pub fn conforms_to(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (Self::Null, _) => true,
            (Self::Value(value), ty) => value.conforms_to(ty),
            (Self::Payload(payload), ParamType::Payload(expected)) => {
                payload.type_id() == expected.type_id()
            }
            (Self::Payload(_), _) => false,
        }
    }

    pub fn type_label(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Value(value) => value.type_label(),
            Self::Payload(payload) => payload.type_name().to_string(),
        }
    }
}

/// Ordered argument list, positionally aligned with the declared parameters
#[derive(Debug, Default)]
pub struct Args(Vec<Argument>);

impl Args {
    pub const fn new(args: Vec<Argument>) -> Self {
        Self(args)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.0.iter()
    }

    /// Take the argument at `index`, leaving `Null` in its place
    pub fn take<T: FromValue>(&mut self, index: usize) -> Result<T, DispatchError> {
        let argument = self.take_slot(index)?;
        T::from_argument(argument).map_err(|found| DispatchError::ArgumentType {
            index,
            expected: T::EXPECTED,
            found,
        })
    }

    /// Take a body-decoded payload at `index`
    pub fn payload<T: 'static>(&mut self, index: usize) -> Result<T, DispatchError> {
        let expected = std::any::type_name::<T>();
        match self.take_slot(index)? {
            Argument::Payload(payload) => {
                payload
                    .downcast::<T>()
                    .map_err(|payload| DispatchError::ArgumentType {
                        index,
                        expected,
                        found: payload.type_name().to_string(),
                    })
            }
            other => Err(DispatchError::ArgumentType {
                index,
                expected,
                found: other.type_label(),
            }),
        }
    }

    fn take_slot(&mut self, index: usize) -> Result<Argument, DispatchError> {
        let len = self.0.len();
        self.0
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, Argument::Null))
            .ok_or(DispatchError::ArgumentIndex { index, len })
    }
}

impl From<Vec<Argument>> for Args {
    fn from(args: Vec<Argument>) -> Self {
        Self(args)
    }
}

/// Conversion out of a bound argument
pub trait FromValue: Sized {
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> Option<Self>;

    /// On mismatch returns the label of what was found
    fn from_argument(argument: Argument) -> Result<Self, String> {
        match argument {
            Argument::Value(value) => {
                let found = value.type_label();
                Self::from_value(value).ok_or(found)
            }
            other => Err(other.type_label()),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: Value) -> Option<Self> {
        T::from_value(value).map(Some)
    }

    fn from_argument(argument: Argument) -> Result<Self, String> {
        match argument {
            Argument::Null => Ok(None),
            other => T::from_argument(other).map(Some),
        }
    }
}

macro_rules! from_value_impls {
    ($($ty:ty => $variant:ident, $label:literal;)*) => {$(
        impl FromValue for $ty {
            const EXPECTED: &'static str = $label;

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl FromValue for Vec<$ty> {
            const EXPECTED: &'static str = concat!("[", $label, "]");

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::Array(ArrayValue::$variant(v)) => Some(v),
                    _ => None,
                }
            }
        }
    )*};
}

from_value_impls! {
    String => Text, "text";
    i8 => I8, "i8";
    i16 => I16, "i16";
    i32 => I32, "i32";
    i64 => I64, "i64";
    f32 => F32, "f32";
    f64 => F64, "f64";
    bool => Bool, "bool";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        x: i32,
    }

    #[test]
    fn test_take_typed_arguments() {
        let mut args = Args::new(vec![
            Argument::Value(Value::Text("alice".to_string())),
            Argument::Null,
            Argument::Value(Value::Array(ArrayValue::I64(vec![1, 2]))),
        ]);

        assert_eq!(args.take::<String>(0).unwrap(), "alice");
        assert_eq!(args.take::<Option<i32>>(1).unwrap(), None);
        assert_eq!(args.take::<Vec<i64>>(2).unwrap(), vec![1, 2]);
        // Taken slots are left as null
        assert!(args.get(0).unwrap().is_null());
    }

    #[test]
    fn test_take_wrong_type() {
        let mut args = Args::new(vec![Argument::Value(Value::I32(7))]);
        let err = args.take::<bool>(0).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ArgumentType { index: 0, expected: "bool", ref found } if found == "i32"
        ));
    }

    #[test]
    fn test_take_null_as_required() {
        let mut args = Args::new(vec![Argument::Null]);
        assert!(args.take::<i32>(0).is_err());
    }

    #[test]
    fn test_take_out_of_range() {
        let mut args = Args::default();
        assert!(matches!(
            args.take::<i32>(3),
            Err(DispatchError::ArgumentIndex { index: 3, len: 0 })
        ));
    }

    #[test]
    fn test_payload_downcast() {
        let payload = PayloadType::of::<Point>().decode(br#"{"x":1}"#).unwrap();
        let mut args = Args::new(vec![Argument::Payload(payload)]);
        assert_eq!(args.payload::<Point>(0).unwrap(), Point { x: 1 });
    }

    #[test]
    fn test_payload_downcast_wrong_type() {
        let payload = PayloadType::of::<Point>().decode(br#"{"x":1}"#).unwrap();
        let mut args = Args::new(vec![Argument::Payload(payload)]);
        assert!(args.payload::<String>(0).is_err());
    }

    #[test]
    fn test_conforms_to() {
        let scalar = ParamType::Scalar(ScalarType::I32);
        let array = ParamType::Array(ScalarType::I32);

        assert!(Value::I32(1).conforms_to(&scalar));
        assert!(!Value::I64(1).conforms_to(&scalar));
        assert!(Value::Array(ArrayValue::I32(vec![])).conforms_to(&array));
        assert!(!Value::Array(ArrayValue::I32(vec![])).conforms_to(&scalar));
        assert!(Argument::Null.conforms_to(&array));
    }

    #[test]
    fn test_payload_conforms_by_type() {
        #[derive(Debug, Deserialize)]
        struct Other {
            #[allow(dead_code)]
            x: i32,
        }

        let point = ParamType::Payload(PayloadType::of::<Point>());
        let other = ParamType::Payload(PayloadType::of::<Other>());
        let decoded = PayloadType::of::<Point>().decode(br#"{"x":1}"#).unwrap();
        assert_eq!(decoded.type_id(), TypeId::of::<Point>());

        let argument = Argument::Payload(decoded);
        assert!(argument.conforms_to(&point));
        assert!(!argument.conforms_to(&other));
        assert!(!argument.conforms_to(&ParamType::Scalar(ScalarType::I32)));
    }

    #[test]
    fn test_method_signature() {
        let method = MethodDescriptor::new(
            "find",
            vec![
                ParamDescriptor::required("id", ParamType::Scalar(ScalarType::I64)),
                ParamDescriptor::optional("tags", ParamType::Array(ScalarType::Text)),
            ],
        );
        assert_eq!(method.signature(), "find(id: i64, tags: [text])");
        assert_eq!(
            method.returning::<bool>().signature(),
            "find(id: i64, tags: [text]) -> bool"
        );
    }

    #[test]
    fn test_param_type_display() {
        assert_eq!(ParamType::Scalar(ScalarType::F64).to_string(), "f64");
        assert_eq!(ParamType::Array(ScalarType::Bool).to_string(), "[bool]");
    }
}

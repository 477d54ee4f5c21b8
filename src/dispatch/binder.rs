//! Argument binding
//!
//! Read-style requests bind each declared parameter from the raw parameter
//! map. Write-style requests decode the whole body into the single declared
//! parameter.

use hyper::Method;
use serde::de::DeserializeOwned;

use super::coerce::coerce;
use super::error::DispatchError;
use super::types::{
    ArrayValue, Argument, Args, MethodDescriptor, ParamDescriptor, ParamType, ParameterMap,
    ScalarType, Value,
};
use super::validate::verify_required;

/// How arguments are produced for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStrategy {
    /// GET and DELETE: query string and form fields
    Parameters,
    /// POST and PUT: the request body
    Payload,
}

impl BindStrategy {
    pub fn for_method(method: &Method) -> Result<Self, DispatchError> {
        match *method {
            Method::GET | Method::DELETE => Ok(Self::Parameters),
            Method::POST | Method::PUT => Ok(Self::Payload),
            ref other => Err(DispatchError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Bind every declared parameter, in order, from the raw parameter map
pub fn bind_parameters(
    method: &MethodDescriptor,
    mut params: ParameterMap,
) -> Result<Args, DispatchError> {
    // Body-only types are a declaration problem, reported before anything
    // about the request itself
    for descriptor in &method.params {
        if let ParamType::Payload(payload) = &descriptor.ty {
            return Err(DispatchError::UnsupportedType {
                param: descriptor.name.clone(),
                ty: payload.type_name().to_string(),
            });
        }
    }

    verify_required(&mut params, &method.params)?;

    let mut args = Vec::with_capacity(method.params.len());
    for descriptor in &method.params {
        let values = params.get(&descriptor.name).map_or(&[][..], Vec::as_slice);
        let argument = coerce(&descriptor.ty, values)
            .map_err(|e| DispatchError::from_coercion(&descriptor.name, e))?
            .map_or(Argument::Null, Argument::Value);
        args.push(argument);
    }
    Ok(Args::new(args))
}

/// Decode the request body into the handler's only parameter
pub fn bind_payload(method: &MethodDescriptor, body: &[u8]) -> Result<Args, DispatchError> {
    let [descriptor] = method.params.as_slice() else {
        return Err(DispatchError::PayloadArity {
            handler: method.name.clone(),
            expected: 1,
            actual: method.params.len(),
        });
    };

    Ok(Args::new(vec![decode_body(descriptor, body)?]))
}

fn decode_body(descriptor: &ParamDescriptor, body: &[u8]) -> Result<Argument, DispatchError> {
    let invalid = |e: serde_json::Error| DispatchError::InvalidBody {
        param: descriptor.name.clone(),
        expected: descriptor.ty.to_string(),
        reason: e.to_string(),
    };

    match &descriptor.ty {
        ParamType::Payload(payload) => payload.decode(body).map(Argument::Payload).map_err(invalid),
        _ if body.trim_ascii().is_empty() => Ok(Argument::Null),
        ParamType::Scalar(scalar) => decode_scalar(*scalar, body)
            .map(|v| v.map_or(Argument::Null, Argument::Value))
            .map_err(invalid),
        ParamType::Array(element) => decode_array(*element, body)
            .map(|v| v.map_or(Argument::Null, Argument::Value))
            .map_err(invalid),
    }
}

fn decode_json<T: DeserializeOwned>(
    body: &[u8],
    wrap: fn(T) -> Value,
) -> Result<Option<Value>, serde_json::Error> {
    Ok(serde_json::from_slice::<Option<T>>(body)?.map(wrap))
}

fn decode_scalar(ty: ScalarType, body: &[u8]) -> Result<Option<Value>, serde_json::Error> {
    match ty {
        ScalarType::Text => decode_json(body, Value::Text),
        ScalarType::I8 => decode_json(body, Value::I8),
        ScalarType::I16 => decode_json(body, Value::I16),
        ScalarType::I32 => decode_json(body, Value::I32),
        ScalarType::I64 => decode_json(body, Value::I64),
        ScalarType::F32 => decode_json(body, Value::F32),
        ScalarType::F64 => decode_json(body, Value::F64),
        ScalarType::Bool => decode_json(body, Value::Bool),
    }
}

fn decode_array(element: ScalarType, body: &[u8]) -> Result<Option<Value>, serde_json::Error> {
    match element {
        ScalarType::Text => decode_json(body, |v: Vec<String>| Value::Array(ArrayValue::Text(v))),
        ScalarType::I8 => decode_json(body, |v: Vec<i8>| Value::Array(ArrayValue::I8(v))),
        ScalarType::I16 => decode_json(body, |v: Vec<i16>| Value::Array(ArrayValue::I16(v))),
        ScalarType::I32 => decode_json(body, |v: Vec<i32>| Value::Array(ArrayValue::I32(v))),
        ScalarType::I64 => decode_json(body, |v: Vec<i64>| Value::Array(ArrayValue::I64(v))),
        ScalarType::F32 => decode_json(body, |v: Vec<f32>| Value::Array(ArrayValue::F32(v))),
        ScalarType::F64 => decode_json(body, |v: Vec<f64>| Value::Array(ArrayValue::F64(v))),
        ScalarType::Bool => decode_json(body, |v: Vec<bool>| Value::Array(ArrayValue::Bool(v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::types::PayloadType;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        x: i32,
    }

    fn params(pairs: &[(&str, &str)]) -> ParameterMap {
        let mut map = ParameterMap::new();
        for (name, value) in pairs {
            map.entry((*name).to_string())
                .or_default()
                .push((*value).to_string());
        }
        map
    }

    fn greet() -> MethodDescriptor {
        MethodDescriptor::new(
            "greet",
            vec![
                ParamDescriptor::required("name", ParamType::Scalar(ScalarType::Text))
                    .with_default("guest"),
                ParamDescriptor::optional("age", ParamType::Scalar(ScalarType::I32)),
            ],
        )
    }

    #[test]
    fn test_strategy_by_method() {
        assert_eq!(BindStrategy::for_method(&Method::GET).unwrap(), BindStrategy::Parameters);
        assert_eq!(BindStrategy::for_method(&Method::DELETE).unwrap(), BindStrategy::Parameters);
        assert_eq!(BindStrategy::for_method(&Method::POST).unwrap(), BindStrategy::Payload);
        assert_eq!(BindStrategy::for_method(&Method::PUT).unwrap(), BindStrategy::Payload);

        let err = BindStrategy::for_method(&Method::PATCH).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported 'PATCH' request method.");
    }

    #[test]
    fn test_bind_defaults_and_nulls() {
        let mut args = bind_parameters(&greet(), ParameterMap::new()).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args.take::<String>(0).unwrap(), "guest");
        assert!(args.get(1).unwrap().is_null());
    }

    #[test]
    fn test_bind_first_value_wins() {
        let map = params(&[("name", "alice"), ("age", "7"), ("age", "9")]);
        let mut args = bind_parameters(&greet(), map).unwrap();
        assert_eq!(args.take::<String>(0).unwrap(), "alice");
        assert_eq!(args.take::<i32>(1).unwrap(), 7);
    }

    #[test]
    fn test_bind_array() {
        let method = MethodDescriptor::new(
            "list",
            vec![ParamDescriptor::optional("ids", ParamType::Array(ScalarType::I32))],
        );
        let map = params(&[("ids", "1"), ("ids", "2"), ("ids", "3")]);
        let mut args = bind_parameters(&method, map).unwrap();
        assert_eq!(args.take::<Vec<i32>>(0).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_bind_coercion_error_names_param() {
        let map = params(&[("age", "old")]);
        let err = bind_parameters(&greet(), map).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value 'old' for parameter 'age': expected i32"
        );
    }

    #[test]
    fn test_bind_parameters_rejects_payload_type() {
        let method = MethodDescriptor::new(
            "create",
            vec![ParamDescriptor::optional(
                "point",
                ParamType::Payload(PayloadType::of::<Point>()),
            )],
        );
        assert!(matches!(
            bind_parameters(&method, ParameterMap::new()),
            Err(DispatchError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_required_payload_under_parameters_is_unsupported() {
        let method = MethodDescriptor::new(
            "create",
            vec![ParamDescriptor::required(
                "point",
                ParamType::Payload(PayloadType::of::<Point>()),
            )],
        );
        let err = bind_parameters(&method, ParameterMap::new()).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::UnsupportedType { ref param, .. } if param == "point"
        ));
    }

    #[test]
    fn test_bind_payload_struct() {
        let method = MethodDescriptor::new(
            "create",
            vec![ParamDescriptor::optional(
                "point",
                ParamType::Payload(PayloadType::of::<Point>()),
            )],
        );
        let mut args = bind_payload(&method, br#"{"x":1}"#).unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args.payload::<Point>(0).unwrap(), Point { x: 1 });
    }

    #[test]
    fn test_bind_payload_invalid_body() {
        let method = MethodDescriptor::new(
            "create",
            vec![ParamDescriptor::optional(
                "point",
                ParamType::Payload(PayloadType::of::<Point>()),
            )],
        );
        assert!(matches!(
            bind_payload(&method, br#"{"x":"one"}"#),
            Err(DispatchError::InvalidBody { .. })
        ));
    }

    #[test]
    fn test_bind_payload_scalar_and_array() {
        let method = MethodDescriptor::new(
            "rename",
            vec![ParamDescriptor::optional("name", ParamType::Scalar(ScalarType::Text))],
        );
        let mut args = bind_payload(&method, br#""alice""#).unwrap();
        assert_eq!(args.take::<String>(0).unwrap(), "alice");

        let args = bind_payload(&method, b"  ").unwrap();
        assert!(args.get(0).unwrap().is_null());

        let args = bind_payload(&method, b"null").unwrap();
        assert!(args.get(0).unwrap().is_null());

        let method = MethodDescriptor::new(
            "batch",
            vec![ParamDescriptor::optional("ids", ParamType::Array(ScalarType::I64))],
        );
        let mut args = bind_payload(&method, b"[4,5]").unwrap();
        assert_eq!(args.take::<Vec<i64>>(0).unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_bind_payload_arity() {
        let err = bind_payload(&greet(), b"{}").unwrap_err();
        assert!(matches!(
            err,
            DispatchError::PayloadArity { expected: 1, actual: 2, .. }
        ));

        let empty = MethodDescriptor::new("ping", Vec::new());
        assert!(bind_payload(&empty, b"").is_err());
    }
}

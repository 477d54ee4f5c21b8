//! Request dispatch core
//!
//! Binds loosely typed request data to a handler's declared parameters,
//! invokes the handler and normalizes the outcome into a `ResponseEnvelope`.

mod binder;
mod coerce;
mod dispatcher;
mod error;
mod types;
mod validate;

pub use binder::{bind_parameters, bind_payload, BindStrategy};
pub use coerce::coerce;
pub use dispatcher::{Dispatcher, Handler, HandlerBinding, HandlerFault, LogSink};
pub use error::{CoercionError, DispatchError, RegistrationError};
pub use types::{
    Argument, Args, ArrayValue, FromValue, MethodDescriptor, ParamDescriptor, ParamType,
    ParameterMap, Payload, PayloadType, ScalarType, Value,
};
pub use validate::verify_required;

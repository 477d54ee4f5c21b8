//! Handler binding and dispatch
//!
//! A `Dispatcher` owns one immutable `HandlerBinding`. Each call binds
//! arguments according to the request verb, invokes the handler and folds
//! every failure into an error envelope. Nothing escapes as a fault.

use serde::Serialize;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::binder::{bind_parameters, bind_payload, BindStrategy};
use super::coerce::coerce;
use super::error::{DispatchError, RegistrationError};
use super::types::{Args, MethodDescriptor, ParamDescriptor, ParamType};
use crate::request::RequestSource;
use crate::response::ResponseEnvelope;

/// Error a handler may return
pub type HandlerFault = Box<dyn std::error::Error + Send + Sync>;

/// Application logic invoked with bound arguments.
///
/// Handlers are shared between concurrent dispatches, so any state they keep
/// must be internally synchronized.
pub trait Handler: Send + Sync {
    fn invoke(&self, args: Args) -> Result<serde_json::Value, HandlerFault>;
}

impl<F, T, E> Handler for F
where
    F: Fn(Args) -> Result<T, E> + Send + Sync,
    T: Serialize,
    E: Into<HandlerFault>,
{
    fn invoke(&self, args: Args) -> Result<serde_json::Value, HandlerFault> {
        let output = self(args).map_err(Into::into)?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Where dispatch failures are reported
pub trait LogSink: Send + Sync {
    fn log_failure(&self, message: &str);
}

/// Handler target plus its declared signature
#[derive(Clone)]
pub struct HandlerBinding {
    target: Arc<dyn Handler>,
    method: Arc<MethodDescriptor>,
}

impl HandlerBinding {
    pub fn new(target: Arc<dyn Handler>, method: MethodDescriptor) -> Result<Self, RegistrationError> {
        check_descriptor(&method)?;
        Ok(Self {
            target,
            method: Arc::new(method),
        })
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }
}

impl std::fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

fn check_descriptor(method: &MethodDescriptor) -> Result<(), RegistrationError> {
    let mut seen = HashSet::new();
    for param in &method.params {
        if param.name.trim().is_empty() {
            return Err(RegistrationError::BlankName {
                handler: method.name.clone(),
            });
        }
        if !seen.insert(param.name.as_str()) {
            return Err(RegistrationError::DuplicateParameter {
                handler: method.name.clone(),
                param: param.name.clone(),
            });
        }
        if matches!(param.ty, ParamType::Payload(_)) && method.params.len() > 1 {
            return Err(RegistrationError::PayloadNotSole {
                handler: method.name.clone(),
                param: param.name.clone(),
            });
        }
        check_default(method, param)?;
    }
    Ok(())
}

/// A non-blank default must coerce to the declared type
fn check_default(method: &MethodDescriptor, param: &ParamDescriptor) -> Result<(), RegistrationError> {
    let Some(default) = param.default_value.as_deref().filter(|d| !d.trim().is_empty()) else {
        return Ok(());
    };

    let reason = match &param.ty {
        ParamType::Payload(payload) => {
            format!("payload type {} takes no default", payload.type_name())
        }
        ty => match coerce(ty, &[default.to_string()]) {
            Ok(_) => return Ok(()),
            Err(e) => e.to_string(),
        },
    };
    Err(RegistrationError::InvalidDefault {
        handler: method.name.clone(),
        param: param.name.clone(),
        reason,
    })
}

pub struct Dispatcher {
    binding: HandlerBinding,
    log: Arc<dyn LogSink>,
}

impl Dispatcher {
    pub fn new(binding: HandlerBinding, log: Arc<dyn LogSink>) -> Self {
        Self { binding, log }
    }

    pub const fn binding(&self) -> &HandlerBinding {
        &self.binding
    }

    /// Dispatch one request; failures come back as an error envelope
    pub fn dispatch<R: RequestSource + ?Sized>(&self, request: &R) -> ResponseEnvelope {
        match self.call(request) {
            Ok(payload) => ResponseEnvelope::Success(payload),
            Err(e) => {
                let message = e.to_string();
                self.log.log_failure(&message);
                ResponseEnvelope::error(message)
            }
        }
    }

    /// Bind and invoke without converting the failure
    pub fn call<R: RequestSource + ?Sized>(
        &self,
        request: &R,
    ) -> Result<serde_json::Value, DispatchError> {
        let args = self.bind(request)?;
        let target = &self.binding.target;

        match panic::catch_unwind(AssertUnwindSafe(|| target.invoke(args))) {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(fault)) => Err(DispatchError::HandlerInvocation(fault.to_string())),
            Err(cause) => Err(DispatchError::HandlerInvocation(panic_message(cause.as_ref()))),
        }
    }

    fn bind<R: RequestSource + ?Sized>(&self, request: &R) -> Result<Args, DispatchError> {
        let method = self.binding.method();
        let args = match BindStrategy::for_method(request.method())? {
            BindStrategy::Parameters => bind_parameters(method, request.parameter_map()?)?,
            BindStrategy::Payload => bind_payload(method, request.body())?,
        };
        check_arguments(method, &args)?;
        Ok(args)
    }
}

/// Arguments must line up with the declared parameters before invocation
fn check_arguments(method: &MethodDescriptor, args: &Args) -> Result<(), DispatchError> {
    if args.len() != method.params.len() {
        return Err(DispatchError::ArgumentMismatch {
            handler: method.name.clone(),
            detail: format!(
                "{} arguments bound for {} parameters",
                args.len(),
                method.params.len()
            ),
        });
    }

    for (param, argument) in method.params.iter().zip(args.iter()) {
        if !argument.conforms_to(&param.ty) {
            return Err(DispatchError::ArgumentMismatch {
                handler: method.name.clone(),
                detail: format!(
                    "parameter '{}' declared {} but bound {}",
                    param.name,
                    param.ty,
                    argument.type_label()
                ),
            });
        }
    }
    Ok(())
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

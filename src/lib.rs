//! Request dispatch for statically registered handlers.
//!
//! Incoming query, form or body data is coerced into each handler's declared
//! parameter types, the handler is invoked, and the result or any failure is
//! returned as a uniform `ResponseEnvelope`.

pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod logger;
pub mod request;
pub mod response;
pub mod routing;
pub mod server;

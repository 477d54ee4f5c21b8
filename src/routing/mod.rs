//! Routing module
//!
//! Exact-path table from request path to the dispatcher bound for it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatch::{
    Dispatcher, Handler, HandlerBinding, LogSink, MethodDescriptor, RegistrationError,
};
use crate::logger;
use crate::request::DispatchRequest;
use crate::response::ResponseEnvelope;

pub struct Router {
    routes: HashMap<String, Dispatcher>,
    log: Arc<dyn LogSink>,
}

impl Router {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self {
            routes: HashMap::new(),
            log,
        }
    }

    /// Bind `handler` to `path`; the descriptor is checked here, once
    pub fn register<H: Handler + 'static>(
        &mut self,
        path: &str,
        method: MethodDescriptor,
        handler: H,
    ) -> Result<(), RegistrationError> {
        if self.routes.contains_key(path) {
            return Err(RegistrationError::DuplicateRoute(path.to_string()));
        }

        let binding = HandlerBinding::new(Arc::new(handler), method)?;
        logger::log_route_registered(path, &binding.method().signature());
        self.routes.insert(
            path.to_string(),
            Dispatcher::new(binding, Arc::clone(&self.log)),
        );
        Ok(())
    }

    pub fn resolve(&self, path: &str) -> Option<&Dispatcher> {
        self.routes.get(path)
    }

    /// Dispatch to the route for the request path, 404 envelope if none
    pub fn route(&self, request: &DispatchRequest) -> ResponseEnvelope {
        match self.resolve(request.path()) {
            Some(dispatcher) => dispatcher.dispatch(request),
            None => ResponseEnvelope::with_code(
                404,
                format!("No handler registered for '{}'", request.path()),
            ),
        }
    }

    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

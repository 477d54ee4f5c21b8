//! Request source
//!
//! What the dispatcher needs from an HTTP request: the verb, the raw
//! multi-valued parameters and the body bytes.

use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::{Method, Uri};

use crate::dispatch::{DispatchError, ParameterMap};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub trait RequestSource {
    fn method(&self) -> &Method;

    /// Query string parameters, plus form fields for url-encoded bodies
    fn parameter_map(&self) -> Result<ParameterMap, DispatchError>;

    fn body(&self) -> &[u8];
}

/// A fully received request, detached from the connection
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    method: Method,
    path: String,
    query: Option<String>,
    content_type: Option<String>,
    body: Bytes,
}

impl DispatchRequest {
    pub fn new(method: Method, uri: &Uri) -> Self {
        Self {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(ToString::to_string),
            content_type: None,
            body: Bytes::new(),
        }
    }

    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        let content_type = parts
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        Self::new(parts.method.clone(), &parts.uri).with_body(content_type, body)
    }

    #[must_use]
    pub fn with_body(mut self, content_type: Option<String>, body: Bytes) -> Self {
        self.content_type = content_type;
        self.body = body;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn is_form(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| {
            ct.split(';')
                .next()
                .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
        })
    }
}

impl RequestSource for DispatchRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn parameter_map(&self) -> Result<ParameterMap, DispatchError> {
        let mut params = ParameterMap::new();
        if let Some(query) = &self.query {
            append_pairs(&mut params, query)?;
        }
        if self.is_form() && !self.body.is_empty() {
            let form = std::str::from_utf8(&self.body)
                .map_err(|e| DispatchError::InvalidForm(e.to_string()))?;
            append_pairs(&mut params, form)?;
        }
        Ok(params)
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

fn append_pairs(params: &mut ParameterMap, encoded: &str) -> Result<(), DispatchError> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(encoded).map_err(|e| DispatchError::InvalidForm(e.to_string()))?;
    for (name, value) in pairs {
        params.entry(name).or_default().push(value);
    }
    Ok(())
}

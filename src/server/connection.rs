// Connection handling
// Serves one TCP connection with hyper and turns each request into a dispatch

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::ServerState;
use crate::logger::{self, AccessLogEntry};
use crate::request::DispatchRequest;
use crate::response::ResponseEnvelope;

/// Serve a connection in a spawned task, bounded by the request timeout
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<ServerState>,
) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let timeout = Duration::from_secs(state.config.performance.request_timeout);

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.config.performance.keep_alive);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        match tokio::time::timeout(timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                timeout.as_secs()
            )),
        }
    });
}

/// Read the body, dispatch through the router and render the envelope
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<ServerState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let envelope = match read_body(&parts, body, state.config.http.max_body_size).await {
        Ok(bytes) => state.router.route(&DispatchRequest::from_parts(&parts, bytes)),
        Err(envelope) => envelope,
    };
    let dispatch_error = envelope.is_error();
    let response = envelope.into_response(&state.config.http.server_name);

    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            parts.method.to_string(),
            parts.uri.path().to_string(),
        );
        entry.query = parts.uri.query().map(ToString::to_string);
        entry.http_version = format!("{:?}", parts.version)
            .trim_start_matches("HTTP/")
            .to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry.dispatch_error = dispatch_error;
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Collect the body, refusing anything over `max_body_size`
async fn read_body<B>(parts: &Parts, body: B, max_body_size: u64) -> Result<Bytes, ResponseEnvelope>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if let Some(size) = declared_length(parts) {
        if size > max_body_size {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            return Err(too_large(max_body_size));
        }
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(too_large(max_body_size)),
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(ResponseEnvelope::with_code(400, "Failed to read request body"))
        }
    }
}

fn declared_length(parts: &Parts) -> Option<u64> {
    let value = parts.headers.get("content-length")?;
    match value.to_str().ok().and_then(|v| v.parse().ok()) {
        Some(size) => Some(size),
        None => {
            logger::log_warning("Invalid Content-Length value, skipping size check");
            None
        }
    }
}

fn too_large(max_body_size: u64) -> ResponseEnvelope {
    ResponseEnvelope::with_code(
        413,
        format!("Request body exceeds {max_body_size} bytes"),
    )
}

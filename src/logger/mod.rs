//! Logger module
//!
//! Provides logging utilities for the dispatch server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Dispatch failure reporting
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use crate::dispatch::LogSink;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write_info(message: &str) {
    if let Some(writer) = writer::get() {
        writer.write_info(message);
    } else {
        println!("{message}");
    }
}

fn write_error(message: &str) {
    if let Some(writer) = writer::get() {
        writer.write_error(message);
    } else {
        eprintln!("{message}");
    }
}

fn write_access(message: &str) {
    if let Some(writer) = writer::get() {
        writer.write_access(message);
    } else {
        println!("{message}");
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, routes: &[&str]) {
    write_info("======================================");
    write_info("Dispatch server started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info(&format!("Max body size: {} bytes", config.http.max_body_size));
    for route in routes {
        write_info(&format!("  - {route}"));
    }
    write_info("======================================\n");
}

pub fn log_route_registered(path: &str, signature: &str) {
    write_info(&format!("[Route] {path} -> {signature}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_dispatch_failure(message: &str) {
    write_error(&format!("[DISPATCH] Reasons for failure: {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

/// Operational log sink backed by the server's error log
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerLog;

impl LogSink for ServerLog {
    fn log_failure(&self, message: &str) {
        log_dispatch_failure(message);
    }
}

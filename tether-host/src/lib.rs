//! # tether-host
//!
//! Reference host for `tether-core`. Runs the command channel client in
//! the foreground with:
//!
//! - a dedicated surface thread serving captures of a still image
//! - location and history records read line by line from stdin
//! - TOML configuration and `tracing` logging

pub mod config;
pub mod feed;
pub mod service;
pub mod surface;

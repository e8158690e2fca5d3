//! authproxy is an authenticating reverse HTTP proxy.
//!
//! Every inbound request is authenticated first. Rejected callers get a
//! `401` and never reach the upstream. Accepted callers have their
//! identity claims written into a reserved header namespace (default
//! `Internal-`); any header the client tried to set inside that namespace
//! is dropped, so the upstream can trust it. The sanitized request is
//! forwarded to a single destination and the response is streamed back.
//!
//! # Architecture
//!
//! - [`auth`] -- The [`Authenticator`](auth::Authenticator) capability,
//!   [`Identity`](auth::Identity) claims, and a config-driven token
//!   authenticator.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate, health).
//! - [`config`] -- Configuration model, file loading, and validation.
//! - [`error`] -- Crate-level error types using `thiserror`.
//! - [`health`] -- Health endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`proxy`] -- The request pipeline: header transform, forwarding, and
//!   the upstream client seam.
//! - [`server`] -- Axum router, shared application state, stats, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `toml` | TOML config file support |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod auth;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod proxy;
pub mod server;

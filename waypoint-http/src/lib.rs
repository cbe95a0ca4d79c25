#![deny(missing_docs)]
//! JSON-RPC 2.0 over HTTP transport for the waypoint runtime contract.
//!
//! Implements [`waypoint_core::Connector`] and [`waypoint_core::Runtime`]
//! against a runtime exposing one HTTP endpoint:
//!
//! - admin requests are sent as `admin/<name>`, e.g. `admin/instance/list`;
//! - application calls use `call` with `{instance_id, zome, function, args}`;
//! - a JSON-RPC error with code `-32001`, or with `data.kind == "timeout"`,
//!   and a reqwest timeout all surface as [`waypoint_core::RuntimeError::Timeout`].

mod client;
mod error;
pub mod types;

pub use client::{HttpConnector, HttpRuntime};

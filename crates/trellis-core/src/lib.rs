//! # Trellis Core
//!
//! Core types shared by every Trellis crate.
//!
//! This crate provides the collaborators the route compiler consumes:
//!
//! - [`Container`] / [`Scope`] - Dependency injection with per-request overlays
//! - [`Controller`] - Types exposing a named action table
//! - [`Request`] - The inbound request object handed to compiled handlers
//! - [`ResponseHead`] / [`Reply`] - Response status/header helper and the final reply
//! - [`HandlerError`] - Runtime error rendered as a `{code, message, data}` envelope
//! - [`ApiNamespace`] - Namespace/version provider for final route paths

#![doc(html_root_url = "https://docs.rs/trellis-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod controller;
pub mod di;
mod error;
mod namespace;
mod params;
mod request;
mod response;

pub use controller::{ActionFn, Actions, Controller, ControllerAction};
pub use di::{Container, FromScope, Inject, Injectable, InjectionError, Scope};
pub use error::{HandlerError, HandlerResult};
pub use namespace::{ApiNamespace, StaticNamespace};
pub use params::Params;
pub use request::Request;
pub use response::{IntoPayload, Json, Reply, ResponseEmitter, ResponseHead};

//! A minimal UI component runtime.
//!
//! - [`build`] creates immutable [`Node`] descriptions of elements, text and components.
//! - Components receive a [`Scope`] with per-instance state hooks ([`Scope::use_state`]).
//!   Instances are identified by their position in the tree and the component function.
//! - [`Runtime::render`] materializes a description on a display [`Surface`] and updates it in place on every later pass.
//!
//! [`web::WebSurface`] renders into the browser DOM, [`memory::MemorySurface`] into memory.

#![doc(html_root_url = "https://docs.rs/sapling-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod closure_map;
mod config;
mod diff;
mod error;
mod event;
mod hooks;
mod node;
mod runtime;
mod surface;

pub mod memory;
pub mod web;

pub use config::Config;
pub use error::Error;
pub use event::{Callback, Event, Handler};
pub use hooks::{Scope, SetState};
pub use node::{build, component, Child, Children, Component, Kind, Node, PropValue, Props};
pub use runtime::{Mount, Runtime};
pub use surface::Surface;

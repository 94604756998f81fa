//! Forge Interpreter
//!
//! This crate provides the flow interpreter for portfolio-forge. It walks a
//! [`SitePlan`](forge_config::SitePlan) flow one step at a time against a
//! [`RenderSurface`](forge_surface::RenderSurface), awaiting each typing or
//! wipe animation before scheduling the next step.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use forge_config::SitePlan;
//! use forge_interpreter::{FlowInterpreter, StartMode};
//! use forge_surface::MemorySurface;
//!
//! let plan = Arc::new(SitePlan::builtin()?);
//! let surface = Arc::new(MemorySurface::new(plan.meta.animation_settings.clone()));
//! let interpreter = FlowInterpreter::new(plan, surface);
//!
//! interpreter.initialize(StartMode::Animated);
//! interpreter.handle_command("skip");
//! ```
//!
//! Lookup failures never stop a run: a step whose target does not resolve
//! is logged as a warning, reported as
//! [`FlowEvent::UnresolvedReference`], and skipped.

mod command;
mod events;
mod interpreter;

pub use command::Command;
pub use events::{ChannelNotifier, FlowEvent, FlowNotifier, NoopNotifier, RecordingNotifier};
pub use interpreter::{FlowInterpreter, RunStatus, StartMode};

//! Forge Surface
//!
//! This crate provides the render surface the flow interpreter drives: the
//! [`RenderSurface`] trait, an in-memory [`Page`] model, and
//! [`MemorySurface`], which animates that page on tokio timers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   primitives    ┌──────────────────────┐
//! │   FlowInterpreter    │ ──────────────▶ │    RenderSurface     │
//! │  (forge-interpreter) │ ◀────────────── │   (MemorySurface)    │
//! └──────────────────────┘   completion    └──────────────────────┘
//!                                                     │ revision (watch)
//!                                                     ▼
//!                                          ┌──────────────────────┐
//!                                          │ front end (terminal) │
//!                                          │  draws Page snapshot │
//!                                          └──────────────────────┘
//! ```

mod events;
mod memory;
mod page;
mod surface;

pub use events::SurfaceEvent;
pub use memory::MemorySurface;
pub use page::{ElementView, LogLine, Page, SectionView};
pub use surface::{RenderSurface, SurfaceError};

//! Forge Config
//!
//! This crate contains the serializable site plan for portfolio-forge. A plan
//! describes the page content (sections holding versioned elements) and the
//! flow: the ordered list of steps the interpreter walks to "generate" the
//! page.
//!
//! Plans can be loaded from:
//! - the built-in plan compiled into the binary ([`SitePlan::builtin`])
//! - JSON files (via the CLI with `--plan=plan.json`)
//!
//! Loading validates structure (unique ids, at most one final version per
//! element, positive animation settings). References from flow steps to
//! sections, elements and versions are only checked softly: an unresolved
//! reference turns its step into a no-op at runtime, so it is reported by
//! [`SitePlan::dangling_references`] rather than rejected.

mod error;
mod plan;
mod section;
mod settings;
mod step;

pub use error::PlanError;
pub use plan::{DanglingReference, PlanMeta, SitePlan, UtilityCommand, DEFAULT_ENHANCE_COMMAND};
pub use section::{Element, ElementTag, Section, SectionKind, Version};
pub use settings::AnimationSettings;
pub use step::{LogCategory, Step, StepAction, VisualState};

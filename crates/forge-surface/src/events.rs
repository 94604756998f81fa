//! Journal of render surface calls.
//!
//! [`MemorySurface`](crate::MemorySurface) records one event per primitive
//! call so callers can check ordering (for example that two reveals never
//! overlap) without sampling the page at the right instant.

use forge_config::{LogCategory, VisualState};

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
  InitialRevealed { section_ids: Vec<String> },
  SectionEnsured { section_id: String },
  ElementRendered { element_id: String },
  RevealStarted { element_id: String },
  RevealCompleted { element_id: String },
  UpdateStarted { element_id: String },
  UpdateCompleted { element_id: String },
  /// A typing or wipe animation stopped early because of `cancel_animations`.
  AnimationInterrupted,
  ElementRemoved { element_id: String },
  SectionRemoved { section_id: String },
  WipeStarted,
  WipeCompleted,
  ContentCleared,
  SectionStateSet { section_id: String, state: VisualState },
  LogAppended { text: String, category: LogCategory },
  LogCleared,
  AnimationsCancelled,
  TitleSet { title: String },
}

impl SurfaceEvent {
  /// Whether this event changed the content area.
  pub fn mutates_content(&self) -> bool {
    matches!(
      self,
      SurfaceEvent::InitialRevealed { .. }
        | SurfaceEvent::SectionEnsured { .. }
        | SurfaceEvent::ElementRendered { .. }
        | SurfaceEvent::RevealStarted { .. }
        | SurfaceEvent::UpdateStarted { .. }
        | SurfaceEvent::ElementRemoved { .. }
        | SurfaceEvent::SectionRemoved { .. }
        | SurfaceEvent::WipeStarted
        | SurfaceEvent::ContentCleared
        | SurfaceEvent::SectionStateSet { .. }
    )
  }
}

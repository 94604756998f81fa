//! The render surface contract.

use async_trait::async_trait;
use forge_config::{Element, LogCategory, Section, VisualState};

/// Errors reported by render surface primitives.
///
/// None of these are fatal to a run: the interpreter logs them as warnings
/// and moves on to the next step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
  /// The element has not been rendered (or was removed).
  #[error("element not rendered: {0}")]
  ElementNotFound(String),

  /// The section has no wrapper on the page.
  #[error("section not rendered: {0}")]
  SectionNotFound(String),

  /// The animation was interrupted by `cancel_animations`.
  #[error("animation cancelled")]
  Cancelled,
}

/// Primitives the flow interpreter drives.
///
/// Immediate primitives mutate the page and return. Timed primitives
/// (`reveal_element`, `update_element`, `wipe_all`) resolve once their
/// animation has finished, or with [`SurfaceError::Cancelled`] when
/// [`cancel_animations`](RenderSurface::cancel_animations) interrupts them.
#[async_trait]
pub trait RenderSurface: Send + Sync {
  /// Render placeholder sections in one shot, each element at its first version.
  fn reveal_initial(&self, sections: &[&Section]);

  /// Create the wrapper for a section if it does not exist yet.
  fn ensure_section(&self, section: &Section);

  /// Render an element immediately, without typing.
  fn render_element(&self, section: &Section, element: &Element, text: &str);

  /// Create a new element in the section wrapper and type `text` into it.
  async fn reveal_element(
    &self,
    section: &Section,
    element: &Element,
    text: &str,
  ) -> Result<(), SurfaceError>;

  /// Clear an already-rendered element and retype it with `text`.
  async fn update_element(&self, element_id: &str, text: &str) -> Result<(), SurfaceError>;

  fn remove_element(&self, element_id: &str) -> Result<(), SurfaceError>;

  /// Remove a section wrapper together with its elements.
  fn remove_section(&self, section_id: &str) -> Result<(), SurfaceError>;

  /// Progressively erase the rendered content from the end, then clear it.
  async fn wipe_all(&self) -> Result<(), SurfaceError>;

  /// Clear the content area immediately.
  fn clear_all(&self);

  fn set_section_state(&self, section_id: &str, state: VisualState) -> Result<(), SurfaceError>;

  fn append_log(&self, text: &str, category: LogCategory);

  fn clear_log(&self);

  /// Interrupt every in-flight typing and wipe animation.
  fn cancel_animations(&self);

  fn set_title(&self, title: &str);
}

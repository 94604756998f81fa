//! Render surface backed by an in-memory [`Page`].

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use forge_config::{AnimationSettings, Element, LogCategory, Section, VisualState};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::SurfaceEvent;
use crate::page::{ElementView, Page};
use crate::surface::{RenderSurface, SurfaceError};

/// A [`RenderSurface`] that animates an in-memory page on tokio timers.
///
/// Every mutation bumps a revision counter; front ends call
/// [`subscribe`](MemorySurface::subscribe) and redraw from
/// [`snapshot`](MemorySurface::snapshot) when it changes.
pub struct MemorySurface {
  settings: AnimationSettings,
  page: Mutex<Page>,
  /// Token shared by all in-flight animations; replaced on cancel.
  animations: Mutex<CancellationToken>,
  revision: watch::Sender<u64>,
  /// Only recorded when built with [`with_journal`](MemorySurface::with_journal).
  journal: Option<Mutex<Vec<SurfaceEvent>>>,
}

impl MemorySurface {
  pub fn new(settings: AnimationSettings) -> Self {
    let (revision, _) = watch::channel(0);
    Self {
      settings,
      page: Mutex::new(Page::new()),
      animations: Mutex::new(CancellationToken::new()),
      revision,
      journal: None,
    }
  }

  /// A surface that also records every primitive call, see [`events`](MemorySurface::events).
  pub fn with_journal(settings: AnimationSettings) -> Self {
    Self {
      journal: Some(Mutex::new(Vec::new())),
      ..Self::new(settings)
    }
  }

  /// A copy of the current page.
  pub fn snapshot(&self) -> Page {
    self.page.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Receiver that changes whenever the page does.
  pub fn subscribe(&self) -> watch::Receiver<u64> {
    self.revision.subscribe()
  }

  /// Every primitive call recorded so far. Always empty without a journal.
  pub fn events(&self) -> Vec<SurfaceEvent> {
    match &self.journal {
      Some(journal) => journal.lock().unwrap_or_else(PoisonError::into_inner).clone(),
      None => Vec::new(),
    }
  }

  /// Drain the journal.
  pub fn take_events(&self) -> Vec<SurfaceEvent> {
    match &self.journal {
      Some(journal) => std::mem::take(&mut *journal.lock().unwrap_or_else(PoisonError::into_inner)),
      None => Vec::new(),
    }
  }

  fn mutate<R>(&self, f: impl FnOnce(&mut Page) -> R) -> R {
    let result = {
      let mut page = self.page.lock().unwrap_or_else(PoisonError::into_inner);
      f(&mut page)
    };
    self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    result
  }

  fn record(&self, event: SurfaceEvent) {
    if let Some(journal) = &self.journal {
      journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(event);
    }
  }

  fn animation_token(&self) -> CancellationToken {
    self
      .animations
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  async fn pause(&self, token: &CancellationToken, duration: Duration) -> Result<(), SurfaceError> {
    tokio::select! {
      biased;
      _ = token.cancelled() => Err(SurfaceError::Cancelled),
      _ = tokio::time::sleep(duration) => Ok(()),
    }
  }

  /// Type `text` into an existing element one character per tick, then
  /// settle for `line_delay`.
  async fn type_text(
    &self,
    element_id: &str,
    text: &str,
    token: &CancellationToken,
  ) -> Result<(), SurfaceError> {
    let mut typed = String::with_capacity(text.len());
    for ch in text.chars() {
      typed.push(ch);
      if !self.mutate(|page| page.set_element_text(element_id, &typed)) {
        // Removed from under us (content cleared mid-animation).
        return Err(SurfaceError::ElementNotFound(element_id.to_string()));
      }
      self.pause(token, self.settings.typing_interval()).await?;
    }
    self.pause(token, self.settings.line_settle()).await
  }

  fn interrupted<T>(&self, result: Result<T, SurfaceError>) -> Result<T, SurfaceError> {
    if matches!(result, Err(SurfaceError::Cancelled)) {
      self.record(SurfaceEvent::AnimationInterrupted);
    }
    result
  }
}

#[async_trait]
impl RenderSurface for MemorySurface {
  fn reveal_initial(&self, sections: &[&Section]) {
    self.mutate(|page| {
      page.clear_content();
      for section in sections {
        page.ensure_section(&section.id, section.class_name.as_deref());
        for element in section.elements() {
          let Some(first) = element.first_version() else {
            continue;
          };
          page.push_element(
            &section.id,
            section.class_name.as_deref(),
            element_view(element, &first.text),
          );
        }
      }
    });
    self.record(SurfaceEvent::InitialRevealed {
      section_ids: sections.iter().map(|s| s.id.clone()).collect(),
    });
  }

  fn ensure_section(&self, section: &Section) {
    self.mutate(|page| {
      page.ensure_section(&section.id, section.class_name.as_deref());
    });
    self.record(SurfaceEvent::SectionEnsured {
      section_id: section.id.clone(),
    });
  }

  fn render_element(&self, section: &Section, element: &Element, text: &str) {
    self.mutate(|page| {
      page.push_element(
        &section.id,
        section.class_name.as_deref(),
        element_view(element, text),
      )
    });
    self.record(SurfaceEvent::ElementRendered {
      element_id: element.id.clone(),
    });
  }

  async fn reveal_element(
    &self,
    section: &Section,
    element: &Element,
    text: &str,
  ) -> Result<(), SurfaceError> {
    let token = self.animation_token();
    if token.is_cancelled() {
      return Err(SurfaceError::Cancelled);
    }

    self.mutate(|page| {
      page.push_element(
        &section.id,
        section.class_name.as_deref(),
        element_view(element, ""),
      )
    });
    self.record(SurfaceEvent::RevealStarted {
      element_id: element.id.clone(),
    });
    debug!(element_id = %element.id, chars = text.chars().count(), "reveal_started");

    let result = self.type_text(&element.id, text, &token).await;
    if result.is_ok() {
      self.record(SurfaceEvent::RevealCompleted {
        element_id: element.id.clone(),
      });
    }
    self.interrupted(result)
  }

  async fn update_element(&self, element_id: &str, text: &str) -> Result<(), SurfaceError> {
    let token = self.animation_token();
    if token.is_cancelled() {
      return Err(SurfaceError::Cancelled);
    }

    if !self.mutate(|page| page.set_element_text(element_id, "")) {
      warn!(element_id = %element_id, "element not rendered, cannot update");
      return Err(SurfaceError::ElementNotFound(element_id.to_string()));
    }
    self.record(SurfaceEvent::UpdateStarted {
      element_id: element_id.to_string(),
    });

    let result = self.type_text(element_id, text, &token).await;
    if result.is_ok() {
      self.record(SurfaceEvent::UpdateCompleted {
        element_id: element_id.to_string(),
      });
    }
    self.interrupted(result)
  }

  fn remove_element(&self, element_id: &str) -> Result<(), SurfaceError> {
    if !self.mutate(|page| page.remove_element(element_id)) {
      return Err(SurfaceError::ElementNotFound(element_id.to_string()));
    }
    self.record(SurfaceEvent::ElementRemoved {
      element_id: element_id.to_string(),
    });
    Ok(())
  }

  fn remove_section(&self, section_id: &str) -> Result<(), SurfaceError> {
    if !self.mutate(|page| page.remove_section(section_id)) {
      return Err(SurfaceError::SectionNotFound(section_id.to_string()));
    }
    self.record(SurfaceEvent::SectionRemoved {
      section_id: section_id.to_string(),
    });
    Ok(())
  }

  async fn wipe_all(&self) -> Result<(), SurfaceError> {
    let token = self.animation_token();
    if token.is_cancelled() {
      return Err(SurfaceError::Cancelled);
    }

    let markup: Vec<char> = self.mutate(|page| {
      let markup = page.markup();
      page.clear_content();
      markup.chars().collect()
    });
    self.record(SurfaceEvent::WipeStarted);

    let mut remaining = markup.len();
    while remaining > 0 {
      let residue: String = markup[..remaining].iter().collect();
      self.mutate(|page| page.set_wipe_residue(Some(residue)));
      if let Err(e) = self.pause(&token, self.settings.wipe_interval()).await {
        self.mutate(|page| page.set_wipe_residue(None));
        return self.interrupted(Err(e));
      }
      remaining = remaining.saturating_sub(self.settings.wipe_chars);
    }

    self.mutate(Page::clear_content);
    self.record(SurfaceEvent::WipeCompleted);
    Ok(())
  }

  fn clear_all(&self) {
    self.mutate(Page::clear_content);
    self.record(SurfaceEvent::ContentCleared);
  }

  fn set_section_state(&self, section_id: &str, state: VisualState) -> Result<(), SurfaceError> {
    if !self.mutate(|page| page.set_section_state(section_id, state)) {
      return Err(SurfaceError::SectionNotFound(section_id.to_string()));
    }
    self.record(SurfaceEvent::SectionStateSet {
      section_id: section_id.to_string(),
      state,
    });
    Ok(())
  }

  fn append_log(&self, text: &str, category: LogCategory) {
    self.mutate(|page| page.push_log(text, category));
    self.record(SurfaceEvent::LogAppended {
      text: text.to_string(),
      category,
    });
  }

  fn clear_log(&self) {
    self.mutate(Page::clear_log);
    self.record(SurfaceEvent::LogCleared);
  }

  fn cancel_animations(&self) {
    {
      let mut token = self.animations.lock().unwrap_or_else(PoisonError::into_inner);
      token.cancel();
      *token = CancellationToken::new();
    }
    self.record(SurfaceEvent::AnimationsCancelled);
  }

  fn set_title(&self, title: &str) {
    self.mutate(|page| page.set_title(title));
    self.record(SurfaceEvent::TitleSet {
      title: title.to_string(),
    });
  }
}

fn element_view(element: &Element, text: &str) -> ElementView {
  ElementView {
    id: element.id.clone(),
    tag: element.tag,
    class_name: element.class_name.clone(),
    text: text.to_string(),
  }
}

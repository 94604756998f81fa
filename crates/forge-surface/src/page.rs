//! In-memory page model.
//!
//! A [`Page`] is what a front end draws: a title, an ordered list of section
//! wrappers holding elements, and the log panel. While a wipe is running the
//! content area is replaced by the shrinking markup residue.

use forge_config::{ElementTag, LogCategory, VisualState};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
  title: String,
  sections: Vec<SectionView>,
  log: Vec<LogLine>,
  wipe_residue: Option<String>,
}

/// A rendered section wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
  pub id: String,
  pub class_name: Option<String>,
  pub state: VisualState,
  pub elements: Vec<ElementView>,
}

/// A rendered element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementView {
  pub id: String,
  pub tag: ElementTag,
  pub class_name: Option<String>,
  pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
  pub text: String,
  pub category: LogCategory,
}

impl Page {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn set_title(&mut self, title: &str) {
    self.title = title.to_string();
  }

  pub fn sections(&self) -> &[SectionView] {
    &self.sections
  }

  pub fn section(&self, section_id: &str) -> Option<&SectionView> {
    self.sections.iter().find(|s| s.id == section_id)
  }

  pub fn element(&self, element_id: &str) -> Option<&ElementView> {
    self
      .sections
      .iter()
      .flat_map(|s| s.elements.iter())
      .find(|e| e.id == element_id)
  }

  pub fn element_text(&self, element_id: &str) -> Option<&str> {
    self.element(element_id).map(|e| e.text.as_str())
  }

  /// True when no section wrapper is rendered and no wipe is in progress.
  pub fn is_empty(&self) -> bool {
    self.sections.is_empty() && self.wipe_residue.is_none()
  }

  pub fn ensure_section(&mut self, section_id: &str, class_name: Option<&str>) -> &mut SectionView {
    let index = match self.sections.iter().position(|s| s.id == section_id) {
      Some(index) => index,
      None => {
        self.sections.push(SectionView {
          id: section_id.to_string(),
          class_name: class_name.map(str::to_string),
          state: VisualState::Default,
          elements: Vec::new(),
        });
        self.sections.len() - 1
      }
    };
    &mut self.sections[index]
  }

  /// Append an element to a section wrapper, creating the wrapper if needed.
  ///
  /// Element ids stay unique on the page: rendering an id that is already
  /// present replaces that element's text in place.
  pub fn push_element(&mut self, section_id: &str, section_class: Option<&str>, element: ElementView) {
    if let Some(existing) = self.element_mut(&element.id) {
      existing.text = element.text;
      return;
    }
    self
      .ensure_section(section_id, section_class)
      .elements
      .push(element);
  }

  pub fn set_element_text(&mut self, element_id: &str, text: &str) -> bool {
    match self.element_mut(element_id) {
      Some(element) => {
        element.text.clear();
        element.text.push_str(text);
        true
      }
      None => false,
    }
  }

  pub fn remove_element(&mut self, element_id: &str) -> bool {
    for section in &mut self.sections {
      if let Some(index) = section.elements.iter().position(|e| e.id == element_id) {
        section.elements.remove(index);
        return true;
      }
    }
    false
  }

  pub fn remove_section(&mut self, section_id: &str) -> bool {
    let before = self.sections.len();
    self.sections.retain(|s| s.id != section_id);
    self.sections.len() != before
  }

  pub fn set_section_state(&mut self, section_id: &str, state: VisualState) -> bool {
    match self.sections.iter_mut().find(|s| s.id == section_id) {
      Some(section) => {
        section.state = state;
        true
      }
      None => false,
    }
  }

  pub fn clear_content(&mut self) {
    self.sections.clear();
    self.wipe_residue = None;
  }

  pub fn wipe_residue(&self) -> Option<&str> {
    self.wipe_residue.as_deref()
  }

  pub(crate) fn set_wipe_residue(&mut self, residue: Option<String>) {
    self.wipe_residue = residue;
  }

  pub fn log(&self) -> &[LogLine] {
    &self.log
  }

  pub fn push_log(&mut self, text: &str, category: LogCategory) {
    self.log.push(LogLine {
      text: text.to_string(),
      category,
    });
  }

  pub fn clear_log(&mut self) {
    self.log.clear();
  }

  /// HTML-like serialization of the content area.
  ///
  /// The wipe effect erases this string from the end, so it is what the
  /// user sees disappear.
  pub fn markup(&self) -> String {
    let mut out = String::new();
    for section in &self.sections {
      out.push_str(&format!(
        "<div id=\"section-wrapper-{}\" class=\"{}\">",
        section.id,
        section_classes(section)
      ));
      for element in &section.elements {
        let tag = element.tag.as_str();
        match &element.class_name {
          Some(class) => out.push_str(&format!(
            "<{} id=\"{}\" class=\"{}\">",
            tag, element.id, class
          )),
          None => out.push_str(&format!("<{} id=\"{}\">", tag, element.id)),
        }
        out.push_str(&escape(&element.text));
        out.push_str(&format!("</{}>", tag));
      }
      out.push_str("</div>\n");
    }
    out
  }

  fn element_mut(&mut self, element_id: &str) -> Option<&mut ElementView> {
    self
      .sections
      .iter_mut()
      .flat_map(|s| s.elements.iter_mut())
      .find(|e| e.id == element_id)
  }
}

fn section_classes(section: &SectionView) -> String {
  let mut classes = vec!["content-section"];
  if let Some(class) = &section.class_name {
    classes.push(class);
  }
  match section.state {
    VisualState::Default => {}
    VisualState::InProgress => classes.push("state-in-progress"),
    VisualState::Error => classes.push("state-error"),
  }
  classes.join(" ")
}

fn escape(text: &str) -> String {
  text
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
}

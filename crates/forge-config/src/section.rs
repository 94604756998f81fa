use serde::{Deserialize, Serialize};

/// A top-level region of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
  pub id: String,
  #[serde(flatten)]
  pub kind: SectionKind,
  /// Shown by the `renderInitial` step as the placeholder "example site".
  /// Placeholder sections are excluded from the instant final render.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub display_initially: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub class_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SectionKind {
  /// A block of addressable elements.
  Block {
    #[serde(default)]
    elements: Vec<Element>,
  },
  /// A literal divider line.
  Separator {
    #[serde(rename = "separatorText")]
    separator_text: String,
  },
}

impl Section {
  /// Elements of a block section; empty for separators.
  pub fn elements(&self) -> &[Element] {
    match &self.kind {
      SectionKind::Block { elements } => elements,
      SectionKind::Separator { .. } => &[],
    }
  }

  pub fn element(&self, element_id: &str) -> Option<&Element> {
    self.elements().iter().find(|e| e.id == element_id)
  }

  pub fn is_separator(&self) -> bool {
    matches!(self.kind, SectionKind::Separator { .. })
  }

  /// The single element a separator renders through.
  ///
  /// Separators have no authored elements, but the render surface only deals
  /// in elements, so the divider text is wrapped in a one-version paragraph
  /// whose id is derived from the section id.
  pub fn as_element(&self) -> Option<Element> {
    match &self.kind {
      SectionKind::Separator { separator_text } => Some(Element {
        id: format!("{}-separator", self.id),
        tag: ElementTag::P,
        class_name: Some("separator".to_string()),
        versions: vec![Version::final_text("v1", separator_text.clone())],
      }),
      SectionKind::Block { .. } => None,
    }
  }
}

/// Semantic role of an element, mirroring the HTML tag it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementTag {
  H1,
  H2,
  H3,
  P,
  Li,
}

impl ElementTag {
  pub fn as_str(&self) -> &'static str {
    match self {
      ElementTag::H1 => "h1",
      ElementTag::H2 => "h2",
      ElementTag::H3 => "h3",
      ElementTag::P => "p",
      ElementTag::Li => "li",
    }
  }

  pub fn is_heading(&self) -> bool {
    matches!(self, ElementTag::H1 | ElementTag::H2 | ElementTag::H3)
  }
}

/// A named content slot with one or more candidate texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
  /// Unique across the whole plan.
  pub id: String,
  pub tag: ElementTag,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub class_name: Option<String>,
  pub versions: Vec<Version>,
}

impl Element {
  pub fn first_version(&self) -> Option<&Version> {
    self.versions.first()
  }

  /// The version flagged final, or the last one when none is flagged.
  pub fn final_version(&self) -> Option<&Version> {
    self
      .versions
      .iter()
      .find(|v| v.is_final)
      .or_else(|| self.versions.last())
  }

  pub fn version(&self, version_id: &str) -> Option<&Version> {
    self.versions.iter().find(|v| v.version_id == version_id)
  }

  /// Version chosen when a step does not pin one: enhanced mode prefers the
  /// final version, otherwise the first.
  pub fn preferred_version(&self, enhanced: bool) -> Option<&Version> {
    if enhanced {
      self.final_version()
    } else {
      self.first_version()
    }
  }
}

/// One candidate rendering of an element's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
  /// Unique within the owning element.
  pub version_id: String,
  pub text: String,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub is_final: bool,
  /// Logged after this version has been shown.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub log_message: Option<String>,
  /// Rationale for replacing the previous version, logged before an update.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub critique_of_previous: Option<String>,
}

impl Version {
  pub fn final_text(version_id: impl Into<String>, text: impl Into<String>) -> Self {
    Self {
      version_id: version_id.into(),
      text: text.into(),
      is_final: true,
      log_message: None,
      critique_of_previous: None,
    }
  }
}

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::section::{Element, Section};
use crate::settings::AnimationSettings;
use crate::step::{Step, StepAction};

/// Phrase that switches the interpreter into enhanced mode.
pub const DEFAULT_ENHANCE_COMMAND: &str = "Make awesome profile page with lots of skills";

const BUILTIN_PLAN: &str = include_str!("../plans/portfolio.json");

/// The static description of a generated page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitePlan {
  pub meta: PlanMeta,
  pub sections: Vec<Section>,
  #[serde(default)]
  pub utility_commands: Vec<UtilityCommand>,
  pub flow: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMeta {
  pub site_title: String,
  /// Logged once at the start of every animated run.
  pub initial_user_prompt: String,
  #[serde(default = "default_enhance_command")]
  pub enhance_command: String,
  #[serde(default)]
  pub animation_settings: AnimationSettings,
}

fn default_enhance_command() -> String {
  DEFAULT_ENHANCE_COMMAND.to_string()
}

/// An entry in the help listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityCommand {
  pub command: String,
  #[serde(default)]
  pub display_text: String,
  pub description: String,
}

/// A flow step whose target does not resolve against the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
  pub step_id: String,
  pub detail: String,
}

impl fmt::Display for DanglingReference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "step '{}': {}", self.step_id, self.detail)
  }
}

impl SitePlan {
  /// The plan compiled into the binary.
  pub fn builtin() -> Result<Self, PlanError> {
    Self::from_json(BUILTIN_PLAN)
  }

  /// Parse and validate a JSON plan.
  pub fn from_json(json: &str) -> Result<Self, PlanError> {
    let plan: SitePlan = serde_json::from_str(json)?;
    plan.validate()?;
    Ok(plan)
  }

  /// Read, parse and validate a JSON plan file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
      path: path.display().to_string(),
      source,
    })?;
    Self::from_json(&json)
  }

  /// Check the structural invariants the interpreter relies on.
  pub fn validate(&self) -> Result<(), PlanError> {
    self.meta.animation_settings.validate()?;

    let mut section_ids = HashSet::new();
    let mut element_ids = HashSet::new();

    for section in &self.sections {
      if !section_ids.insert(section.id.as_str()) {
        return Err(PlanError::DuplicateSection(section.id.clone()));
      }

      for element in section.elements() {
        if !element_ids.insert(element.id.as_str()) {
          return Err(PlanError::DuplicateElement(element.id.clone()));
        }
        validate_element(element)?;
      }
    }

    Ok(())
  }

  pub fn section(&self, section_id: &str) -> Option<&Section> {
    self.sections.iter().find(|s| s.id == section_id)
  }

  /// Find an element anywhere in the plan. Element ids are globally unique.
  pub fn find_element(&self, element_id: &str) -> Option<(&Section, &Element)> {
    self
      .sections
      .iter()
      .find_map(|s| s.element(element_id).map(|e| (s, e)))
  }

  /// Find an element within one section.
  pub fn find_element_in(&self, section_id: &str, element_id: &str) -> Option<(&Section, &Element)> {
    let section = self.section(section_id)?;
    section.element(element_id).map(|e| (section, e))
  }

  /// Sections shown by the `renderInitial` step.
  pub fn initial_sections(&self) -> Vec<&Section> {
    self.sections.iter().filter(|s| s.display_initially).collect()
  }

  /// List every flow step whose target cannot be resolved.
  ///
  /// These steps are no-ops at runtime; the list is for diagnostics only.
  pub fn dangling_references(&self) -> Vec<DanglingReference> {
    let mut dangling = Vec::new();

    for step in &self.flow {
      let mut report = |detail: String| {
        dangling.push(DanglingReference {
          step_id: step.id.clone(),
          detail,
        })
      };

      let section_id = step.target_section_id.as_deref();
      let element_id = step.target_element_id.as_deref();
      let version_id = step.target_version_id.as_deref();

      match step.action {
        StepAction::RenderSection | StepAction::SetSectionVisualState => match section_id {
          Some(id) if self.section(id).is_none() => report(format!("unknown section '{}'", id)),
          Some(_) => {}
          None => report("missing targetSectionId".to_string()),
        },
        StepAction::RenderElement => {
          let (Some(section_id), Some(element_id)) = (section_id, element_id) else {
            report("missing targetSectionId or targetElementId".to_string());
            continue;
          };
          match self.find_element_in(section_id, element_id) {
            Some((_, element)) => {
              if let Some(v) = version_id.filter(|v| element.version(v).is_none()) {
                report(format!("unknown version '{}' of element '{}'", v, element_id));
              }
            }
            None => report(format!(
              "unknown element '{}' in section '{}'",
              element_id, section_id
            )),
          }
        }
        StepAction::UpdateElement => {
          let Some(element_id) = element_id else {
            report("missing targetElementId".to_string());
            continue;
          };
          match self.find_element(element_id) {
            Some((_, element)) => {
              if let Some(v) = version_id.filter(|v| element.version(v).is_none()) {
                report(format!("unknown version '{}' of element '{}'", v, element_id));
              }
            }
            None => report(format!("unknown element '{}'", element_id)),
          }
        }
        StepAction::RemoveElement => match (element_id, section_id) {
          (Some(id), _) if self.find_element(id).is_none() => {
            report(format!("unknown element '{}'", id))
          }
          (Some(_), _) => {}
          (None, Some(id)) if self.section(id).is_none() => {
            report(format!("unknown section '{}'", id))
          }
          (None, Some(_)) => {}
          (None, None) => report("missing targetElementId and targetSectionId".to_string()),
        },
        _ => {}
      }
    }

    dangling
  }
}

fn validate_element(element: &Element) -> Result<(), PlanError> {
  if element.versions.is_empty() {
    return Err(PlanError::NoVersions {
      element_id: element.id.clone(),
    });
  }

  let finals = element.versions.iter().filter(|v| v.is_final).count();
  if finals > 1 {
    return Err(PlanError::MultipleFinal {
      element_id: element.id.clone(),
      count: finals,
    });
  }

  let mut version_ids = HashSet::new();
  for version in &element.versions {
    if !version_ids.insert(version.version_id.as_str()) {
      return Err(PlanError::DuplicateVersion {
        element_id: element.id.clone(),
        version_id: version.version_id.clone(),
      });
    }
  }

  Ok(())
}

use serde::{Deserialize, Serialize};

/// One instruction in the flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
  pub id: String,
  pub action: StepAction,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub log_message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub log_type: Option<LogCategory>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delay_ms: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_section_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_element_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_version_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_state: Option<VisualState>,
}

impl Step {
  /// A bare step with only an id and an action.
  pub fn new(id: impl Into<String>, action: StepAction) -> Self {
    Self {
      id: id.into(),
      action,
      log_message: None,
      log_type: None,
      delay_ms: None,
      target_section_id: None,
      target_element_id: None,
      target_version_id: None,
      target_state: None,
    }
  }

  pub fn with_log(mut self, message: impl Into<String>, category: LogCategory) -> Self {
    self.log_message = Some(message.into());
    self.log_type = Some(category);
    self
  }

  pub fn with_delay(mut self, delay_ms: u64) -> Self {
    self.delay_ms = Some(delay_ms);
    self
  }

  pub fn targeting(mut self, section_id: Option<&str>, element_id: Option<&str>) -> Self {
    self.target_section_id = section_id.map(str::to_string);
    self.target_element_id = element_id.map(str::to_string);
    self
  }

  pub fn with_version(mut self, version_id: impl Into<String>) -> Self {
    self.target_version_id = Some(version_id.into());
    self
  }

  pub fn with_state(mut self, state: VisualState) -> Self {
    self.target_state = Some(state);
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepAction {
  Log,
  Delay,
  RenderInitial,
  ClearContentArea,
  RenderSection,
  RenderElement,
  UpdateElement,
  RemoveElement,
  Thought,
  SetSectionVisualState,
  /// Any action this version does not know; executed as a plain delay.
  #[serde(other)]
  Unknown,
}

impl StepAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      StepAction::Log => "log",
      StepAction::Delay => "delay",
      StepAction::RenderInitial => "renderInitial",
      StepAction::ClearContentArea => "clearContentArea",
      StepAction::RenderSection => "renderSection",
      StepAction::RenderElement => "renderElement",
      StepAction::UpdateElement => "updateElement",
      StepAction::RemoveElement => "removeElement",
      StepAction::Thought => "thought",
      StepAction::SetSectionVisualState => "setSectionVisualState",
      StepAction::Unknown => "unknown",
    }
  }
}

/// Styling class of a log panel entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogCategory {
  /// The user's request. Emitted once when a run starts, never per step.
  User,
  System,
  Checking,
  AiThought,
  Decision,
  Critique,
  Warning,
  Error,
  #[serde(other)]
  Info,
}

impl LogCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      LogCategory::User => "user",
      LogCategory::System => "system",
      LogCategory::Checking => "checking",
      LogCategory::AiThought => "ai-thought",
      LogCategory::Decision => "decision",
      LogCategory::Critique => "critique",
      LogCategory::Warning => "warning",
      LogCategory::Error => "error",
      LogCategory::Info => "info",
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualState {
  #[default]
  Default,
  InProgress,
  Error,
}

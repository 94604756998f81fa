use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
  #[error("failed to read plan file {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse plan: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("element '{element_id}' has no versions")]
  NoVersions { element_id: String },

  #[error("element '{element_id}' marks {count} versions as final (at most one allowed)")]
  MultipleFinal { element_id: String, count: usize },

  #[error("duplicate element id: {0}")]
  DuplicateElement(String),

  #[error("duplicate section id: {0}")]
  DuplicateSection(String),

  #[error("element '{element_id}' has duplicate version id '{version_id}'")]
  DuplicateVersion {
    element_id: String,
    version_id: String,
  },

  #[error("animation setting '{0}' must be positive")]
  InvalidSetting(&'static str),
}

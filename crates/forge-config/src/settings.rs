use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Timing knobs shared by the interpreter and the render surface.
///
/// Every value is in milliseconds except `wipe_chars`, which is the number
/// of characters the wipe effect removes per tick. Fields missing from a
/// plan file take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationSettings {
  /// Delay between typed characters.
  pub typing_speed: u64,
  /// Pause after a line finishes typing, before the reveal completes.
  pub line_delay: u64,
  /// Default delay between steps.
  pub command_delay: u64,
  /// Delay between wipe chunks.
  pub wipe_speed: u64,
  pub wipe_chars: usize,
  /// Reading pause after a critique note, before the update retypes.
  pub critique_delay: u64,
  /// Pause after the wipe empties the content area.
  pub wipe_settle_delay: u64,
}

impl Default for AnimationSettings {
  fn default() -> Self {
    Self {
      typing_speed: 10,
      line_delay: 100,
      command_delay: 800,
      wipe_speed: 10,
      wipe_chars: 5,
      critique_delay: 1000,
      wipe_settle_delay: 500,
    }
  }
}

impl AnimationSettings {
  pub fn typing_interval(&self) -> Duration {
    Duration::from_millis(self.typing_speed)
  }

  pub fn line_settle(&self) -> Duration {
    Duration::from_millis(self.line_delay)
  }

  pub fn step_delay(&self) -> Duration {
    Duration::from_millis(self.command_delay)
  }

  pub fn wipe_interval(&self) -> Duration {
    Duration::from_millis(self.wipe_speed)
  }

  pub fn critique_pause(&self) -> Duration {
    Duration::from_millis(self.critique_delay)
  }

  pub fn wipe_settle(&self) -> Duration {
    Duration::from_millis(self.wipe_settle_delay)
  }

  pub(crate) fn validate(&self) -> Result<(), PlanError> {
    let checks: [(&'static str, u64); 7] = [
      ("typingSpeed", self.typing_speed),
      ("lineDelay", self.line_delay),
      ("commandDelay", self.command_delay),
      ("wipeSpeed", self.wipe_speed),
      ("wipeChars", self.wipe_chars as u64),
      ("critiqueDelay", self.critique_delay),
      ("wipeSettleDelay", self.wipe_settle_delay),
    ];
    match checks.iter().find(|(_, value)| *value == 0) {
      Some((name, _)) => Err(PlanError::InvalidSetting(*name)),
      None => Ok(()),
    }
  }
}

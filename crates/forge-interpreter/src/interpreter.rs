//! The flow interpreter.
//!
//! [`FlowInterpreter`] owns a site plan and a cursor into its flow. An
//! animated run is a single tokio task that executes one step per tick,
//! awaiting typing and wipe animations, and sleeping the step's delay before
//! the next. That task (its cancellation token plus join handle) is the one
//! pending continuation: starting a run or resetting cancels and replaces it.
//! The task checks its token before every page write, so a run cancelled in
//! the middle of a step never touches the page again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use forge_config::{Element, LogCategory, Section, SectionKind, SitePlan, Step, StepAction};
use forge_surface::{RenderSurface, SurfaceError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::command::Command;
use crate::events::{FlowEvent, FlowNotifier, NoopNotifier};

/// How [`FlowInterpreter::initialize`] starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
  /// Walk the flow with typing animations.
  Animated,
  /// Render the final page immediately, without running the flow.
  Instant,
}

/// Observable run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
  /// Index of the next step to execute.
  pub cursor: usize,
  pub total: usize,
  pub running: bool,
  pub enhanced: bool,
}

impl RunStatus {
  /// Completion percentage shown in the title, rounded half up.
  pub fn progress_percent(&self) -> usize {
    progress_percent(self.cursor, self.total)
  }
}

/// Interprets a [`SitePlan`] flow against a [`RenderSurface`].
///
/// Cloning is cheap and every clone drives the same run. Methods that start
/// a run spawn onto the current tokio runtime.
pub struct FlowInterpreter<S: RenderSurface + 'static> {
  inner: Arc<Inner<S>>,
}

impl<S: RenderSurface + 'static> Clone for FlowInterpreter<S> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

struct Inner<S> {
  plan: Arc<SitePlan>,
  surface: Arc<S>,
  notifier: Arc<dyn FlowNotifier>,
  state: Mutex<RunState>,
  status: watch::Sender<RunStatus>,
}

#[derive(Default)]
struct RunState {
  cursor: usize,
  running: bool,
  enhanced: bool,
  pending: Option<Continuation>,
}

/// The single outstanding run task.
struct Continuation {
  run_id: String,
  cancel: CancellationToken,
  handle: JoinHandle<()>,
}

#[derive(Clone)]
struct RunContext {
  run_id: String,
  cancel: CancellationToken,
}

impl<S: RenderSurface + 'static> FlowInterpreter<S> {
  pub fn new(plan: Arc<SitePlan>, surface: Arc<S>) -> Self {
    Self::with_notifier(plan, surface, Arc::new(NoopNotifier))
  }

  pub fn with_notifier(
    plan: Arc<SitePlan>,
    surface: Arc<S>,
    notifier: Arc<dyn FlowNotifier>,
  ) -> Self {
    let (status, _) = watch::channel(RunStatus {
      cursor: 0,
      total: plan.flow.len(),
      running: false,
      enhanced: false,
    });

    Self {
      inner: Arc::new(Inner {
        plan,
        surface,
        notifier,
        state: Mutex::new(RunState::default()),
        status,
      }),
    }
  }

  pub fn plan(&self) -> &SitePlan {
    &self.inner.plan
  }

  pub fn surface(&self) -> &Arc<S> {
    &self.inner.surface
  }

  pub fn status(&self) -> RunStatus {
    *self.inner.status.borrow()
  }

  /// Receiver updated on every cursor, running or mode change.
  pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
    self.inner.status.subscribe()
  }

  /// Whether a run task is scheduled or executing.
  pub fn has_pending_continuation(&self) -> bool {
    self.inner.lock_state().pending.is_some()
  }

  /// Resolve once no run is in progress.
  pub async fn wait_until_idle(&self) {
    let mut status = self.subscribe();
    let _ = status.wait_for(|s| !s.running).await;
  }

  /// Start the page in the requested mode.
  pub fn initialize(&self, mode: StartMode) {
    info!(mode = ?mode, site = %self.inner.plan.meta.site_title, "initializing");
    match mode {
      StartMode::Instant => self.render_final(),
      StartMode::Animated => self.start_sequence(Vec::new()),
    }
  }

  /// Set or clear enhanced mode without restarting.
  pub fn set_enhanced(&self, enhanced: bool) {
    let mut state = self.inner.lock_state();
    state.enhanced = enhanced;
    self.inner.publish(&state);
  }

  /// Handle one line from the command input. Returns whether it was recognized.
  pub fn handle_command(&self, input: &str) -> bool {
    let surface = &self.inner.surface;
    let plan = &self.inner.plan;

    let Some(command) = Command::parse(input, &plan.meta.enhance_command) else {
      let trimmed = input.trim();
      warn!(command = %trimmed, "unknown command");
      surface.append_log(
        &format!("[ERROR] Unknown command: \"{}\"", trimmed),
        LogCategory::Error,
      );
      surface.append_log(
        "[HELP] Type 'help' for available commands",
        LogCategory::System,
      );
      return false;
    };

    info!(command = ?command, "command received");
    match command {
      Command::Enhance => {
        self.set_enhanced(true);
        self.start_sequence(vec![
          (
            format!("[REQUEST] {}", plan.meta.enhance_command),
            LogCategory::System,
          ),
          (
            "[PROCESSING] Enhancing skill set".to_string(),
            LogCategory::Checking,
          ),
        ]);
      }
      Command::Help => self.show_help(),
      Command::Clear => surface.clear_log(),
      Command::Reset | Command::Auto => {
        self.set_enhanced(false);
        self.start_sequence(Vec::new());
      }
      Command::Skip => {
        self.render_final();
        surface.append_log("[SKIP] Final content rendered", LogCategory::System);
      }
    }
    true
  }

  /// Cancel any run and clear the page: cursor 0, not running, nothing pending.
  pub fn stop(&self) {
    self.reset_state(false);
  }

  fn reset_state(&self, silent: bool) {
    let cancelled = {
      let mut state = self.inner.lock_state();
      state.running = false;
      state.cursor = 0;
      let pending = state.pending.take();
      if let Some(pending) = &pending {
        pending.cancel.cancel();
        pending.handle.abort();
      }
      self.inner.publish(&state);
      pending.map(|p| p.run_id)
    };

    if let Some(run_id) = cancelled {
      debug!(run_id = %run_id, "run cancelled by reset");
      self.inner.notifier.notify(FlowEvent::RunCancelled { run_id });
    }

    let surface = &self.inner.surface;
    surface.cancel_animations();
    surface.clear_all();
    if !silent {
      surface.clear_log();
    }
  }

  fn start_sequence(&self, preamble: Vec<(String, LogCategory)>) {
    self.reset_state(false);

    let plan = &self.inner.plan;
    self
      .inner
      .surface
      .set_title(&progress_title(&plan.meta.site_title, 0));

    let run = RunContext {
      run_id: uuid::Uuid::new_v4().to_string(),
      cancel: CancellationToken::new(),
    };

    info!(run_id = %run.run_id, total_steps = plan.flow.len(), "run_started");
    self.inner.notifier.notify(FlowEvent::RunStarted {
      run_id: run.run_id.clone(),
      total_steps: plan.flow.len(),
    });

    // Hold the lock across the spawn so the task never observes a state
    // without its own continuation recorded.
    let mut state = self.inner.lock_state();
    state.running = true;
    state.cursor = 0;
    let handle = tokio::spawn(run_flow(self.inner.clone(), run.clone(), preamble));
    state.pending = Some(Continuation {
      run_id: run.run_id,
      cancel: run.cancel,
      handle,
    });
    self.inner.publish(&state);
  }

  /// Render every non-placeholder section at its final version, immediately.
  fn render_final(&self) {
    self.reset_state(true);

    let plan = &self.inner.plan;
    let surface = &self.inner.surface;

    for section in plan.sections.iter().filter(|s| !s.display_initially) {
      surface.ensure_section(section);
      match &section.kind {
        SectionKind::Block { elements } => {
          for element in elements {
            if let Some(version) = element.final_version() {
              surface.render_element(section, element, &version.text);
            }
          }
        }
        SectionKind::Separator { separator_text } => {
          if let Some(element) = section.as_element() {
            surface.render_element(section, &element, separator_text);
          }
        }
      }
    }

    surface.set_title(&plan.meta.site_title);
    info!(sections = plan.sections.len(), "final_rendered");
    self.inner.notifier.notify(FlowEvent::FinalRendered);
  }

  fn show_help(&self) {
    let surface = &self.inner.surface;
    let plan = &self.inner.plan;

    surface.append_log("[HELP] Available commands:", LogCategory::System);
    for command in &plan.utility_commands {
      surface.append_log(
        &format!("  {}: {}", command.command, command.description),
        LogCategory::Info,
      );
    }
    surface.append_log(
      &format!(
        "  {}: Enhance the profile and regenerate it",
        plan.meta.enhance_command
      ),
      LogCategory::Info,
    );
  }
}

/// Body of an animated run.
#[instrument(name = "flow_run", skip_all, fields(run_id = %run.run_id))]
async fn run_flow<S: RenderSurface + 'static>(
  inner: Arc<Inner<S>>,
  run: RunContext,
  preamble: Vec<(String, LogCategory)>,
) {
  for (text, category) in &preamble {
    inner.log(&run, text, *category);
  }
  inner.log(&run, &inner.plan.meta.initial_user_prompt, LogCategory::User);

  while let Some(index) = inner.advance(&run) {
    let step = &inner.plan.flow[index];
    let delay = inner.execute_step(step, &run).await;

    tokio::select! {
      biased;
      _ = run.cancel.cancelled() => return,
      _ = tokio::time::sleep(delay) => {}
    }
  }
}

impl<S: RenderSurface + 'static> Inner<S> {
  fn lock_state(&self) -> MutexGuard<'_, RunState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn publish(&self, state: &RunState) {
    self.status.send_replace(RunStatus {
      cursor: state.cursor,
      total: self.plan.flow.len(),
      running: state.running,
      enhanced: state.enhanced,
    });
  }

  /// Append to the log unless the run has been cancelled.
  fn log(&self, run: &RunContext, text: &str, category: LogCategory) {
    if !run.cancel.is_cancelled() {
      self.surface.append_log(text, category);
    }
  }

  fn is_enhanced(&self) -> bool {
    self.lock_state().enhanced
  }

  /// Claim the step at the cursor, or finish the run.
  fn advance(&self, run: &RunContext) -> Option<usize> {
    let total = self.plan.flow.len();
    let index = {
      let mut state = self.lock_state();
      if run.cancel.is_cancelled() {
        return None;
      }

      if !state.running || state.cursor >= total {
        state.running = false;
        if state
          .pending
          .as_ref()
          .is_some_and(|p| p.run_id == run.run_id)
        {
          state.pending = None;
        }
        self.publish(&state);
        drop(state);

        info!(run_id = %run.run_id, "run_completed");
        self.notifier.notify(FlowEvent::RunCompleted {
          run_id: run.run_id.clone(),
        });
        return None;
      }

      let index = state.cursor;
      state.cursor += 1;
      self.publish(&state);
      index
    };

    let step = &self.plan.flow[index];
    if run.cancel.is_cancelled() {
      return None;
    }
    self.surface.set_title(&progress_title(
      &self.plan.meta.site_title,
      progress_percent(index + 1, total),
    ));
    // A reset may land while the title is being drawn.
    if run.cancel.is_cancelled() {
      return None;
    }

    debug!(run_id = %run.run_id, index, step_id = %step.id, action = step.action.as_str(), "step_started");
    self.notifier.notify(FlowEvent::StepStarted {
      run_id: run.run_id.clone(),
      index,
      step_id: step.id.clone(),
      action: step.action,
    });

    Some(index)
  }

  /// Execute one step and return the delay before the next.
  async fn execute_step(&self, step: &Step, run: &RunContext) -> Duration {
    let settings = &self.plan.meta.animation_settings;
    let step_delay = settings.step_delay();
    let explicit_delay = step.delay_ms.map(Duration::from_millis);

    if let Some(message) = &step.log_message {
      let category = step.log_type.unwrap_or(match step.action {
        StepAction::Thought => LogCategory::AiThought,
        _ => LogCategory::Info,
      });
      // The user prompt is logged once per run, not per step.
      if category != LogCategory::User {
        self.log(run, message, category);
      }
    }

    match step.action {
      StepAction::Log | StepAction::Unknown => step_delay,
      StepAction::Delay | StepAction::Thought => explicit_delay.unwrap_or(step_delay),
      StepAction::RenderInitial => {
        if !run.cancel.is_cancelled() {
          self.surface.reveal_initial(&self.plan.initial_sections());
        }
        step_delay
      }
      StepAction::ClearContentArea => {
        let result = self.surface.wipe_all().await;
        self.check_surface(result, step, run);
        settings.wipe_settle()
      }
      StepAction::RenderSection => {
        self.render_section(step, run).await;
        Duration::ZERO
      }
      StepAction::RenderElement => {
        self.render_element(step, run).await;
        Duration::ZERO
      }
      StepAction::UpdateElement => {
        self.update_element(step, run).await;
        step_delay
      }
      StepAction::RemoveElement => {
        self.remove(step, run);
        step_delay
      }
      StepAction::SetSectionVisualState => {
        self.set_section_state(step, run);
        explicit_delay.unwrap_or(step_delay / 2)
      }
    }
  }

  async fn render_section(&self, step: &Step, run: &RunContext) {
    let Some(section_id) = step.target_section_id.as_deref() else {
      self.unresolved(step, run, "missing targetSectionId".to_string());
      return;
    };
    let Some(section) = self.plan.section(section_id) else {
      self.unresolved(step, run, format!("unknown section '{}'", section_id));
      return;
    };

    match &section.kind {
      SectionKind::Block { elements } => {
        let enhanced = self.is_enhanced();
        for element in elements {
          let Some(version) = element.preferred_version(enhanced) else {
            continue;
          };
          if !self.reveal(section, element, &version.text, step, run).await {
            return;
          }
        }
      }
      SectionKind::Separator { separator_text } => {
        if let Some(element) = section.as_element() {
          self.reveal(section, &element, separator_text, step, run).await;
        }
      }
    }
  }

  async fn render_element(&self, step: &Step, run: &RunContext) {
    let (Some(section_id), Some(element_id)) = (
      step.target_section_id.as_deref(),
      step.target_element_id.as_deref(),
    ) else {
      self.unresolved(
        step,
        run,
        "missing targetSectionId or targetElementId".to_string(),
      );
      return;
    };
    let Some((section, element)) = self.plan.find_element_in(section_id, element_id) else {
      self.unresolved(
        step,
        run,
        format!("unknown element '{}' in section '{}'", element_id, section_id),
      );
      return;
    };

    let version = match step.target_version_id.as_deref() {
      Some(version_id) => match element.version(version_id) {
        Some(version) => version,
        None => {
          self.unresolved(
            step,
            run,
            format!("unknown version '{}' of element '{}'", version_id, element_id),
          );
          return;
        }
      },
      None => match element.preferred_version(self.is_enhanced()) {
        Some(version) => version,
        None => return,
      },
    };

    if self.reveal(section, element, &version.text, step, run).await {
      if let Some(message) = &version.log_message {
        self.log(run, message, LogCategory::System);
      }
    }
  }

  async fn update_element(&self, step: &Step, run: &RunContext) {
    let Some(element_id) = step.target_element_id.as_deref() else {
      self.unresolved(step, run, "missing targetElementId".to_string());
      return;
    };
    let Some((_, element)) = self.plan.find_element(element_id) else {
      self.unresolved(step, run, format!("unknown element '{}'", element_id));
      return;
    };

    let version = match step.target_version_id.as_deref() {
      Some(version_id) => match element.version(version_id) {
        Some(version) => version,
        None => {
          self.unresolved(
            step,
            run,
            format!("unknown version '{}' of element '{}'", version_id, element_id),
          );
          return;
        }
      },
      None => match element.final_version() {
        Some(version) => version,
        None => return,
      },
    };

    if let Some(critique) = &version.critique_of_previous {
      self.log(run, &format!("[CRITIQUE] {}", critique), LogCategory::Critique);
      tokio::select! {
        biased;
        _ = run.cancel.cancelled() => return,
        _ = tokio::time::sleep(self.plan.meta.animation_settings.critique_pause()) => {}
      }
    }

    if run.cancel.is_cancelled() {
      return;
    }
    let result = self.surface.update_element(element_id, &version.text).await;
    if !self.check_surface(result, step, run) {
      return;
    }

    if let Some(message) = &version.log_message {
      if step.log_message.as_deref() != Some(message.as_str()) {
        self.log(run, message, LogCategory::System);
      }
    }
  }

  fn remove(&self, step: &Step, run: &RunContext) {
    if run.cancel.is_cancelled() {
      return;
    }
    let result = match (
      step.target_element_id.as_deref(),
      step.target_section_id.as_deref(),
    ) {
      (Some(element_id), _) => {
        if self.plan.find_element(element_id).is_none() {
          self.unresolved(step, run, format!("unknown element '{}'", element_id));
          return;
        }
        self.surface.remove_element(element_id)
      }
      (None, Some(section_id)) => {
        if self.plan.section(section_id).is_none() {
          self.unresolved(step, run, format!("unknown section '{}'", section_id));
          return;
        }
        self.surface.remove_section(section_id)
      }
      (None, None) => {
        self.unresolved(
          step,
          run,
          "missing targetElementId and targetSectionId".to_string(),
        );
        return;
      }
    };
    self.check_surface(result, step, run);
  }

  fn set_section_state(&self, step: &Step, run: &RunContext) {
    let Some(section_id) = step.target_section_id.as_deref() else {
      self.unresolved(step, run, "missing targetSectionId".to_string());
      return;
    };
    if self.plan.section(section_id).is_none() {
      self.unresolved(step, run, format!("unknown section '{}'", section_id));
      return;
    }

    if run.cancel.is_cancelled() {
      return;
    }
    let state = step.target_state.unwrap_or_default();
    let result = self.surface.set_section_state(section_id, state);
    self.check_surface(result, step, run);
  }

  /// Type one element; returns false when the run should stop here.
  async fn reveal(
    &self,
    section: &Section,
    element: &Element,
    text: &str,
    step: &Step,
    run: &RunContext,
  ) -> bool {
    if run.cancel.is_cancelled() {
      return false;
    }
    let result = self.surface.reveal_element(section, element, text).await;
    self.check_surface(result, step, run)
  }

  /// Report a failed primitive. Cancellation is silent: the reset that
  /// caused it already owns the page.
  fn check_surface(&self, result: Result<(), SurfaceError>, step: &Step, run: &RunContext) -> bool {
    match result {
      Ok(()) => true,
      Err(SurfaceError::Cancelled) => false,
      Err(e) => {
        self.unresolved(step, run, e.to_string());
        false
      }
    }
  }

  fn unresolved(&self, step: &Step, run: &RunContext, detail: String) {
    warn!(
      run_id = %run.run_id,
      step_id = %step.id,
      action = step.action.as_str(),
      detail = %detail,
      "unresolved reference, skipping step"
    );
    self.notifier.notify(FlowEvent::UnresolvedReference {
      run_id: run.run_id.clone(),
      step_id: step.id.clone(),
      detail,
    });
  }
}

fn progress_percent(cursor: usize, total: usize) -> usize {
  if total == 0 {
    return 100;
  }
  (cursor * 100 + total / 2) / total
}

fn progress_title(site_title: &str, percent: usize) -> String {
  format!("{} ({}%)", site_title, percent)
}

//! Integration tests for FlowInterpreter driving a MemorySurface.
//!
//! Every test runs on a paused tokio clock, so typing and step delays
//! complete instantly and deterministically.

use std::sync::Arc;
use std::time::Duration;

use forge_config::{
  AnimationSettings, DEFAULT_ENHANCE_COMMAND, Element, ElementTag, LogCategory, PlanMeta, Section,
  SectionKind, SitePlan, Step, StepAction, UtilityCommand, Version, VisualState,
};
use forge_interpreter::{ChannelNotifier, FlowEvent, FlowInterpreter, RecordingNotifier, StartMode};
use forge_surface::{MemorySurface, Page, SurfaceEvent};
use tokio::sync::mpsc;

const SITE_TITLE: &str = "Test Site";

fn version(id: &str, text: &str) -> Version {
  Version {
    version_id: id.to_string(),
    text: text.to_string(),
    is_final: false,
    log_message: None,
    critique_of_previous: None,
  }
}

fn final_version(id: &str, text: &str) -> Version {
  Version::final_text(id, text)
}

fn element(id: &str, versions: Vec<Version>) -> Element {
  Element {
    id: id.to_string(),
    tag: ElementTag::P,
    class_name: None,
    versions,
  }
}

fn block(id: &str, elements: Vec<Element>) -> Section {
  Section {
    id: id.to_string(),
    kind: SectionKind::Block { elements },
    display_initially: false,
    class_name: None,
  }
}

fn placeholder(id: &str, elements: Vec<Element>) -> Section {
  Section {
    display_initially: true,
    ..block(id, elements)
  }
}

fn separator(id: &str, text: &str) -> Section {
  Section {
    id: id.to_string(),
    kind: SectionKind::Separator {
      separator_text: text.to_string(),
    },
    display_initially: false,
    class_name: None,
  }
}

fn log_step(id: &str, message: &str) -> Step {
  Step::new(id, StepAction::Log).with_log(message, LogCategory::System)
}

fn create_plan(sections: Vec<Section>, flow: Vec<Step>) -> Arc<SitePlan> {
  Arc::new(SitePlan {
    meta: PlanMeta {
      site_title: SITE_TITLE.to_string(),
      initial_user_prompt: "[USER] build a page".to_string(),
      enhance_command: DEFAULT_ENHANCE_COMMAND.to_string(),
      animation_settings: AnimationSettings::default(),
    },
    sections,
    utility_commands: vec![
      UtilityCommand {
        command: "help".to_string(),
        display_text: "Show available commands".to_string(),
        description: "Displays a list of all available commands".to_string(),
      },
      UtilityCommand {
        command: "skip".to_string(),
        display_text: "Skip to final content".to_string(),
        description: "Instantly displays the final website content.".to_string(),
      },
    ],
    flow,
  })
}

fn create_interpreter(
  plan: Arc<SitePlan>,
) -> (
  FlowInterpreter<MemorySurface>,
  Arc<MemorySurface>,
  Arc<RecordingNotifier>,
) {
  let surface = Arc::new(MemorySurface::with_journal(plan.meta.animation_settings.clone()));
  let notifier = Arc::new(RecordingNotifier::new());
  let interpreter = FlowInterpreter::with_notifier(plan, surface.clone(), notifier.clone());
  (interpreter, surface, notifier)
}

fn log_texts(surface: &MemorySurface) -> Vec<String> {
  surface
    .snapshot()
    .log()
    .iter()
    .map(|line| line.text.clone())
    .collect()
}

fn started_indices(events: &[FlowEvent]) -> Vec<usize> {
  events
    .iter()
    .filter_map(|e| match e {
      FlowEvent::StepStarted { index, .. } => Some(*index),
      _ => None,
    })
    .collect()
}

/// Header section with one title element: v1 "Developer", v2 (final) "Full-Stack Developer".
fn title_plan(flow: Vec<Step>) -> Arc<SitePlan> {
  create_plan(
    vec![block(
      "header",
      vec![element(
        "title",
        vec![
          version("v1", "Developer"),
          final_version("v2", "Full-Stack Developer"),
        ],
      )],
    )],
    flow,
  )
}

#[tokio::test(start_paused = true)]
async fn test_render_then_update_reaches_final_text() {
  let plan = title_plan(vec![
    Step::new("render", StepAction::RenderElement)
      .targeting(Some("header"), Some("title"))
      .with_version("v1"),
    Step::new("update", StepAction::UpdateElement)
      .targeting(Some("header"), Some("title"))
      .with_version("v2")
      .with_log("[REVISING] Refining title...", LogCategory::Checking),
  ]);
  let (interpreter, surface, _) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  interpreter.wait_until_idle().await;

  let page = surface.snapshot();
  assert_eq!(page.element_text("title"), Some("Full-Stack Developer"));
  assert!(log_texts(&surface).contains(&"[REVISING] Refining title...".to_string()));
  assert_eq!(page.title(), "Test Site (100%)");

  let status = interpreter.status();
  assert_eq!(status.cursor, 2);
  assert!(!status.running);
  assert!(!interpreter.has_pending_continuation());
}

#[tokio::test(start_paused = true)]
async fn test_cursor_advances_once_per_step() {
  let flow = (0..6)
    .map(|i| log_step(&format!("log-{}", i), &format!("[STEP {}]", i)))
    .collect();
  let (interpreter, surface, notifier) = create_interpreter(create_plan(vec![], flow));

  let mut status = interpreter.subscribe();
  interpreter.initialize(StartMode::Animated);

  let mut seen = vec![status.borrow().cursor];
  while status.changed().await.is_ok() {
    let current = *status.borrow();
    seen.push(current.cursor);
    if !current.running {
      break;
    }
  }

  // Monotonic, never jumping by more than one.
  assert!(seen.windows(2).all(|w| w[1] == w[0] || w[1] == w[0] + 1));
  assert_eq!(started_indices(&notifier.events()), vec![0, 1, 2, 3, 4, 5]);

  let completions = notifier
    .events()
    .iter()
    .filter(|e| matches!(e, FlowEvent::RunCompleted { .. }))
    .count();
  assert_eq!(completions, 1);

  // The user prompt leads the log, then each step's message in order.
  let logs = log_texts(&surface);
  assert_eq!(logs[0], "[USER] build a page");
  assert_eq!(logs[1..], ["[STEP 0]", "[STEP 1]", "[STEP 2]", "[STEP 3]", "[STEP 4]", "[STEP 5]"]);
}

#[tokio::test(start_paused = true)]
async fn test_render_section_reveals_elements_sequentially() {
  let plan = create_plan(
    vec![block(
      "about",
      vec![
        element("a", vec![version("v1", "first line")]),
        element("b", vec![version("v1", "second line")]),
        element("c", vec![version("v1", "third line")]),
      ],
    )],
    vec![
      Step::new("section", StepAction::RenderSection).targeting(Some("about"), None),
      log_step("after", "[AFTER]"),
    ],
  );
  let (interpreter, surface, _) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  interpreter.wait_until_idle().await;

  let ordering: Vec<String> = surface
    .events()
    .into_iter()
    .filter_map(|e| match e {
      SurfaceEvent::RevealStarted { element_id } => Some(format!("start:{}", element_id)),
      SurfaceEvent::RevealCompleted { element_id } => Some(format!("done:{}", element_id)),
      SurfaceEvent::LogAppended { text, .. } if text == "[AFTER]" => Some("after".to_string()),
      _ => None,
    })
    .collect();

  assert_eq!(
    ordering,
    vec!["start:a", "done:a", "start:b", "done:b", "start:c", "done:c", "after"]
  );

  let page = surface.snapshot();
  let section = page.section("about").expect("section should be rendered");
  let ids: Vec<&str> = section.elements.iter().map(|e| e.id.as_str()).collect();
  assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_render_section_renders_separator_text() {
  let plan = create_plan(
    vec![separator("sep1", "--------")],
    vec![Step::new("sep", StepAction::RenderSection).targeting(Some("sep1"), None)],
  );
  let (interpreter, surface, _) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  interpreter.wait_until_idle().await;

  assert_eq!(
    surface.snapshot().element_text("sep1-separator"),
    Some("--------")
  );
}

#[tokio::test(start_paused = true)]
async fn test_instant_render_uses_final_or_last_version() {
  let plan = create_plan(
    vec![
      placeholder("example", vec![element("hello", vec![version("v1", "HELLO WORLD")])]),
      block(
        "body",
        vec![
          element(
            "flagged",
            vec![
              version("v1", "one"),
              final_version("v2", "two"),
              version("v3", "three"),
            ],
          ),
          element("unflagged", vec![version("v1", "alpha"), version("v2", "omega")]),
        ],
      ),
      separator("sep", "----"),
      block("empty", vec![]),
    ],
    vec![log_step("never", "[SHOULD NOT RUN]")],
  );
  let (interpreter, surface, notifier) = create_interpreter(plan);

  interpreter.initialize(StartMode::Instant);

  let page = surface.snapshot();
  assert!(page.section("example").is_none());
  assert_eq!(page.element_text("flagged"), Some("two"));
  assert_eq!(page.element_text("unflagged"), Some("omega"));
  assert_eq!(page.element_text("sep-separator"), Some("----"));
  assert!(page.section("empty").is_some());
  assert_eq!(page.title(), SITE_TITLE);

  let ids: Vec<&str> = page.sections().iter().map(|s| s.id.as_str()).collect();
  assert_eq!(ids, vec!["body", "sep", "empty"]);

  assert!(!surface
    .events()
    .iter()
    .any(|e| matches!(e, SurfaceEvent::RevealStarted { .. })));

  let status = interpreter.status();
  assert!(!status.running);
  assert_eq!(status.cursor, 0);
  assert!(!interpreter.has_pending_continuation());
  assert!(started_indices(&notifier.events()).is_empty());
  assert!(notifier.events().contains(&FlowEvent::FinalRendered));
}

fn versioned_section_plan() -> Arc<SitePlan> {
  create_plan(
    vec![block(
      "skills",
      vec![
        element("heading", vec![version("v1", "Skills"), final_version("v2", "Core Skills")]),
        element("js", vec![version("v1", "JS"), version("v2", "JS (React, Vue)")]),
      ],
    )],
    vec![
      log_step("start", "[STEP 1] Skills"),
      Step::new("section", StepAction::RenderSection).targeting(Some("skills"), None),
    ],
  )
}

#[tokio::test(start_paused = true)]
async fn test_enhanced_mode_prefers_final_versions() {
  let (interpreter, surface, _) = create_interpreter(versioned_section_plan());

  assert!(interpreter.handle_command("auto"));
  interpreter.wait_until_idle().await;
  let page = surface.snapshot();
  assert_eq!(page.element_text("heading"), Some("Skills"));
  assert_eq!(page.element_text("js"), Some("JS"));
  assert!(!interpreter.status().enhanced);

  assert!(interpreter.handle_command(DEFAULT_ENHANCE_COMMAND));
  interpreter.wait_until_idle().await;
  let page = surface.snapshot();
  assert_eq!(page.element_text("heading"), Some("Core Skills"));
  assert_eq!(page.element_text("js"), Some("JS (React, Vue)"));
  assert!(interpreter.status().enhanced);

  let logs = log_texts(&surface);
  assert_eq!(logs[0], format!("[REQUEST] {}", DEFAULT_ENHANCE_COMMAND));
  assert_eq!(logs[1], "[PROCESSING] Enhancing skill set");
}

#[tokio::test(start_paused = true)]
async fn test_enhance_command_is_idempotent() {
  let (once, once_surface, _) = create_interpreter(versioned_section_plan());
  assert!(once.handle_command(DEFAULT_ENHANCE_COMMAND));
  once.wait_until_idle().await;

  let (twice, twice_surface, notifier) = create_interpreter(versioned_section_plan());
  assert!(twice.handle_command(DEFAULT_ENHANCE_COMMAND));
  assert!(twice.handle_command("  MAKE awesome profile page with lots of skills "));
  assert_eq!(twice.status().cursor, 0);
  twice.wait_until_idle().await;

  assert_eq!(once_surface.snapshot(), twice_surface.snapshot());
  assert_eq!(once.status(), twice.status());

  // The first run was replaced before it executed a step.
  assert_eq!(started_indices(&notifier.events()), vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_reset_during_run_restarts_from_zero() {
  let mut flow = vec![
    Step::new("render", StepAction::RenderElement)
      .targeting(Some("header"), Some("title"))
      .with_version("v1"),
  ];
  flow.extend((1..10).map(|i| log_step(&format!("log-{}", i), &format!("[STEP {}]", i))));
  let (interpreter, surface, notifier) = create_interpreter(title_plan(flow));

  interpreter.initialize(StartMode::Animated);
  let mut status = interpreter.subscribe();
  status
    .wait_for(|s| s.cursor >= 5)
    .await
    .expect("run should reach step 5");
  assert!(surface.snapshot().element("title").is_some());

  assert!(interpreter.handle_command("reset"));

  let status = interpreter.status();
  assert_eq!(status.cursor, 0);
  assert!(status.running);
  assert!(interpreter.has_pending_continuation());
  let page = surface.snapshot();
  assert!(page.log().is_empty());
  assert!(page.is_empty());

  interpreter.wait_until_idle().await;

  let events = notifier.events();
  assert_eq!(
    events
      .iter()
      .filter(|e| matches!(e, FlowEvent::RunCancelled { .. }))
      .count(),
    1
  );
  let indices = started_indices(&events);
  assert_eq!(indices[..5], [0, 1, 2, 3, 4]);
  assert_eq!(indices[5..], [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
  assert_eq!(surface.snapshot().element_text("title"), Some("Developer"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_leaves_nothing_pending() {
  let flow = (0..8)
    .map(|i| log_step(&format!("log-{}", i), &format!("[STEP {}]", i)))
    .collect();
  let (interpreter, surface, notifier) = create_interpreter(create_plan(vec![], flow));

  interpreter.initialize(StartMode::Animated);
  let mut status = interpreter.subscribe();
  status
    .wait_for(|s| s.cursor >= 3)
    .await
    .expect("run should reach step 3");

  interpreter.stop();

  let status = interpreter.status();
  assert_eq!(status.cursor, 0);
  assert!(!status.running);
  assert!(!interpreter.has_pending_continuation());
  assert!(surface.snapshot().log().is_empty());

  // Nothing fires later: the cancelled continuation is gone for good.
  tokio::time::sleep(Duration::from_secs(30)).await;
  assert_eq!(interpreter.status().cursor, 0);
  assert_eq!(started_indices(&notifier.events()).len(), 3);
  assert!(surface.snapshot().log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_element_is_skipped_with_warning() {
  let plan = title_plan(vec![
    Step::new("broken", StepAction::RenderElement).targeting(Some("header"), Some("missing")),
    log_step("next", "[NEXT]"),
  ]);
  let (interpreter, surface, notifier) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  surface.take_events();
  interpreter.wait_until_idle().await;

  assert!(!surface.events().iter().any(SurfaceEvent::mutates_content));
  assert!(surface.snapshot().is_empty());

  let events = notifier.events();
  assert!(events.iter().any(|e| matches!(
    e,
    FlowEvent::UnresolvedReference { step_id, .. } if step_id == "broken"
  )));
  assert_eq!(started_indices(&events), vec![0, 1]);
  assert!(log_texts(&surface).contains(&"[NEXT]".to_string()));
  assert_eq!(interpreter.status().cursor, 2);
}

#[tokio::test(start_paused = true)]
async fn test_unresolved_version_does_not_fall_back() {
  let plan = title_plan(vec![
    Step::new("bad-version", StepAction::RenderElement)
      .targeting(Some("header"), Some("title"))
      .with_version("v9"),
    Step::new("bad-update", StepAction::UpdateElement)
      .targeting(None, Some("title"))
      .with_version("v7"),
    Step::new("unknown-section", StepAction::RenderSection).targeting(Some("nowhere"), None),
  ]);
  let (interpreter, surface, notifier) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  interpreter.wait_until_idle().await;

  assert!(surface.snapshot().element("title").is_none());
  let unresolved: Vec<String> = notifier
    .events()
    .into_iter()
    .filter_map(|e| match e {
      FlowEvent::UnresolvedReference { step_id, .. } => Some(step_id),
      _ => None,
    })
    .collect();
  assert_eq!(unresolved, vec!["bad-version", "bad-update", "unknown-section"]);
}

#[tokio::test(start_paused = true)]
async fn test_update_logs_critique_before_retyping() {
  let mut revised = final_version("v2", "I build reliable systems.");
  revised.critique_of_previous = Some("Too generic.".to_string());
  revised.log_message = Some("[UPDATED] About paragraph".to_string());

  let plan = create_plan(
    vec![block(
      "about",
      vec![element("p1", vec![version("v1", "I like computers."), revised])],
    )],
    vec![
      Step::new("render", StepAction::RenderElement)
        .targeting(Some("about"), Some("p1"))
        .with_version("v1"),
      Step::new("update", StepAction::UpdateElement)
        .targeting(Some("about"), Some("p1"))
        .with_version("v2")
        .with_log("[REVISING] About Me", LogCategory::Checking),
    ],
  );
  let (interpreter, surface, _) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  interpreter.wait_until_idle().await;

  assert_eq!(
    surface.snapshot().element_text("p1"),
    Some("I build reliable systems.")
  );

  let ordering: Vec<String> = surface
    .events()
    .into_iter()
    .filter_map(|e| match e {
      SurfaceEvent::LogAppended { text, category } if category != LogCategory::User => Some(text),
      SurfaceEvent::UpdateStarted { .. } => Some("<update>".to_string()),
      SurfaceEvent::UpdateCompleted { .. } => Some("</update>".to_string()),
      _ => None,
    })
    .collect();
  assert_eq!(
    ordering,
    vec![
      "[REVISING] About Me",
      "[CRITIQUE] Too generic.",
      "<update>",
      "</update>",
      "[UPDATED] About paragraph",
    ]
  );

  let critique = surface
    .snapshot()
    .log()
    .iter()
    .find(|l| l.text.starts_with("[CRITIQUE]"))
    .map(|l| l.category);
  assert_eq!(critique, Some(LogCategory::Critique));
}

#[tokio::test(start_paused = true)]
async fn test_remove_and_visual_state_steps() {
  let plan = create_plan(
    vec![
      block(
        "skills",
        vec![
          element("keep", vec![version("v1", "Rust")]),
          element("drop", vec![version("v1", "COBOL")]),
        ],
      ),
      block("extra", vec![element("x", vec![version("v1", "extra")])]),
    ],
    vec![
      Step::new("skills", StepAction::RenderSection).targeting(Some("skills"), None),
      Step::new("extra", StepAction::RenderSection).targeting(Some("extra"), None),
      Step::new("busy", StepAction::SetSectionVisualState)
        .targeting(Some("skills"), None)
        .with_state(VisualState::Error),
      Step::new("drop", StepAction::RemoveElement).targeting(Some("skills"), Some("drop")),
      Step::new("drop-extra", StepAction::RemoveElement).targeting(Some("extra"), None),
      Step::new("state-missing", StepAction::SetSectionVisualState)
        .targeting(Some("extra"), None)
        .with_state(VisualState::InProgress),
    ],
  );
  let (interpreter, surface, notifier) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  interpreter.wait_until_idle().await;

  let page = surface.snapshot();
  let skills = page.section("skills").expect("skills should be rendered");
  assert_eq!(skills.state, VisualState::Error);
  assert!(page.element("drop").is_none());
  assert_eq!(page.element_text("keep"), Some("Rust"));
  assert!(page.section("extra").is_none());

  // The wrapper was removed, so the last step only warns.
  assert!(notifier.events().iter().any(|e| matches!(
    e,
    FlowEvent::UnresolvedReference { step_id, .. } if step_id == "state-missing"
  )));
}

#[tokio::test(start_paused = true)]
async fn test_render_initial_then_wipe() {
  let plan = create_plan(
    vec![
      placeholder(
        "example",
        vec![
          element("hello", vec![version("v1", "HELLO WORLD")]),
          element("site", vec![version("v1", "This is example site")]),
        ],
      ),
      block("header", vec![element("name", vec![final_version("v1", "Leo")])]),
    ],
    vec![
      Step::new("initial", StepAction::RenderInitial)
        .with_log("[ANALYZING] Example site template detected", LogCategory::System),
      Step::new("wipe", StepAction::ClearContentArea),
      Step::new("name", StepAction::RenderElement).targeting(Some("header"), Some("name")),
    ],
  );
  let (interpreter, surface, _) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  interpreter.wait_until_idle().await;

  let events = surface.events();
  let initial = events
    .iter()
    .position(|e| matches!(e, SurfaceEvent::InitialRevealed { .. }))
    .expect("initial content should be revealed");
  let wipe_done = events
    .iter()
    .position(|e| matches!(e, SurfaceEvent::WipeCompleted))
    .expect("wipe should complete");
  let reveal = events
    .iter()
    .position(|e| matches!(e, SurfaceEvent::RevealStarted { .. }))
    .expect("name should be revealed");
  assert!(initial < wipe_done && wipe_done < reveal);

  let page = surface.snapshot();
  assert!(page.element("hello").is_none());
  assert_eq!(page.element_text("name"), Some("Leo"));
}

#[tokio::test(start_paused = true)]
async fn test_thought_and_delay_steps_use_explicit_delay() {
  let plan = create_plan(
    vec![],
    vec![
      Step::new("think", StepAction::Thought)
        .with_log("[AI_THOUGHT] hmm", LogCategory::AiThought)
        .with_delay(5_000),
      Step::new("wait", StepAction::Delay).with_delay(2_000),
      Step::new("decide", StepAction::Thought).with_log("[DECISION] go", LogCategory::Decision),
    ],
  );
  let (interpreter, surface, _) = create_interpreter(plan);

  let start = tokio::time::Instant::now();
  interpreter.initialize(StartMode::Animated);
  interpreter.wait_until_idle().await;

  // 5000 + 2000 + default 800
  assert!(start.elapsed() >= Duration::from_millis(7_800));
  assert!(start.elapsed() < Duration::from_millis(8_000));

  let categories: Vec<LogCategory> = surface
    .snapshot()
    .log()
    .iter()
    .map(|l| l.category)
    .collect();
  assert_eq!(
    categories,
    vec![LogCategory::User, LogCategory::AiThought, LogCategory::Decision]
  );
}

#[tokio::test(start_paused = true)]
async fn test_skip_during_run_renders_final_and_keeps_log() {
  let plan = title_plan(vec![
    log_step("a", "[STEP A]"),
    log_step("b", "[STEP B]"),
    Step::new("render", StepAction::RenderElement)
      .targeting(Some("header"), Some("title"))
      .with_version("v1"),
  ]);
  let (interpreter, surface, _) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  let mut status = interpreter.subscribe();
  status
    .wait_for(|s| s.cursor >= 1)
    .await
    .expect("run should start");

  assert!(interpreter.handle_command("skip"));

  assert!(!interpreter.status().running);
  assert!(!interpreter.has_pending_continuation());
  assert_eq!(
    surface.snapshot().element_text("title"),
    Some("Full-Stack Developer")
  );

  let logs = log_texts(&surface);
  assert!(logs.contains(&"[STEP A]".to_string()));
  assert_eq!(logs.last().map(String::as_str), Some("[SKIP] Final content rendered"));

  tokio::time::sleep(Duration::from_secs(10)).await;
  assert_eq!(
    surface.snapshot().element_text("title"),
    Some("Full-Stack Developer")
  );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_command_logs_error_without_state_change() {
  let (interpreter, surface, notifier) = create_interpreter(title_plan(vec![]));
  let before = interpreter.status();

  assert!(!interpreter.handle_command("  deploy to prod "));

  assert_eq!(interpreter.status(), before);
  assert!(!interpreter.has_pending_continuation());
  assert!(notifier.events().is_empty());

  let log = surface.snapshot().log().to_vec();
  assert_eq!(log.len(), 2);
  assert_eq!(log[0].text, "[ERROR] Unknown command: \"deploy to prod\"");
  assert_eq!(log[0].category, LogCategory::Error);
  assert_eq!(log[1].text, "[HELP] Type 'help' for available commands");
}

#[tokio::test(start_paused = true)]
async fn test_help_lists_utility_commands_and_enhance_phrase() {
  let (interpreter, surface, _) = create_interpreter(title_plan(vec![]));

  assert!(interpreter.handle_command("Help"));

  let logs = log_texts(&surface);
  assert_eq!(logs[0], "[HELP] Available commands:");
  assert_eq!(logs[1], "  help: Displays a list of all available commands");
  assert_eq!(logs[2], "  skip: Instantly displays the final website content.");
  assert!(logs[3].starts_with(&format!("  {}:", DEFAULT_ENHANCE_COMMAND)));
  assert_eq!(logs.len(), 4);
  assert!(!interpreter.status().running);
}

#[tokio::test(start_paused = true)]
async fn test_clear_only_clears_log() {
  let (interpreter, surface, _) = create_interpreter(title_plan(vec![]));
  assert!(interpreter.handle_command("skip"));
  assert!(!surface.snapshot().log().is_empty());

  assert!(interpreter.handle_command("clear"));

  let page = surface.snapshot();
  assert!(page.log().is_empty());
  assert_eq!(page.element_text("title"), Some("Full-Stack Developer"));
}

#[tokio::test(start_paused = true)]
async fn test_builtin_plan_runs_to_completion() {
  let plan = Arc::new(SitePlan::builtin().expect("builtin plan should load"));
  let total = plan.flow.len();
  let (interpreter, surface, notifier) = create_interpreter(plan.clone());

  interpreter.initialize(StartMode::Animated);
  interpreter.wait_until_idle().await;

  let events = notifier.events();
  assert!(!events
    .iter()
    .any(|e| matches!(e, FlowEvent::UnresolvedReference { .. })));
  assert_eq!(started_indices(&events), (0..total).collect::<Vec<_>>());

  let page = surface.snapshot();
  assert_eq!(
    page.element_text("header-h2-title"),
    Some("Full-Stack Developer & UX Designer")
  );
  assert!(page.element("skills-react").is_none());
  assert!(page.section("initialExample").is_none());
  assert_eq!(page.title(), format!("{} (100%)", plan.meta.site_title));

  // The animated run ends where the instant render starts, except for the
  // entry the flow removes.
  let (instant, instant_surface, _) = create_interpreter(plan);
  instant.initialize(StartMode::Instant);
  let instant_page = instant_surface.snapshot();
  for section in instant_page.sections() {
    for element in section.elements.iter().filter(|e| e.id != "skills-react") {
      assert_eq!(
        page.element_text(&element.id),
        Some(element.text.as_str()),
        "element {} differs",
        element.id
      );
    }
  }
}

/// Wait until the page satisfies `done`, following surface revisions.
async fn wait_for_page(surface: &MemorySurface, done: impl Fn(&Page) -> bool) {
  let mut revisions = surface.subscribe();
  while !done(&surface.snapshot()) {
    revisions
      .changed()
      .await
      .expect("surface should stay alive");
  }
}

#[tokio::test(start_paused = true)]
async fn test_reset_mid_section_typing_starts_section_over() {
  let plan = create_plan(
    vec![block(
      "about",
      vec![
        element("a", vec![version("v1", "first line")]),
        element("b", vec![version("v1", "second line")]),
        element("c", vec![version("v1", "third line")]),
      ],
    )],
    vec![Step::new("section", StepAction::RenderSection).targeting(Some("about"), None)],
  );
  let (interpreter, surface, _) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  wait_for_page(&surface, |page| {
    page
      .element_text("a")
      .is_some_and(|text| !text.is_empty() && text != "first line")
  })
  .await;

  assert!(interpreter.handle_command("reset"));
  interpreter.wait_until_idle().await;

  let events = surface.events();
  let reset_at = events
    .iter()
    .rposition(|e| matches!(e, SurfaceEvent::AnimationsCancelled))
    .expect("reset should cancel animations");

  let reveals = |events: &[SurfaceEvent]| -> Vec<String> {
    events
      .iter()
      .filter_map(|e| match e {
        SurfaceEvent::RevealStarted { element_id } => Some(format!("start:{}", element_id)),
        SurfaceEvent::RevealCompleted { element_id } => Some(format!("done:{}", element_id)),
        _ => None,
      })
      .collect()
  };

  // The interrupted run never finished "a" and never got to "b" or "c".
  assert_eq!(reveals(&events[..reset_at]), vec!["start:a"]);
  assert_eq!(
    reveals(&events[reset_at..]),
    vec!["start:a", "done:a", "start:b", "done:b", "start:c", "done:c"]
  );

  let page = surface.snapshot();
  assert_eq!(page.element_text("a"), Some("first line"));
  assert_eq!(page.element_text("c"), Some("third line"));
  assert_eq!(page.section("about").map(|s| s.elements.len()), Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_skip_during_critique_pause_never_retypes() {
  let mut revised = final_version("v2", "I build reliable systems.");
  revised.critique_of_previous = Some("Too generic.".to_string());
  revised.log_message = Some("[UPDATED] About paragraph".to_string());

  let plan = create_plan(
    vec![block(
      "about",
      vec![element("p1", vec![version("v1", "I like computers."), revised])],
    )],
    vec![
      Step::new("render", StepAction::RenderElement)
        .targeting(Some("about"), Some("p1"))
        .with_version("v1"),
      Step::new("update", StepAction::UpdateElement)
        .targeting(Some("about"), Some("p1"))
        .with_version("v2"),
      log_step("after", "[AFTER UPDATE]"),
    ],
  );
  let (interpreter, surface, notifier) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  wait_for_page(&surface, |page| {
    page.log().iter().any(|line| line.text.starts_with("[CRITIQUE]"))
  })
  .await;

  assert!(interpreter.handle_command("skip"));
  tokio::time::sleep(Duration::from_secs(10)).await;

  assert!(
    !surface
      .events()
      .iter()
      .any(|e| matches!(e, SurfaceEvent::UpdateStarted { .. }))
  );
  let logs = log_texts(&surface);
  assert!(!logs.contains(&"[UPDATED] About paragraph".to_string()));
  assert!(!logs.contains(&"[AFTER UPDATE]".to_string()));
  assert_eq!(logs.last().map(String::as_str), Some("[SKIP] Final content rendered"));

  assert_eq!(
    surface.snapshot().element_text("p1"),
    Some("I build reliable systems.")
  );
  assert_eq!(started_indices(&notifier.events()), vec![0, 1]);
  assert!(!interpreter.has_pending_continuation());
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_wipe_clears_residue() {
  let plan = create_plan(
    vec![placeholder(
      "example",
      vec![
        element("hello", vec![version("v1", "HELLO WORLD")]),
        element("site", vec![version("v1", "This is example site")]),
      ],
    )],
    vec![
      Step::new("initial", StepAction::RenderInitial),
      Step::new("wipe", StepAction::ClearContentArea),
      log_step("after", "[AFTER WIPE]"),
    ],
  );
  let (interpreter, surface, _) = create_interpreter(plan);

  interpreter.initialize(StartMode::Animated);
  wait_for_page(&surface, |page| page.wipe_residue().is_some()).await;

  interpreter.stop();
  tokio::time::sleep(Duration::from_secs(10)).await;

  assert!(
    !surface
      .events()
      .iter()
      .any(|e| matches!(e, SurfaceEvent::WipeCompleted))
  );
  let page = surface.snapshot();
  assert!(page.is_empty());
  assert!(page.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_channel_notifier_streams_run_events() {
  let plan = create_plan(
    vec![],
    vec![log_step("one", "[ONE]"), log_step("two", "[TWO]")],
  );
  let surface = Arc::new(MemorySurface::new(plan.meta.animation_settings.clone()));
  let (tx, mut rx) = mpsc::unbounded_channel();
  let interpreter = FlowInterpreter::with_notifier(plan, surface, Arc::new(ChannelNotifier::new(tx)));

  interpreter.initialize(StartMode::Animated);
  interpreter.wait_until_idle().await;

  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }

  let run_id = match events.first() {
    Some(FlowEvent::RunStarted { run_id, total_steps }) => {
      assert_eq!(*total_steps, 2);
      run_id.clone()
    }
    other => panic!("expected RunStarted first, got {:?}", other),
  };
  assert_eq!(started_indices(&events), vec![0, 1]);
  assert_eq!(events.last(), Some(&FlowEvent::RunCompleted { run_id }));
}

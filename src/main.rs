mod terminal;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use forge_config::SitePlan;
use forge_interpreter::{ChannelNotifier, FlowEvent, FlowInterpreter, StartMode};
use forge_surface::MemorySurface;

/// Portfolio Forge - watch a portfolio page write and revise itself
#[derive(Parser)]
#[command(name = "portfolio-forge")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a plan file (default: <config dir>/portfolio-forge/plan.json, else the built-in plan)
  #[arg(long, global = true)]
  plan: Option<PathBuf>,

  /// Write tracing output to this file
  #[arg(long, global = true)]
  log_file: Option<PathBuf>,

  #[command(flatten)]
  play: PlayArgs,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Args)]
struct PlayArgs {
  /// Render the final page immediately instead of animating
  #[arg(
    long,
    global = true,
    env = "PORTFOLIO_FORGE_INSTANT",
    action = clap::ArgAction::SetTrue,
    value_parser = clap::builder::FalseyValueParser::new()
  )]
  instant: bool,

  /// Start in enhanced mode (prefer final versions when rendering sections)
  #[arg(long, global = true)]
  enhanced: bool,

  /// Override the per-character typing interval, in milliseconds
  #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
  typing_speed: Option<u64>,

  /// Override the default pause between steps, in milliseconds
  #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
  command_delay: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
  /// Play the flow in the terminal (the default)
  Play,

  /// Validate a plan and list steps whose targets do not resolve
  Check,

  /// Print the final page markup to stdout
  Render,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let interactive = matches!(cli.command, None | Some(Commands::Play));
  init_tracing(cli.log_file.as_deref(), interactive)?;

  let mut plan = load_plan(cli.plan.as_deref())?;
  apply_overrides(&mut plan, &cli.play);

  match cli.command {
    None | Some(Commands::Play) => run_play(plan, cli.play),
    Some(Commands::Check) => run_check(&plan),
    Some(Commands::Render) => run_render(plan),
  }
}

/// Resolve the plan: an explicit path, then the user's config dir, then the built-in plan.
fn load_plan(path: Option<&Path>) -> Result<SitePlan> {
  let path = path.map(Path::to_path_buf).or_else(default_plan_path);

  let plan = match path {
    Some(path) => {
      info!(path = %path.display(), "loading plan file");
      SitePlan::load(&path)
        .with_context(|| format!("failed to load plan file: {}", path.display()))?
    }
    None => SitePlan::builtin().context("failed to load built-in plan")?,
  };

  for dangling in plan.dangling_references() {
    warn!(step_id = %dangling.step_id, detail = %dangling.detail, "dangling reference in plan");
  }

  Ok(plan)
}

fn default_plan_path() -> Option<PathBuf> {
  dirs::config_dir()
    .map(|dir| dir.join("portfolio-forge").join("plan.json"))
    .filter(|path| path.is_file())
}

fn apply_overrides(plan: &mut SitePlan, args: &PlayArgs) {
  let settings = &mut plan.meta.animation_settings;
  if let Some(typing_speed) = args.typing_speed {
    settings.typing_speed = typing_speed;
  }
  if let Some(command_delay) = args.command_delay {
    settings.command_delay = command_delay;
  }
}

fn init_tracing(log_file: Option<&Path>, interactive: bool) -> Result<()> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

  match log_file {
    Some(path) => {
      let file = File::create(path)
        .with_context(|| format!("failed to create log file: {}", path.display()))?;
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();
    }
    // Anything written to stderr would tear the terminal view.
    None if interactive => {}
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    }
  }

  Ok(())
}

fn run_play(plan: SitePlan, args: PlayArgs) -> Result<()> {
  // The run task and the terminal share one thread, so a reset never races
  // a step that is halfway through writing to the page.
  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("failed to build tokio runtime")?;
  rt.block_on(async {
    let plan = Arc::new(plan);
    let surface = Arc::new(MemorySurface::new(plan.meta.animation_settings.clone()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let notifier = Arc::new(ChannelNotifier::new(events_tx));
    let interpreter = FlowInterpreter::with_notifier(plan, surface, notifier);
    tokio::spawn(log_flow_events(events_rx));

    interpreter.set_enhanced(args.enhanced);
    interpreter.initialize(if args.instant {
      StartMode::Instant
    } else {
      StartMode::Animated
    });

    let result = terminal::run(&interpreter).await;
    interpreter.stop();
    result
  })
}

/// Write each flow event to the tracing log as JSON.
async fn log_flow_events(mut events: mpsc::UnboundedReceiver<FlowEvent>) {
  while let Some(event) = events.recv().await {
    match serde_json::to_string(&event) {
      Ok(json) => info!(event = %json, "flow event"),
      Err(e) => warn!(error = %e, "failed to serialize flow event"),
    }
  }
}

fn run_check(plan: &SitePlan) -> Result<()> {
  let elements: usize = plan.sections.iter().map(|s| s.elements().len()).sum();
  println!("Plan: {}", plan.meta.site_title);
  println!(
    "{} sections, {} elements, {} steps",
    plan.sections.len(),
    elements,
    plan.flow.len()
  );

  let dangling = plan.dangling_references();
  if dangling.is_empty() {
    println!("All step targets resolve");
    return Ok(());
  }

  for reference in &dangling {
    println!("  {}", reference);
  }
  bail!("plan has {} dangling references", dangling.len())
}

fn run_render(plan: SitePlan) -> Result<()> {
  let plan = Arc::new(plan);
  let surface = Arc::new(MemorySurface::new(plan.meta.animation_settings.clone()));
  let interpreter = FlowInterpreter::new(plan, surface.clone());

  // Instant initialization never spawns a run task.
  interpreter.initialize(StartMode::Instant);

  let page = surface.snapshot();
  println!("{}", page.title());
  print!("{}", page.markup());
  Ok(())
}

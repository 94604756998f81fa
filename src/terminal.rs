//! Terminal front end.
//!
//! Draws the [`Page`] held by a [`MemorySurface`] as four regions: a title
//! line with progress, the content pane, the log pane and a command line.
//! The view is redrawn whenever the surface revision changes or a key is
//! pressed. Enter submits the command line to the interpreter.

use std::io::{self, Stdout, Write};

use anyhow::{Context, Result};
use crossterm::cursor::{MoveTo, Show};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{
  self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
  enable_raw_mode,
};
use crossterm::{ExecutableCommand, QueueableCommand};
use futures::StreamExt;
use tracing::debug;

use forge_config::{ElementTag, LogCategory, VisualState};
use forge_interpreter::{FlowInterpreter, RunStatus};
use forge_surface::{MemorySurface, Page};

const PROMPT: &str = "> ";

/// Drive the terminal until the user quits.
pub async fn run(interpreter: &FlowInterpreter<MemorySurface>) -> Result<()> {
  let _guard = TerminalGuard::enter()?;
  let mut stdout = io::stdout();

  let surface = interpreter.surface().clone();
  let mut revisions = surface.subscribe();
  let mut status = interpreter.subscribe();
  let mut events = EventStream::new();
  let mut editor = LineEditor::default();

  loop {
    draw(&mut stdout, &surface.snapshot(), &interpreter.status(), &editor)?;

    tokio::select! {
      changed = revisions.changed() => {
        if changed.is_err() {
          break;
        }
      }
      changed = status.changed() => {
        if changed.is_err() {
          break;
        }
      }
      event = events.next() => match event {
        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
          match editor.handle_key(key) {
            KeyOutcome::Submit(line) => {
              debug!(command = %line, "command submitted");
              interpreter.handle_command(&line);
            }
            KeyOutcome::Quit => break,
            KeyOutcome::Edited | KeyOutcome::Ignored => {}
          }
        }
        Some(Ok(_)) => {}
        Some(Err(e)) => return Err(e).context("failed to read terminal event"),
        None => break,
      },
    }
  }

  Ok(())
}

/// Raw mode plus the alternate screen, restored on drop.
struct TerminalGuard;

impl TerminalGuard {
  fn enter() -> Result<Self> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let guard = TerminalGuard;
    io::stdout()
      .execute(EnterAlternateScreen)
      .context("failed to enter alternate screen")?;
    Ok(guard)
  }
}

impl Drop for TerminalGuard {
  fn drop(&mut self) {
    let mut stdout = io::stdout();
    let _ = stdout.execute(Show);
    let _ = stdout.execute(LeaveAlternateScreen);
    let _ = disable_raw_mode();
  }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
  Submit(String),
  Quit,
  Edited,
  Ignored,
}

/// Single-line input with a cursor.
#[derive(Debug, Default)]
struct LineEditor {
  buffer: Vec<char>,
  cursor: usize,
}

impl LineEditor {
  fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Char('c') if ctrl => KeyOutcome::Quit,
      KeyCode::Esc => KeyOutcome::Quit,
      KeyCode::Char('u') if ctrl => {
        self.buffer.clear();
        self.cursor = 0;
        KeyOutcome::Edited
      }
      KeyCode::Char(ch) if !ctrl => {
        self.buffer.insert(self.cursor, ch);
        self.cursor += 1;
        KeyOutcome::Edited
      }
      KeyCode::Backspace if self.cursor > 0 => {
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
        KeyOutcome::Edited
      }
      KeyCode::Delete if self.cursor < self.buffer.len() => {
        self.buffer.remove(self.cursor);
        KeyOutcome::Edited
      }
      KeyCode::Left if self.cursor > 0 => {
        self.cursor -= 1;
        KeyOutcome::Edited
      }
      KeyCode::Right if self.cursor < self.buffer.len() => {
        self.cursor += 1;
        KeyOutcome::Edited
      }
      KeyCode::Home => {
        self.cursor = 0;
        KeyOutcome::Edited
      }
      KeyCode::End => {
        self.cursor = self.buffer.len();
        KeyOutcome::Edited
      }
      KeyCode::Enter => {
        let line: String = self.buffer.drain(..).collect();
        self.cursor = 0;
        if line.trim().is_empty() {
          return KeyOutcome::Edited;
        }
        KeyOutcome::Submit(line)
      }
      _ => KeyOutcome::Ignored,
    }
  }

  fn text(&self) -> String {
    self.buffer.iter().collect()
  }
}

/// One styled row of the view.
struct Row {
  text: String,
  color: Option<Color>,
  bold: bool,
}

impl Row {
  fn plain(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      color: None,
      bold: false,
    }
  }

  fn colored(text: impl Into<String>, color: Color) -> Self {
    Self {
      color: Some(color),
      ..Self::plain(text)
    }
  }
}

fn draw(stdout: &mut Stdout, page: &Page, status: &RunStatus, editor: &LineEditor) -> Result<()> {
  let (width, height) = terminal::size().context("failed to read terminal size")?;
  let width = usize::from(width);
  let height = usize::from(height);
  if height < 6 {
    return Ok(());
  }

  // Title, divider, content, divider, log, command line.
  let body = height - 3;
  let content_height = body * 3 / 5;
  let log_height = body - content_height - 1;

  let mut rows = Vec::with_capacity(height);
  rows.push(Row {
    text: title_line(page, status),
    color: Some(Color::Cyan),
    bold: true,
  });
  rows.push(Row::colored("-".repeat(width), Color::DarkGrey));
  rows.extend(fit(content_rows(page), content_height));
  rows.push(Row::colored("-".repeat(width), Color::DarkGrey));
  rows.extend(tail(log_rows(page), log_height));

  stdout.queue(Clear(ClearType::All))?;
  for (y, row) in rows.iter().enumerate() {
    stdout.queue(MoveTo(0, y as u16))?;
    if let Some(color) = row.color {
      stdout.queue(SetForegroundColor(color))?;
    }
    if row.bold {
      stdout.queue(SetAttribute(Attribute::Bold))?;
    }
    stdout.queue(Print(truncate(&row.text, width)))?;
    stdout.queue(SetAttribute(Attribute::Reset))?;
    stdout.queue(ResetColor)?;
  }

  let input = format!("{}{}", PROMPT, editor.text());
  stdout
    .queue(MoveTo(0, (height - 1) as u16))?
    .queue(Print(truncate(&input, width)))?;
  let cursor_x = (PROMPT.len() + editor.cursor).min(width.saturating_sub(1));
  stdout
    .queue(MoveTo(cursor_x as u16, (height - 1) as u16))?
    .queue(Show)?;

  stdout.flush()?;
  Ok(())
}

fn title_line(page: &Page, status: &RunStatus) -> String {
  let mode = if status.enhanced { " [enhanced]" } else { "" };
  let state = if status.running { "generating" } else { "idle" };
  format!("{}  ({}{})", page.title(), state, mode)
}

fn content_rows(page: &Page) -> Vec<Row> {
  if let Some(residue) = page.wipe_residue() {
    return residue
      .lines()
      .map(|line| Row::colored(line, Color::DarkGrey))
      .collect();
  }

  let mut rows = Vec::new();
  for section in page.sections() {
    let color = match section.state {
      VisualState::Default => None,
      VisualState::InProgress => Some(Color::Yellow),
      VisualState::Error => Some(Color::Red),
    };

    for element in &section.elements {
      let separator = element.class_name.as_deref() == Some("separator");
      let text = match element.tag {
        ElementTag::H1 => element.text.to_uppercase(),
        ElementTag::Li => format!("  {}", element.text),
        _ => element.text.clone(),
      };
      rows.push(Row {
        text,
        color: if separator { Some(Color::DarkGrey) } else { color },
        bold: element.tag.is_heading(),
      });
    }
  }
  rows
}

fn log_rows(page: &Page) -> Vec<Row> {
  page
    .log()
    .iter()
    .map(|line| Row::colored(line.text.clone(), category_color(line.category)))
    .collect()
}

fn category_color(category: LogCategory) -> Color {
  match category {
    LogCategory::User => Color::White,
    LogCategory::System => Color::Green,
    LogCategory::Checking => Color::Yellow,
    LogCategory::AiThought => Color::Magenta,
    LogCategory::Decision => Color::Cyan,
    LogCategory::Critique => Color::DarkYellow,
    LogCategory::Warning => Color::DarkRed,
    LogCategory::Error => Color::Red,
    LogCategory::Info => Color::Grey,
  }
}

/// Keep the first `height` rows, padding with blanks.
fn fit(mut rows: Vec<Row>, height: usize) -> Vec<Row> {
  rows.truncate(height);
  rows.resize_with(height, || Row::plain(""));
  rows
}

/// Keep the last `height` rows so the newest log lines stay visible.
fn tail(mut rows: Vec<Row>, height: usize) -> Vec<Row> {
  let skip = rows.len().saturating_sub(height);
  rows.drain(..skip);
  rows
}

fn truncate(text: &str, width: usize) -> String {
  text.chars().take(width).collect()
}

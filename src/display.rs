//! Terminal display of the error database.
//!
//! The display keeps the latest record for every save file it has heard
//! about and redraws the most recently updated one on each change.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use owo_colors::OwoColorize;
use tokio::sync::mpsc;

use crate::config::DisplayConfig;
use crate::ipc::ChangeEvent;
use crate::savefile::{ErrorEntry, ParsedRecord};

/// Shown when there is no record to display.
pub const NO_RECORD: &str = "No !BugGrabber.lua file found";

const TITLE: &str = "!BugGrabber Viewer";
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Latest known record per save file.
#[derive(Debug, Default)]
pub struct DisplayState {
    records: HashMap<PathBuf, Option<ParsedRecord>>,
    latest: Option<PathBuf>,
}

impl DisplayState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record for the event's path and make it the current one.
    pub fn apply(&mut self, event: ChangeEvent) {
        self.latest = Some(event.path.clone());
        self.records.insert(event.path, event.db);
    }

    /// Record of the most recently updated path.
    #[must_use]
    pub fn current(&self) -> Option<&ParsedRecord> {
        self.latest.as_deref().and_then(|path| self.record_for(path))
    }

    #[must_use]
    pub fn latest_path(&self) -> Option<&Path> {
        self.latest.as_deref()
    }

    #[must_use]
    pub fn record_for(&self, path: &Path) -> Option<&ParsedRecord> {
        self.records.get(path).and_then(Option::as_ref)
    }

    /// Number of save files seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Present errors, highest counter first.
///
/// `nil` slots are dropped. Among equal counters the later entry in the file
/// comes first; entries without a counter go last.
#[must_use]
pub fn sorted_errors(record: &ParsedRecord) -> Vec<&ErrorEntry> {
    let mut errors: Vec<&ErrorEntry> = record.present_errors().collect();
    // Stable ascending sort, then reversed: `None` sorts below every counter.
    errors.sort_by_key(|error| error.counter);
    errors.reverse();
    errors
}

/// First line of a stack trace plus a count of the hidden lines.
///
/// # Examples
///
/// ```
/// use buggrabber_viewer::display::collapse_stack;
///
/// assert_eq!(collapse_stack("a.lua:1: boom\nb.lua:2\nc.lua:3"), "a.lua:1: boom (+2 more lines)");
/// assert_eq!(collapse_stack("only"), "only");
/// ```
#[must_use]
pub fn collapse_stack(stack: &str) -> String {
    let mut lines = stack.lines();
    let first = lines.next().unwrap_or_default();
    match lines.count() {
        0 => first.to_string(),
        1 => format!("{first} (+1 more line)"),
        hidden => format!("{first} (+{hidden} more lines)"),
    }
}

/// Escape control characters, other than newline and tab, so text taken from
/// a save file cannot move the cursor or change terminal state.
///
/// # Examples
///
/// ```
/// use buggrabber_viewer::display::sanitize;
///
/// assert_eq!(sanitize("red \x1b[31m!"), "red \\u{1b}[31m!");
/// assert_eq!(sanitize("a\nb"), "a\nb");
/// ```
#[must_use]
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_unsafe_control) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_unsafe_control(c) {
            let _ = write!(out, "{}", c.escape_unicode());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn is_unsafe_control(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}

fn label(text: &str, color: bool) -> String {
    if color {
        format!("{}", format!("{text}:").cyan().bold())
    } else {
        format!("{text}:")
    }
}

fn push_line(out: &mut String, name: &str, value: impl std::fmt::Display, color: bool) {
    let _ = writeln!(out, "{} {value}", label(name, color));
}

fn push_block(out: &mut String, name: &str, text: &str, color: bool) {
    let _ = writeln!(out, "{}", label(name, color));
    for line in text.lines() {
        let _ = writeln!(out, "    {}", sanitize(line));
    }
}

fn render_error(out: &mut String, error: &ErrorEntry, config: &DisplayConfig) {
    let color = config.color;

    if let Some(message) = &error.message {
        let message = sanitize(message);
        if color {
            push_line(out, "Message", message.red(), color);
        } else {
            push_line(out, "Message", message, color);
        }
    }
    if let Some(time) = &error.time {
        push_line(out, "Time", sanitize(time), color);
    }
    if let Some(session) = error.session {
        push_line(out, "Session", session, color);
    }
    if let Some(counter) = error.counter {
        push_line(out, "Counter", counter, color);
    }

    match &error.stack {
        None => push_line(out, "Stack", "None", color),
        Some(stack) if config.expand_stacks => push_block(out, "Stack", stack, color),
        Some(stack) => push_block(out, "Stack", &collapse_stack(stack), color),
    }

    if config.expand_stacks {
        if let Some(locals) = &error.locals {
            push_block(out, "Locals", locals, color);
        }
    }
}

/// Render one record, or the empty-state message when there is none.
#[must_use]
pub fn render_record(record: Option<&ParsedRecord>, config: &DisplayConfig) -> String {
    let Some(record) = record else {
        return format!("{NO_RECORD}\n");
    };

    let mut out = String::new();
    if let Some(session) = record.session {
        push_line(&mut out, "Session", session, config.color);
    }
    if let Some(last) = record.last_sanitation {
        push_line(&mut out, "Last Sanitization", last, config.color);
    }

    for error in sorted_errors(record) {
        out.push('\n');
        render_error(&mut out, error, config);
    }
    out
}

/// Render the current record under a title and refresh timestamp.
#[must_use]
pub fn render_state(state: &DisplayState, config: &DisplayConfig) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut out = if config.color {
        format!("{} {}\n", TITLE.bold(), timestamp.dimmed())
    } else {
        format!("{TITLE} {timestamp}\n")
    };
    if let Some(path) = state.latest_path() {
        let _ = writeln!(out, "{}", sanitize(&path.to_string_lossy()));
    }
    out.push('\n');
    out.push_str(&render_record(state.current(), config));
    out
}

fn redraw<W: Write>(out: &mut W, state: &DisplayState, config: &DisplayConfig) -> io::Result<()> {
    if config.clear_screen {
        out.write_all(CLEAR_SCREEN.as_bytes())?;
    }
    out.write_all(render_state(state, config).as_bytes())?;
    out.flush()
}

/// Draw the display to `out`, redrawing after every change event.
///
/// Returns the final state once the channel closes.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub async fn run_display_to<W: Write>(
    mut events: mpsc::UnboundedReceiver<ChangeEvent>,
    config: &DisplayConfig,
    out: &mut W,
) -> io::Result<DisplayState> {
    let mut state = DisplayState::new();
    redraw(out, &state, config)?;

    while let Some(event) = events.recv().await {
        tracing::debug!(path = %event.path.display(), has_record = event.db.is_some(), "Redrawing");
        state.apply(event);
        redraw(out, &state, config)?;
    }

    Ok(state)
}

/// Draw the display to stdout until the channel closes.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub async fn run_display(
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    config: &DisplayConfig,
) -> io::Result<DisplayState> {
    run_display_to(events, config, &mut io::stdout()).await
}

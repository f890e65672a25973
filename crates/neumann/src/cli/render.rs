use std::env;
use std::io::Write as _;
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use neumann::core::{AgentEvent, TurnError};
use neumann::discovery::Discovery;
use owo_colors::OwoColorize;
use regex::{Captures, Regex};

const MAX_SEPARATOR_WIDTH: usize = 80;
const RESULT_PREVIEW_CHARS: usize = 60;

static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

/// Prints the progress of a session.
///
/// It is driven from agent callbacks, so the spinner lives behind a lock.
pub struct Renderer {
    progress_bar: Mutex<Option<ProgressBar>>,
    progress_style: ProgressStyle,
}

impl Renderer {
    pub fn new() -> Self {
        let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        Self {
            progress_bar: Mutex::new(None),
            progress_style,
        }
    }

    /// Clears the screen and prints the banner.
    pub fn banner(&self, cwd: &str) {
        print!("\x1bc");
        println!(
            "{} | {} | {cwd}\n",
            "neumann".bold(),
            "Local API (Streaming)".dimmed()
        );
    }

    pub fn prompt(&self) -> String {
        format!("{} ", "❯".blue().bold())
    }

    pub fn separator(&self) {
        let width = env::var("COLUMNS")
            .ok()
            .and_then(|columns| columns.parse().ok())
            .map_or(MAX_SEPARATOR_WIDTH, |columns: usize| {
                columns.min(MAX_SEPARATOR_WIDTH)
            });
        println!("{}", "─".repeat(width).dimmed());
    }

    pub fn discovery(&self, discovery: &Discovery, dir: &str) {
        for problem in discovery.problems() {
            if problem.is_notice() {
                println!("{}", problem.dimmed());
            } else {
                println!("{}", problem.red());
            }
        }
        let count = discovery.tools().len();
        if count > 0 {
            let loaded = format!("Loaded {count} external tools from {dir}");
            println!("{}", loaded.green());
        }
    }

    pub fn handle(&self, event: AgentEvent) {
        match event {
            AgentEvent::RequestStarted => self.start_spinner(),
            AgentEvent::ResponseStarted => {
                self.stop_spinner();
                print!("\n{} ", "⏺".cyan());
            }
            AgentEvent::TextDelta(text) => print!("{}", render_markdown(&text)),
            AgentEvent::Raw(data) => {
                print!("\n{}", format!("[RAW] {data}").dimmed());
            }
            AgentEvent::ResponseFinished { .. } => println!(),
            AgentEvent::ArgumentsInvalid { name } => {
                let message = format!("⏺ Error parsing arguments for {name}");
                println!("{}", message.red());
            }
            AgentEvent::ToolCallStarted { name, preview } => {
                let title = format!("⏺ {}", capitalize(&name));
                println!("\n{}({})", title.green(), preview.dimmed());
            }
            AgentEvent::ToolCallFinished { content, .. } => {
                let preview = format!("  ⎿  {}", result_preview(&content));
                println!("{}", preview.dimmed());
            }
            _ => {}
        }
        let _ = std::io::stdout().flush();
    }

    pub fn shell_line(&self, line: &str) {
        println!("  {}", format!("│ {line}").dimmed());
        let _ = std::io::stdout().flush();
    }

    pub fn turn_error(&self, err: &TurnError) {
        self.stop_spinner();
        println!("{}", format!("⏺ API Error: {err}").red());
    }

    fn start_spinner(&self) {
        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(self.progress_style.clone());
        progress_bar.set_message("Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));
        if let Some(old) = self.lock().replace(progress_bar) {
            old.finish_and_clear();
        }
    }

    fn stop_spinner(&self) {
        if let Some(progress_bar) = self.lock().take() {
            progress_bar.finish_and_clear();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.progress_bar.lock().unwrap_or_else(|err| err.into_inner())
    }
}

fn render_markdown(text: &str) -> String {
    BOLD_SPAN
        .replace_all(text, |caps: &Captures<'_>| {
            let span: &str = &caps[1];
            span.bold().to_string()
        })
        .into_owned()
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
        }
        None => String::new(),
    }
}

/// The first line of a tool result, cut to 60 characters.
fn result_preview(content: &str) -> String {
    let mut lines = content.split('\n');
    let first = lines.next().unwrap_or_default();
    let rest = lines.count();
    let mut preview: String = first.chars().take(RESULT_PREVIEW_CHARS).collect();
    if rest > 0 {
        preview.push_str(&format!(" ... +{rest} lines"));
    } else if first.chars().count() > RESULT_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

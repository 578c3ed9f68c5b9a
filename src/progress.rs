//! Import progress reporting.
//!
//! Reports observable progress during `studyhall import` so operators see
//! what is being extracted and written. Progress is emitted on **stderr** so
//! stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for an import run.
#[derive(Clone, Debug)]
pub enum ImportProgressEvent {
    /// Input file is being read and parsed. Totals unknown.
    Extracting { input: String },
    /// Images are being stored: n out of total.
    StoringImages { n: u64, total: u64 },
    /// Courses/themes or note blocks are being written: n out of total.
    Writing { what: &'static str, n: u64, total: u64 },
    /// A data-quality warning that does not stop the import.
    Warning { message: String },
}

/// Reports import progress. Implementations write to stderr (human or JSON).
pub trait ImportProgressReporter: Send + Sync {
    fn report(&self, event: ImportProgressEvent);
}

/// Human-friendly progress on stderr: "import  writing themes  12 / 40".
pub struct StderrProgress;

impl ImportProgressReporter for StderrProgress {
    fn report(&self, event: ImportProgressEvent) {
        let line = match &event {
            ImportProgressEvent::Extracting { input } => {
                format!("import  extracting {}...\n", input)
            }
            ImportProgressEvent::StoringImages { n, total } => {
                format!(
                    "import  storing images  {} / {}\n",
                    format_number(*n),
                    format_number(*total)
                )
            }
            ImportProgressEvent::Writing { what, n, total } => {
                format!(
                    "import  writing {}  {} / {}\n",
                    what,
                    format_number(*n),
                    format_number(*total)
                )
            }
            ImportProgressEvent::Warning { message } => format!("warning: {}\n", message),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ImportProgressReporter for JsonProgress {
    fn report(&self, event: ImportProgressEvent) {
        let obj = match &event {
            ImportProgressEvent::Extracting { input } => serde_json::json!({
                "event": "progress",
                "phase": "extracting",
                "input": input
            }),
            ImportProgressEvent::StoringImages { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "storing_images",
                "n": n,
                "total": total
            }),
            ImportProgressEvent::Writing { what, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "writing",
                "what": what,
                "n": n,
                "total": total
            }),
            ImportProgressEvent::Warning { message } => serde_json::json!({
                "event": "warning",
                "message": message
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// Progress is off, but warnings still reach stderr.
pub struct NoProgress;

impl ImportProgressReporter for NoProgress {
    fn report(&self, event: ImportProgressEvent) {
        if let ImportProgressEvent::Warning { message } = event {
            let _ = writeln!(std::io::stderr().lock(), "warning: {}", message);
        }
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse the `--progress` flag: `auto`, `human`, `json` or `off`.
    pub fn from_flag(flag: &str) -> anyhow::Result<Self> {
        match flag {
            "auto" => Ok(Self::default_for_tty()),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            "off" => Ok(ProgressMode::Off),
            other => anyhow::bail!(
                "Unknown progress mode: '{}'. Must be auto, human, json, or off.",
                other
            ),
        }
    }

    pub fn reporter(&self) -> Box<dyn ImportProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

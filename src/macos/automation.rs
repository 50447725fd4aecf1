use crate::{Result, ShowFileError};
use std::collections::VecDeque;
use std::future::Future;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

/// Status, standard output and standard error of one script invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    pub code: i32,
    pub out: String,
    pub err: String,
}

impl ScriptOutput {
    pub fn success(out: impl Into<String>) -> Self {
        Self {
            code: 0,
            out: out.into(),
            err: String::new(),
        }
    }

    pub fn failure(code: i32, err: impl Into<String>) -> Self {
        Self {
            code,
            out: String::new(),
            err: err.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Runs AppleScript source and reports how it went
///
/// A non-zero `code` is not an `Err`; callers decide how tolerant to be.
/// `Err` is reserved for failing to run the script at all.
pub trait AutomationExecutor: Send + Sync {
    /// Run a free-standing script
    fn run(&self, script: &str) -> impl Future<Output = Result<ScriptOutput>> + Send;

    /// Run `script` inside a `tell application` block addressed to `app`
    fn tell(&self, app: &str, script: &str) -> impl Future<Output = Result<ScriptOutput>> + Send;
}

/// Wrap `script` so it is addressed to `app`
pub fn tell_block(app: &str, script: &str) -> String {
    format!(
        "tell application \"{}\"\n{}\nend tell",
        applescript_escape(app),
        script
    )
}

/// Escape text for use inside an AppleScript string literal
pub fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Collapse whitespace and cut `text` at a word boundary so that it fits in
/// `width` characters, marking the cut with ` [...]`
pub fn shorten(text: &str, width: usize) -> String {
    const PLACEHOLDER: &str = " [...]";

    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let mut kept = String::new();
    for word in words {
        let separator = if kept.is_empty() { 0 } else { 1 };
        let extra = separator + word.chars().count();
        if kept.chars().count() + extra + PLACEHOLDER.len() > width {
            break;
        }
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(word);
    }

    if kept.is_empty() {
        PLACEHOLDER.trim_start().to_string()
    } else {
        kept + PLACEHOLDER
    }
}

/// Executor backed by the `osascript` command line tool
#[derive(Debug, Clone, Default)]
pub struct OsascriptExecutor {
    timeout: Option<Duration>,
}

impl OsascriptExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every invocation by `timeout`; `None` waits indefinitely
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn execute(&self, script: &str) -> Result<ScriptOutput> {
        trace!(script_len = script.len(), "Spawning osascript");

        let mut child = Command::new("osascript")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ShowFileError::AutomationSpawn(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .await
                .map_err(|e| ShowFileError::AutomationSpawn(e.to_string()))?;
        }

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ShowFileError::AutomationTimeout(limit))?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| ShowFileError::AutomationSpawn(e.to_string()))?;

        let result = ScriptOutput {
            code: output.status.code().unwrap_or(-1),
            out: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            err: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        debug!(code = result.code, "osascript finished");
        Ok(result)
    }
}

impl AutomationExecutor for OsascriptExecutor {
    async fn run(&self, script: &str) -> Result<ScriptOutput> {
        self.execute(script).await
    }

    async fn tell(&self, app: &str, script: &str) -> Result<ScriptOutput> {
        self.execute(&tell_block(app, script)).await
    }
}

/// Invocation recorded by [`ScriptedExecutor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedScript {
    pub app: Option<String>,
    pub script: String,
}

/// In-memory executor that records every script and answers from a queue of
/// prepared results, succeeding with empty output once the queue is empty
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<ScriptOutput>>,
    recorded: Mutex<Vec<RecordedScript>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with(responses: Vec<ScriptOutput>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            recorded: Mutex::default(),
        }
    }

    pub fn push_response(&self, response: ScriptOutput) {
        self.lock_responses().push_back(response);
    }

    /// Every script seen so far, oldest first
    pub fn recorded(&self) -> Vec<RecordedScript> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<ScriptOutput>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer(&self, app: Option<&str>, script: &str) -> ScriptOutput {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedScript {
                app: app.map(str::to_string),
                script: script.to_string(),
            });

        self.lock_responses().pop_front().unwrap_or_default()
    }
}

impl AutomationExecutor for ScriptedExecutor {
    async fn run(&self, script: &str) -> Result<ScriptOutput> {
        Ok(self.answer(None, script))
    }

    async fn tell(&self, app: &str, script: &str) -> Result<ScriptOutput> {
        Ok(self.answer(Some(app), script))
    }
}

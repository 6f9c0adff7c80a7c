//! Browser driver session.
//!
//! A long-lived driver process (Node.js + a headless browser) is spawned once
//! per run. Commands go out as one JSON object per line on its stdin and one
//! JSON response per line comes back on stdout:
//!
//! ```text
//! <- {"ok":true,"ready":true}
//! -> {"cmd":"navigate","url":...,"userAgent":...,"viewport":{...},...}
//! <- {"ok":false,"kind":"timeout_navigation","error":"..."}
//! -> {"cmd":"dom"}      <- {"ok":true,"data":{"nodes":[...]}}
//! -> {"cmd":"styles"}   <- {"ok":true,"data":[{"kind":"readable","rules":[...]}, ...]}
//! -> {"cmd":"layout"}   <- {"ok":true,"data":{"width":1366,"height":768,"title":"..."}}
//! -> {"cmd":"quit"}
//! ```

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::browser::loader::{LoadOptions, PageContext, Viewport};
use crate::dom::dom_model::{Document, DomTree, LayoutMetrics, StyleSheet};
use crate::error::{ExtractionError, LoadPhase, NavigationError, SessionError};

pub const DEFAULT_DRIVER_SCRIPT: &str = "node/form_driver.js";

/// Wait for the driver's ready signal.
pub const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Wait for a `dom`/`styles`/`layout` answer.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
/// Wait for the `quit` acknowledgement before killing the driver.
pub const QUIT_TIMEOUT: Duration = Duration::from_secs(5);
pub const RESPONSE_GRACE: Duration = Duration::from_secs(1);

/// Request sent to the driver over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest {
    Navigate {
        cmd: &'static str,
        url: String,
        #[serde(rename = "userAgent")]
        user_agent: String,
        viewport: Viewport,
        #[serde(rename = "idleConnections")]
        idle_connections: u32,
        #[serde(rename = "idleWindowMs")]
        idle_window_ms: u64,
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
        #[serde(rename = "readySelector")]
        ready_selector: String,
        #[serde(rename = "readyTimeoutMs")]
        ready_timeout_ms: u64,
    },
    Query {
        cmd: &'static str,
    },
}

impl BrowserRequest {
    pub fn navigate(url: &str, options: &LoadOptions) -> Self {
        BrowserRequest::Navigate {
            cmd: "navigate",
            url: url.to_string(),
            user_agent: options.user_agent.clone(),
            viewport: options.viewport,
            idle_connections: options.idle_connections,
            idle_window_ms: options.idle_window.as_millis() as u64,
            timeout_ms: options.navigation_timeout.as_millis() as u64,
            ready_selector: options.ready_selector.clone(),
            ready_timeout_ms: options.ready_timeout.as_millis() as u64,
        }
    }

    pub fn dom() -> Self {
        BrowserRequest::Query { cmd: "dom" }
    }

    pub fn styles() -> Self {
        BrowserRequest::Query { cmd: "styles" }
    }

    pub fn layout() -> Self {
        BrowserRequest::Query { cmd: "layout" }
    }

    pub fn quit() -> Self {
        BrowserRequest::Query { cmd: "quit" }
    }

    fn name(&self) -> &'static str {
        match self {
            BrowserRequest::Navigate { cmd, .. } | BrowserRequest::Query { cmd } => *cmd,
        }
    }
}

/// Response received from the driver over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Failure class reported by `navigate`: `timeout_navigation`,
    /// `timeout_ready` or `unreachable`.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub ready: Option<bool>,
}

impl BrowserResponse {
    /// Classify a failed `navigate` response.
    pub fn navigation_error(self, url: &str, options: &LoadOptions) -> NavigationError {
        let reason = self.error.unwrap_or_else(|| "Unknown error".into());
        match self.kind.as_deref() {
            Some("timeout_navigation") => NavigationError::Timeout {
                phase: LoadPhase::Navigation,
                limit_ms: options.navigation_timeout.as_millis() as u64,
            },
            Some("timeout_ready") => NavigationError::Timeout {
                phase: LoadPhase::ReadySelector,
                limit_ms: options.ready_timeout.as_millis() as u64,
            },
            _ => NavigationError::Unreachable {
                url: url.to_string(),
                reason,
            },
        }
    }
}

/// A browser page driven through the external driver process.
pub struct BrowserSession {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<io::Result<String>>,
    current_url: Option<String>,
    /// Set once a response was missed; the stream can no longer be trusted.
    stalled: bool,
    closed: bool,
}

impl BrowserSession {
    /// Spawn `node <script>` and wait for its ready signal.
    pub fn launch(script: &str) -> Result<Self, SessionError> {
        let mut command = Command::new("node");
        command.arg(script);
        Self::launch_command(command, script)
    }

    /// Spawn an arbitrary driver command speaking the line protocol.
    ///
    /// The process is killed if the ready handshake does not complete.
    pub fn launch_command(mut command: Command, label: &str) -> Result<Self, SessionError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| SessionError::Spawn {
                script: label.to_string(),
                source: e,
            })?;

        match handshake(&mut child, label) {
            Ok((stdin, lines)) => {
                debug!("Browser driver started: {}", label);
                Ok(BrowserSession {
                    child,
                    stdin,
                    lines,
                    current_url: None,
                    stalled: false,
                    closed: false,
                })
            }
            Err(e) => {
                warn!("Browser driver {} failed to start: {}", label, e);
                reap(&mut child);
                Err(e)
            }
        }
    }

    /// Send a request and wait up to `limit` for its response line.
    fn send(&mut self, request: &BrowserRequest, limit: Duration) -> Result<BrowserResponse, SessionError> {
        let json = serde_json::to_string(request).map_err(|e| SessionError::JsonSerialize {
            context: "BrowserRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json)
            .map_err(|e| SessionError::Io(format!("Failed to write to driver stdin: {}", e)))?;
        self.stdin
            .flush()
            .map_err(|e| SessionError::Io(format!("Failed to flush driver stdin: {}", e)))?;

        let line = match next_line(&self.lines, request.name(), limit) {
            Err(e @ SessionError::Timeout { .. }) => {
                self.stalled = true;
                return Err(e);
            }
            other => other?,
        };

        serde_json::from_str(line.trim()).map_err(|e| SessionError::JsonParse {
            context: format!("{} response", request.name()),
            source: e,
        })
    }

    /// Run an evaluation query and decode its `data` payload.
    fn query<T: DeserializeOwned>(&mut self, request: BrowserRequest) -> Result<T, ExtractionError> {
        if self.current_url.is_none() {
            return Err(ExtractionError::NotLoaded);
        }

        let name = request.name();
        let response = self.send(&request, QUERY_TIMEOUT)?;
        if !response.ok {
            return Err(ExtractionError::Evaluation {
                query: name.into(),
                reason: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }

        let data = response.data.ok_or_else(|| ExtractionError::Evaluation {
            query: name.into(),
            reason: "No data in response".into(),
        })?;

        serde_json::from_value(data).map_err(|e| {
            ExtractionError::Session(SessionError::JsonParse {
                context: format!("{} data", name),
                source: e,
            })
        })
    }

    /// Last URL successfully loaded.
    pub fn last_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// OS process id of the driver.
    pub fn driver_pid(&self) -> u32 {
        self.child.id()
    }

    /// Quit the driver. A driver that stops answering is killed.
    pub fn quit(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if !self.stalled {
            // Drivers exit on `quit`, so a closed stream here is expected.
            if let Err(e) = self.send(&BrowserRequest::quit(), QUIT_TIMEOUT) {
                debug!("Driver quit: {}", e);
            }
        }

        if self.stalled {
            reap(&mut self.child);
        } else if let Err(e) = self.child.wait() {
            warn!("Failed to reap browser driver: {}", e);
        }
    }
}

/// Capture the pipes, start the reader thread and check the ready signal.
fn handshake(
    child: &mut Child,
    label: &str,
) -> Result<(ChildStdin, Receiver<io::Result<String>>), SessionError> {
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| SessionError::Io(format!("Failed to capture stdin of {}", label)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SessionError::Io(format!("Failed to capture stdout of {}", label)))?;

    let lines = spawn_reader(stdout);
    let line = next_line(&lines, "launch", LAUNCH_TIMEOUT)?;

    let response: BrowserResponse =
        serde_json::from_str(line.trim()).map_err(|e| SessionError::JsonParse {
            context: "driver ready signal".into(),
            source: e,
        })?;

    if !response.ok || response.ready != Some(true) {
        return Err(SessionError::Protocol {
            command: "launch".into(),
            error: "Did not receive ready signal from driver".into(),
        });
    }

    Ok((stdin, lines))
}

/// Forward stdout lines over a channel so reads can carry a deadline.
/// The thread ends when the driver closes stdout.
fn spawn_reader(stdout: ChildStdout) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
    rx
}

fn next_line(
    lines: &Receiver<io::Result<String>>,
    command: &str,
    limit: Duration,
) -> Result<String, SessionError> {
    match lines.recv_timeout(limit) {
        Ok(Ok(line)) if !line.trim().is_empty() => Ok(line),
        Ok(Ok(_)) | Err(RecvTimeoutError::Disconnected) => Err(SessionError::Io(
            "Empty response from driver (process may have died)".into(),
        )),
        Ok(Err(e)) => Err(SessionError::Io(format!(
            "Failed to read from driver stdout: {}",
            e
        ))),
        Err(RecvTimeoutError::Timeout) => Err(SessionError::Timeout {
            command: command.to_string(),
            limit_ms: limit.as_millis() as u64,
        }),
    }
}

/// Kill and reap a driver process; it may already have exited.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("Driver kill: {}", e);
    }
    if let Err(e) = child.wait() {
        warn!("Failed to reap browser driver: {}", e);
    }
}

impl Document for BrowserSession {
    fn elements(&mut self) -> Result<DomTree, ExtractionError> {
        self.query(BrowserRequest::dom())
    }

    fn style_sheets(&mut self) -> Result<Vec<StyleSheet>, ExtractionError> {
        self.query(BrowserRequest::styles())
    }

    fn layout(&mut self) -> Result<LayoutMetrics, ExtractionError> {
        self.query(BrowserRequest::layout())
    }
}

impl PageContext for BrowserSession {
    fn load(&mut self, url: &str, options: &LoadOptions) -> Result<(), NavigationError> {
        let limit = navigation_deadline(options);
        let response = match self.send(&BrowserRequest::navigate(url, options), limit) {
            Err(SessionError::Timeout { limit_ms, .. }) => {
                return Err(NavigationError::Timeout {
                    phase: LoadPhase::Navigation,
                    limit_ms,
                });
            }
            other => other?,
        };
        if !response.ok {
            return Err(response.navigation_error(url, options));
        }
        self.current_url = Some(url.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.quit();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.quit();
    }
}

/// How long `navigate` may take before the driver counts as hung: both
/// driver-side waits plus a grace period for the driver's own reply.
pub fn navigation_deadline(options: &LoadOptions) -> Duration {
    options.navigation_timeout + options.ready_timeout + RESPONSE_GRACE
}

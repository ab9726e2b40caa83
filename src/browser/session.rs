use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::PageError;
use crate::field::detector::{RawInput, detect_fields};
use crate::field::field_model::FormField;
use crate::page::{FormPage, PageWriter};

pub const DEFAULT_SCRIPT: &str = "node/autofill_server.js";

/// Identifies the element to write: `name` first, then `id`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldTarget {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl From<&FormField> for FieldTarget {
    fn from(field: &FormField) -> Self {
        Self {
            name: field.name.clone(),
            id: field.id.clone(),
        }
    }
}

/// Request sent to the browser helper over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest {
    Navigate {
        cmd: &'static str,
        url: String,
    },
    Scan {
        cmd: &'static str,
    },
    Fill {
        cmd: &'static str,
        target: FieldTarget,
        value: String,
        /// Events the helper dispatches after setting `.value`, in order.
        events: [&'static str; 2],
    },
    Quit {
        cmd: &'static str,
    },
}

impl BrowserRequest {
    pub fn navigate(url: &str) -> Self {
        BrowserRequest::Navigate {
            cmd: "navigate",
            url: url.to_string(),
        }
    }

    pub fn scan() -> Self {
        BrowserRequest::Scan { cmd: "scan" }
    }

    pub fn fill(field: &FormField, value: &str) -> Self {
        BrowserRequest::Fill {
            cmd: "fill",
            target: FieldTarget::from(field),
            value: value.to_string(),
            events: ["input", "change"],
        }
    }

    pub fn quit() -> Self {
        BrowserRequest::Quit { cmd: "quit" }
    }
}

/// Response received from the browser helper over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub ready: Option<bool>,
    /// Set by `fill` when the target element no longer exists.
    #[serde(default)]
    pub not_found: Option<bool>,
}

/// A persistent browser session backed by a Node.js helper script.
///
/// The helper keeps one Chromium page open. Commands are NDJSON over stdin,
/// responses NDJSON over stdout.
pub struct BrowserSession {
    child: Child,
    stdin: std::process::ChildStdin,
    reader: BufReader<std::process::ChildStdout>,
    closed: bool,
}

impl BrowserSession {
    /// Spawn the helper script and wait for its ready signal.
    pub fn launch(script: &str) -> Result<Self, PageError> {
        let mut child = Command::new("node")
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| PageError::SubprocessSpawn {
                script: script.into(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            PageError::SessionIO(format!("Failed to capture stdin of {}", script))
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            PageError::SessionIO(format!("Failed to capture stdout of {}", script))
        })?;

        let mut reader = BufReader::new(stdout);

        let mut line = String::new();
        reader.read_line(&mut line).map_err(|e| {
            PageError::SessionIO(format!("Failed to read ready signal: {}", e))
        })?;

        let response: BrowserResponse =
            serde_json::from_str(line.trim()).map_err(|e| PageError::Json {
                context: "browser helper ready signal".into(),
                source: e,
            })?;

        if !response.ok || response.ready != Some(true) {
            return Err(PageError::SessionProtocol {
                command: "launch".into(),
                error: "Did not receive ready signal from browser helper".into(),
            });
        }

        debug!(script, "browser session ready");
        Ok(BrowserSession {
            child,
            stdin,
            reader,
            closed: false,
        })
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, PageError> {
        let json = serde_json::to_string(request).map_err(|e| PageError::Json {
            context: "BrowserRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json).map_err(|e| {
            PageError::SessionIO(format!("Failed to write to browser helper stdin: {}", e))
        })?;

        self.stdin.flush().map_err(|e| {
            PageError::SessionIO(format!("Failed to flush browser helper stdin: {}", e))
        })?;

        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(|e| {
            PageError::SessionIO(format!("Failed to read from browser helper stdout: {}", e))
        })?;

        if line.trim().is_empty() {
            return Err(PageError::SessionIO(
                "Empty response from browser helper (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| PageError::Json {
            context: "browser helper response".into(),
            source: e,
        })
    }

    /// Send a request and verify it succeeded.
    fn send_ok(
        &mut self,
        request: &BrowserRequest,
        command_name: &str,
    ) -> Result<BrowserResponse, PageError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(PageError::SessionProtocol {
                command: command_name.into(),
                error: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }
        Ok(response)
    }

    pub fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        self.send_ok(&BrowserRequest::navigate(url), "navigate")?;
        Ok(())
    }

    /// Raw input records of the current page, in document order.
    pub fn scan_raw(&mut self) -> Result<Vec<RawInput>, PageError> {
        let response = self.send_ok(&BrowserRequest::scan(), "scan")?;
        let data = response.data.ok_or_else(|| PageError::SessionProtocol {
            command: "scan".into(),
            error: "No data in scan response".into(),
        })?;
        let raw: Vec<RawInput> = serde_json::from_value(data).map_err(|e| PageError::Json {
            context: "scan data".into(),
            source: e,
        })?;
        Ok(raw)
    }

    pub fn quit(&mut self) -> Result<(), PageError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Best-effort quit; the process may already be gone
        let _ = self.send(&BrowserRequest::quit());
        let _ = self.child.wait();
        Ok(())
    }
}

impl PageWriter for BrowserSession {
    fn write_value(&mut self, field: &FormField, value: &str) -> Result<(), PageError> {
        let response = self.send(&BrowserRequest::fill(field, value))?;
        if response.not_found == Some(true) {
            return Err(PageError::ElementNotFound(field.name.clone()));
        }
        if !response.ok {
            return Err(PageError::SessionProtocol {
                command: "fill".into(),
                error: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }
        Ok(())
    }
}

impl FormPage for BrowserSession {
    fn scan_fields(&mut self) -> Result<Vec<FormField>, PageError> {
        let raw = self.scan_raw()?;
        Ok(detect_fields(&raw))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}

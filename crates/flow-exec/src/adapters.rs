use std::io::Read;
use std::process::Command;
use std::process::Stdio;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::contracts::ExtractionRequest;
use crate::contracts::Provider;
use crate::error::ExtractError;

pub fn build_extraction_prompt(text: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "System:\n\
You turn free-form notes into a task list.\n\
Answer with ONLY a JSON array. Each element is an object with a \"title\" string \
and a \"priority\" that is one of \"high\", \"medium\" or \"low\".\n\
Do not add commentary or numbering.\n\n",
    );
    prompt.push_str("Notes:\n");
    prompt.push_str(text);
    prompt
}

/// The non-interactive invocation of each provider CLI.
pub fn provider_command(request: &ExtractionRequest, prompt: &str) -> Command {
    match request.provider {
        Provider::Codex => {
            let mut cmd = Command::new("codex");
            cmd.arg("exec").arg("--skip-git-repo-check");
            if !request.model.is_empty() {
                cmd.arg("-m").arg(&request.model);
            }
            cmd.arg(prompt);
            cmd
        }
        Provider::Gemini => {
            let mut cmd = Command::new("gemini");
            cmd.arg("-p").arg(prompt);
            if !request.model.is_empty() {
                cmd.arg("-m").arg(&request.model);
            }
            cmd
        }
        Provider::Ollama => {
            let mut cmd = Command::new("ollama");
            cmd.args(["run", "--nowordwrap", &request.model, prompt]);
            cmd
        }
    }
}

/// Runs `cmd` to completion and returns its cleaned stdout. The child is
/// killed once `timeout` passes without it closing stdout.
pub fn run_with_timeout(
    mut cmd: Command,
    provider: &'static str,
    timeout: Duration,
) -> Result<String, ExtractError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ExtractError::Spawn { provider, source })?;

    let stderr_handle = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut stderr_text = String::new();
            let _ = stderr.read_to_string(&mut stderr_text);
            stderr_text
        })
    });

    let (tx, rx) = mpsc::channel();
    if let Some(mut stdout) = child.stdout.take() {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    } else {
        drop(tx);
    }

    let stdout = match rx.recv_timeout(timeout) {
        Ok(bytes) => bytes,
        Err(mpsc::RecvTimeoutError::Disconnected) => Vec::new(),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(provider, timeout_secs = timeout.as_secs(), "provider timed out");
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExtractError::Timeout {
                provider,
                after: timeout,
            });
        }
    };

    let status = child.wait().ok();
    let stderr_text = stderr_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
        .trim()
        .to_string();

    match status {
        Some(status) if status.success() => {}
        other => {
            return Err(ExtractError::Exit {
                provider,
                status: other.map_or_else(|| "unknown status".to_string(), |s| s.to_string()),
                stderr: strip_ansi_sequences(&stderr_text),
            });
        }
    }

    let text = strip_ansi_sequences(&String::from_utf8_lossy(&stdout));
    debug!(provider, bytes = text.len(), "provider answered");
    if text.trim().is_empty() {
        return Err(ExtractError::EmptyResponse { provider });
    }
    Ok(text)
}

pub fn strip_ansi_sequences(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            if chars.peek() == Some(&'[') {
                let _ = chars.next();
                for n in chars.by_ref() {
                    if ('@'..='~').contains(&n) {
                        break;
                    }
                }
            }
            continue;
        }
        if c == '\r' {
            continue;
        }
        out.push(c);
    }
    out
}

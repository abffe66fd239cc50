//! Copies text to the system clipboard through the platform's command line tool.

use std::io::Write;
use std::process::{Command, Stdio};

#[cfg(target_os = "macos")]
const CANDIDATES: &[(&str, &[&str])] = &[("pbcopy", &[])];
#[cfg(target_os = "windows")]
const CANDIDATES: &[(&str, &[&str])] = &[("cmd", &["/C", "clip"])];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const CANDIDATES: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Tries each known clipboard tool in turn until one accepts `text`.
pub fn copy_to_clipboard(text: &str) -> Result<(), String> {
    let mut last_error = None;
    for (program, args) in CANDIDATES {
        match pipe_into(program, args, text) {
            Ok(()) => return Ok(()),
            Err(err) => last_error = Some(err),
        }
    }
    Err(match last_error {
        Some(err) if CANDIDATES.len() == 1 => err,
        _ => {
            let names: Vec<&str> = CANDIDATES.iter().map(|(program, _)| *program).collect();
            format!("No clipboard tool worked (tried {})", names.join(", "))
        }
    })
}

fn pipe_into(program: &str, args: &[&str], text: &str) -> Result<(), String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| format!("Clipboard tool `{program}` is not installed"))?;

    if let Some(mut stdin) = child.stdin.take() {
        // A tool that exits early closes the pipe; its exit status decides.
        let _ = stdin.write_all(text.as_bytes());
    }
    match child.wait() {
        Ok(status) if status.success() => Ok(()),
        _ => Err(format!("Clipboard tool `{program}` failed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_reported_by_name() {
        let err = pipe_into("nexchat-no-such-clipboard", &[], "text").unwrap_err();
        assert!(err.contains("nexchat-no-such-clipboard"));
        assert!(err.contains("not installed"));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_decides_success() {
        assert!(pipe_into("sh", &["-c", "cat > /dev/null"], "copied").is_ok());
        assert!(pipe_into("sh", &["-c", "exit 3"], "copied")
            .unwrap_err()
            .contains("failed"));
    }
}

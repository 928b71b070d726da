use std::io::Write;
use std::process::{Command, Stdio};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::error::{PanelError, Result};

/// Something that can put text on a clipboard
pub trait ClipboardSink: Send {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// Which path actually stored the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    System,
    Fallback,
}

/// Platform clipboard via the usual helper binaries
pub struct SystemClipboard {
    candidates: Vec<(&'static str, Vec<&'static str>)>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        let candidates = if cfg!(target_os = "macos") {
            vec![("pbcopy", vec![])]
        } else if cfg!(windows) {
            vec![("clip", vec![])]
        } else {
            vec![
                ("wl-copy", vec![]),
                ("xclip", vec!["-selection", "clipboard"]),
                ("xsel", vec!["--clipboard", "--input"]),
            ]
        };
        Self { candidates }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardSink for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        let mut last_error = String::from("no clipboard helper found");

        for (program, args) in &self.candidates {
            let child = Command::new(program)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();

            let mut child = match child {
                Ok(child) => child,
                Err(e) => {
                    last_error = format!("{}: {}", program, e);
                    continue;
                }
            };

            // stdin is dropped before waiting so the helper sees EOF
            let written = match child.stdin.take() {
                Some(mut stdin) => stdin.write_all(text.as_bytes()),
                None => Ok(()),
            };

            let status = child.wait()?;
            if let Err(e) = written {
                last_error = format!("{}: {}", program, e);
                continue;
            }
            if status.success() {
                debug!(program, "copied with clipboard helper");
                return Ok(());
            }
            last_error = format!("{} exited with {}", program, status);
        }

        Err(PanelError::Clipboard(last_error))
    }
}

/// OSC 52: asks the terminal emulator itself to set the clipboard
pub struct Osc52Clipboard<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> Osc52Clipboard<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

impl<W: Write + Send> ClipboardSink for Osc52Clipboard<W> {
    fn write_text(&mut self, text: &str) -> Result<()> {
        self.out.write_all(osc52_sequence(text).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Primary clipboard with a terminal fallback
pub struct Clipboard {
    primary: Box<dyn ClipboardSink>,
    fallback: Box<dyn ClipboardSink>,
}

impl Clipboard {
    pub fn new(primary: Box<dyn ClipboardSink>, fallback: Box<dyn ClipboardSink>) -> Self {
        Self { primary, fallback }
    }

    pub fn system() -> Self {
        Self::new(
            Box::new(SystemClipboard::new()),
            Box::new(Osc52Clipboard::new(std::io::stderr())),
        )
    }

    /// Returns `None` only when both paths failed
    pub fn copy(&mut self, text: &str) -> Option<CopyMethod> {
        match self.primary.write_text(text) {
            Ok(()) => Some(CopyMethod::System),
            Err(e) => {
                warn!(error = %e, "clipboard write failed, using terminal fallback");
                match self.fallback.write_text(text) {
                    Ok(()) => Some(CopyMethod::Fallback),
                    Err(e) => {
                        warn!(error = %e, "terminal clipboard fallback failed");
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records writes; optionally fails every one of them
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        pub writes: Arc<Mutex<Vec<String>>>,
        pub fail: bool,
    }

    impl RecordingSink {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn written(&self) -> Vec<String> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl ClipboardSink for RecordingSink {
        fn write_text(&mut self, text: &str) -> Result<()> {
            if self.fail {
                return Err(PanelError::Clipboard("denied".into()));
            }
            self.writes.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn primary_success_skips_fallback() {
        let primary = RecordingSink::default();
        let fallback = RecordingSink::default();
        let mut clipboard = Clipboard::new(Box::new(primary.clone()), Box::new(fallback.clone()));

        assert_eq!(clipboard.copy("hej"), Some(CopyMethod::System));
        assert_eq!(primary.written(), vec!["hej"]);
        assert!(fallback.written().is_empty());
    }

    #[test]
    fn primary_failure_uses_fallback() {
        let fallback = RecordingSink::default();
        let mut clipboard = Clipboard::new(Box::new(RecordingSink::failing()), Box::new(fallback.clone()));

        assert_eq!(clipboard.copy("hej"), Some(CopyMethod::Fallback));
        assert_eq!(fallback.written(), vec!["hej"]);
    }

    #[test]
    fn both_failing_reports_none() {
        let mut clipboard = Clipboard::new(
            Box::new(RecordingSink::failing()),
            Box::new(RecordingSink::failing()),
        );
        assert_eq!(clipboard.copy("hej"), None);
    }

    #[cfg(unix)]
    #[test]
    fn helper_that_closes_stdin_is_reaped_and_reported() {
        let mut clipboard = SystemClipboard {
            candidates: vec![
                ("ask-ai-missing-helper", vec![]),
                ("sh", vec!["-c", "exec 0<&-; exit 3"]),
            ],
        };
        let text = "x".repeat(1 << 20);

        match clipboard.write_text(&text) {
            Err(PanelError::Clipboard(message)) => assert!(message.starts_with("sh")),
            other => panic!("expected a clipboard error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn osc52_encodes_text_as_base64() {
        let mut out = Vec::new();
        Osc52Clipboard::new(&mut out).write_text("hi").unwrap();
        assert_eq!(out, b"\x1b]52;c;aGk=\x07");
    }
}

//! Platform Speech Adapters
//!
//! Terminal hosts have no speech API of their own, so playback shells out
//! to whichever speech binary the system carries (`say` on macOS,
//! `espeak`/`espeak-ng`/`flite` elsewhere). No binary means synthesis is
//! unsupported: the core logs and no-ops, exactly as a missing capability
//! should behave.
//!
//! There is no comparable portable binary for speech capture, so the
//! microphone ships unsupported (`cookie_core::NullRecognizer`) and the
//! mic control stays hidden.

use std::path::PathBuf;

use async_trait::async_trait;
use cookie_core::{PlaybackEvent, SpeechSynthesizer};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot, Mutex};

/// Speech binaries probed, in order of preference
const SPEECH_PROGRAMS: &[&str] = &["say", "espeak-ng", "espeak", "flite"];

/// Text-to-speech via a spawned system speech process
pub struct CommandSynthesizer {
    program: Option<PathBuf>,
    /// Cancel handle for the current utterance
    current: Mutex<Option<oneshot::Sender<()>>>,
}

impl CommandSynthesizer {
    /// Probe `PATH` for a speech binary
    #[must_use]
    pub fn detect() -> Self {
        let program = detect_program();
        match &program {
            Some(path) => tracing::info!(program = %path.display(), "speech synthesis available"),
            None => tracing::info!("no speech binary found, synthesis disabled"),
        }
        Self {
            program,
            current: Mutex::new(None),
        }
    }

    /// Use an explicit binary (for tests)
    #[must_use]
    pub fn with_program(program: PathBuf) -> Self {
        Self {
            program: Some(program),
            current: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    fn supported(&self) -> bool {
        self.program.is_some()
    }

    async fn speak(&self, text: &str) -> anyhow::Result<mpsc::Receiver<PlaybackEvent>> {
        let program = self
            .program
            .clone()
            .ok_or_else(|| anyhow::anyhow!("speech synthesis not supported"))?;

        let mut child = Command::new(&program)
            .arg(text)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        *self.current.lock().await = Some(cancel_tx);

        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            let _ = tx.send(PlaybackEvent::Started).await;

            // None marks cancellation (explicit, or superseded by a newer
            // utterance dropping our sender).
            let status = tokio::select! {
                status = child.wait() => Some(status),
                _ = cancel_rx => None,
            };

            let event = match status {
                Some(Ok(s)) if s.success() => PlaybackEvent::Ended,
                Some(Ok(s)) => PlaybackEvent::Failed(format!("speech process exited with {s}")),
                Some(Err(e)) => PlaybackEvent::Failed(e.to_string()),
                None => {
                    let _ = child.kill().await;
                    PlaybackEvent::Ended
                }
            };

            let _ = tx.send(event).await;
        });

        Ok(rx)
    }

    async fn cancel(&self) {
        if let Some(cancel) = self.current.lock().await.take() {
            let _ = cancel.send(());
        }
    }
}

/// Find the first known speech binary on `PATH`
fn detect_program() -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for program in SPEECH_PROGRAMS {
        for dir in std::env::split_paths(&path) {
            let candidate = dir.join(program);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

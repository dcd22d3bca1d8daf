//! External transcription command runner.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::TranscriptionEngine;

/// Engine that shells out to a configured speech-to-text command.
///
/// The command is invoked as `<program> [args..] <audio-path>` and must print
/// the transcription on stdout. Model loading stays inside the external
/// process, so a worker restart never has to re-warm anything in this
/// process's memory.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngine {
    /// Create an engine, resolving `program` on PATH up front so a
    /// misconfigured host fails at startup rather than on the first job.
    pub fn new(program: &str, args: Vec<String>) -> EngineResult<Self> {
        let program = which::which(program)
            .map_err(|_| EngineError::CommandNotFound(program.to_string()))?;
        Ok(Self { program, args })
    }

    /// Create an engine from an already-resolved path, without a PATH lookup.
    pub fn from_path(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl TranscriptionEngine for CommandEngine {
    fn transcribe(&self, audio: &Path) -> EngineResult<String> {
        if !audio.is_file() {
            return Err(EngineError::AudioNotFound(audio.to_path_buf()));
        }

        debug!(program = %self.program.display(), audio = %audio.display(), "running transcription command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(audio)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("no output").trim();
            warn!(status = %output.status, "transcription command failed: {detail}");
            return Err(EngineError::failed(format!(
                "command exited with {}: {}",
                output.status, detail
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"not really audio").unwrap();
    }

    #[test]
    fn test_missing_audio_is_reported_before_spawning() {
        let engine = CommandEngine::from_path("/bin/echo", vec![]);
        let err = engine
            .transcribe(Path::new("/nonexistent/clip.webm"))
            .unwrap_err();
        assert!(matches!(err, EngineError::AudioNotFound(_)));
    }

    #[test]
    fn test_stdout_is_captured_and_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("clip.webm");
        touch(&audio);

        // `echo <path>` stands in for the real speech-to-text command
        let engine = CommandEngine::from_path("/bin/echo", vec!["transcribed:".into()]);
        let text = engine.transcribe(&audio).unwrap();
        assert_eq!(text, format!("transcribed: {}", audio.display()));
    }

    #[test]
    fn test_nonzero_exit_is_a_transcription_failure() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("clip.webm");
        touch(&audio);

        let engine = CommandEngine::from_path("/bin/false", vec![]);
        let err = engine.transcribe(&audio).unwrap_err();
        assert!(matches!(err, EngineError::TranscriptionFailed(_)));
    }

    #[test]
    fn test_unknown_program_fails_at_construction() {
        let err = CommandEngine::new("no-such-transcriber-cli", vec![]).unwrap_err();
        assert!(matches!(err, EngineError::CommandNotFound(_)));
    }
}

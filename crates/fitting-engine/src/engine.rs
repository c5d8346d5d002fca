use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use fitting_contracts::events::EventLog;
use fitting_contracts::inputs::{
    GenerationResult, InputError, OutfitMode, PhotoInput, DOWNLOAD_FILE_NAME,
};
use fitting_contracts::session::{RequestState, Session, Submission, ValidationError};
use serde_json::{json, Value};

use crate::editor::ImageEditor;
use crate::error::EditError;

#[derive(Debug)]
pub struct Completion {
    pub submission: u64,
    pub outcome: Result<GenerationResult, EditError>,
    pub elapsed_ms: u64,
}

/// Owned by a single thread. Worker threads only report completions; session
/// state changes once the owner passes them to [`FittingEngine::apply`].
pub struct FittingEngine {
    out_dir: PathBuf,
    session: Session,
    editor: Arc<dyn ImageEditor>,
    events: EventLog,
    outstanding: usize,
}

impl FittingEngine {
    pub fn new(out_dir: &Path, events_path: &Path, editor: Arc<dyn ImageEditor>) -> Result<Self> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;
        let events = EventLog::open(events_path, uuid::Uuid::new_v4().to_string())?;
        events.record(
            "session_started",
            [
                ("out_dir", json!(out_dir.display().to_string())),
                ("editor", json!(editor.name())),
            ],
        )?;
        tracing::info!(session_id = events.session_id(), editor = editor.name(), "session started");
        Ok(Self {
            out_dir: out_dir.to_path_buf(),
            session: Session::new(),
            editor,
            events,
            outstanding: 0,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn editor_name(&self) -> &str {
        self.editor.name()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn upload_subject(&mut self, path: &Path) -> Result<(), InputError> {
        let photo = PhotoInput::from_path(path)?;
        self.emit(
            "subject_uploaded",
            [
                ("path", json!(photo.preview())),
                ("mime_type", json!(photo.mime_type())),
                ("bytes", json!(photo.bytes().len())),
            ],
        );
        self.session.upload_subject(photo);
        Ok(())
    }

    pub fn describe_outfit(&mut self, text: &str) {
        self.session.set_outfit_mode(OutfitMode::Text);
        self.session.set_outfit_text(text);
        self.emit(
            "outfit_updated",
            [("mode", json!("text")), ("description", json!(text))],
        );
    }

    pub fn choose_outfit_image(&mut self, path: &Path) -> Result<(), InputError> {
        let photo = PhotoInput::from_path(path)?;
        self.emit(
            "outfit_updated",
            [
                ("mode", json!("image")),
                ("path", json!(photo.preview())),
                ("mime_type", json!(photo.mime_type())),
            ],
        );
        self.session.set_outfit_mode(OutfitMode::Image);
        self.session.set_outfit_image(photo);
        Ok(())
    }

    pub fn set_outfit_mode(&mut self, mode: OutfitMode) {
        self.session.set_outfit_mode(mode);
        self.emit("outfit_mode_changed", [("mode", json!(mode.as_str()))]);
    }

    pub fn set_background(&mut self, text: &str) {
        if text.trim().is_empty() {
            self.session.clear_background();
        } else {
            self.session.set_background(text);
        }
        self.emit(
            "background_updated",
            [("background", json!(self.session.background()))],
        );
    }

    fn begin(&mut self) -> Result<Submission, ValidationError> {
        match self.session.begin_submission() {
            Ok(submission) => {
                self.outstanding += 1;
                self.emit(
                    "submission_started",
                    [
                        ("submission", json!(submission.id)),
                        ("outfit_mode", json!(self.session.outfit_mode().as_str())),
                        (
                            "background",
                            json!(submission.request.background.as_deref()),
                        ),
                        ("editor", json!(self.editor.name())),
                    ],
                );
                Ok(submission)
            }
            Err(err) => {
                self.emit("submission_rejected", [("reason", json!(err.to_string()))]);
                Err(err)
            }
        }
    }

    /// An earlier submission still in flight is neither cancelled nor awaited.
    pub fn submit<F>(&mut self, on_complete: F) -> Result<u64, ValidationError>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let submission = self.begin()?;
        let id = submission.id;
        let editor = Arc::clone(&self.editor);
        thread::spawn(move || on_complete(run_submission(editor.as_ref(), submission)));
        Ok(id)
    }

    pub fn generate_blocking(&mut self) -> Result<&RequestState, ValidationError> {
        let submission = self.begin()?;
        let completion = run_submission(self.editor.as_ref(), submission);
        Ok(self.apply(completion))
    }

    pub fn apply(&mut self, completion: Completion) -> &RequestState {
        self.outstanding = self.outstanding.saturating_sub(1);
        let Completion {
            submission,
            outcome,
            elapsed_ms,
        } = completion;
        match &outcome {
            Ok(result) => {
                tracing::info!(submission, elapsed_ms, "submission succeeded");
                self.emit(
                    "submission_succeeded",
                    [
                        ("submission", json!(submission)),
                        ("elapsed_ms", json!(elapsed_ms)),
                        ("caption", json!(result.caption)),
                        ("data_uri_chars", json!(result.image_url.len())),
                    ],
                );
            }
            Err(err) => {
                tracing::warn!(submission, elapsed_ms, kind = err.kind(), "submission failed: {err}");
                self.emit(
                    "submission_failed",
                    [
                        ("submission", json!(submission)),
                        ("elapsed_ms", json!(elapsed_ms)),
                        ("kind", json!(err.kind())),
                        ("message", json!(err.to_string())),
                    ],
                );
            }
        }
        self.session.complete(submission, outcome)
    }

    /// `None` saves into the session directory.
    pub fn download(&self, target: Option<&Path>) -> Result<PathBuf> {
        let Some(result) = self.session.state().result() else {
            bail!("No generated image to download.");
        };
        let path = match target {
            Some(target) if names_directory(target) => target.join(DOWNLOAD_FILE_NAME),
            Some(target) => target.to_path_buf(),
            None => self.out_dir.join(DOWNLOAD_FILE_NAME),
        };
        let decoded = result.decode_image()?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, &decoded.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.emit(
            "result_downloaded",
            [
                ("path", json!(path.display().to_string())),
                ("mime_type", json!(decoded.mime_type)),
                ("bytes", json!(decoded.bytes.len())),
            ],
        );
        Ok(path)
    }

    pub fn finish(&self) -> Result<()> {
        self.events.record(
            "session_finished",
            [
                ("submissions", json!(self.session.submissions())),
                ("state", json!(self.session.state().label())),
            ],
        )?;
        Ok(())
    }

    fn emit<'a>(&self, event_type: &str, fields: impl IntoIterator<Item = (&'a str, Value)>) {
        if let Err(err) = self.events.record(event_type, fields) {
            tracing::warn!(event_type, "failed to record event: {err:#}");
        }
    }
}

/// A trailing separator or a missing extension marks a target that does not
/// exist yet as a directory.
fn names_directory(target: &Path) -> bool {
    target.is_dir()
        || target
            .as_os_str()
            .to_string_lossy()
            .ends_with(['/', std::path::MAIN_SEPARATOR])
        || target.extension().is_none()
}

fn run_submission(editor: &dyn ImageEditor, submission: Submission) -> Completion {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| editor.edit(&submission.request)))
        .unwrap_or_else(|_| {
            Err(EditError::TransportOrServiceError(
                "image editor panicked".to_string(),
            ))
        });
    Completion {
        submission: submission.id,
        outcome,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

//! State of the local server: public profile and session recorder.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::rpc::Broadcaster;

/// How the server presents itself in server lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProfile {
    pub name: String,
    pub city: String,
    pub welcome_message: String,
}

/// Snapshot of the recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatus {
    /// True when the recording directory is usable.
    pub initialised: bool,
    pub error_message: Option<String>,
    pub enabled: bool,
    pub recording_directory: String,
    pub session_started_at: Option<DateTime<Utc>>,
}

struct Recorder {
    directory: PathBuf,
    error: Option<String>,
    session_started_at: Option<DateTime<Utc>>,
}

impl Recorder {
    fn new(directory: PathBuf) -> Self {
        let error = check_directory(&directory);
        Self {
            directory,
            error,
            session_started_at: None,
        }
    }

    fn status(&self) -> RecorderStatus {
        RecorderStatus {
            initialised: self.error.is_none(),
            error_message: self.error.clone(),
            enabled: self.session_started_at.is_some(),
            recording_directory: self.directory.display().to_string(),
            session_started_at: self.session_started_at,
        }
    }
}

struct ServerInner {
    profile: ServerProfile,
    recorder: Recorder,
}

/// Shared handle on the server's profile and recorder.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<RwLock<ServerInner>>,
    broadcaster: Broadcaster,
}

impl ServerState {
    pub fn new(profile: ServerProfile, recording_directory: PathBuf, broadcaster: Broadcaster) -> Self {
        let inner = ServerInner {
            profile,
            recorder: Recorder::new(recording_directory),
        };

        Self {
            inner: Arc::new(RwLock::new(inner)),
            broadcaster,
        }
    }

    pub fn profile(&self) -> ServerProfile {
        self.read().profile.clone()
    }

    pub fn set_name(&self, name: &str) {
        self.write().profile.name = name.to_string();
    }

    pub fn set_welcome_message(&self, message: &str) {
        self.write().profile.welcome_message = message.to_string();
    }

    pub fn recorder_status(&self) -> RecorderStatus {
        self.read().recorder.status()
    }

    /// Point the recorder at a new directory. Any running session ends.
    pub fn set_recording_directory(&self, directory: impl Into<PathBuf>) {
        let status = {
            let mut inner = self.write();
            let was_recording = inner.recorder.session_started_at.is_some();
            inner.recorder = Recorder::new(directory.into());
            if let Some(error) = &inner.recorder.error {
                warn!(error = %error, "Recorder cannot use directory");
            }
            was_recording.then(|| inner.recorder.status())
        };

        if let Some(status) = status {
            self.announce(&status);
        }
    }

    /// Begin a recording session. Does nothing when the recorder is not
    /// initialised or already recording.
    pub fn start_recording(&self) {
        let status = {
            let mut inner = self.write();
            let recorder = &mut inner.recorder;
            if recorder.error.is_some() {
                warn!("Recording requested but recorder is not initialised");
                None
            } else if recorder.session_started_at.is_some() {
                None
            } else {
                recorder.session_started_at = Some(Utc::now());
                Some(recorder.status())
            }
        };

        if let Some(status) = status {
            info!(directory = %status.recording_directory, "Recording started");
            self.announce(&status);
        }
    }

    pub fn stop_recording(&self) {
        let status = {
            let mut inner = self.write();
            inner
                .recorder
                .session_started_at
                .take()
                .map(|_| inner.recorder.status())
        };

        if let Some(status) = status {
            info!("Recording stopped");
            self.announce(&status);
        }
    }

    /// Close the running session and open a fresh one.
    pub fn restart_recording(&self) {
        let status = {
            let mut inner = self.write();
            let recorder = &mut inner.recorder;
            match recorder.session_started_at {
                Some(_) => {
                    recorder.session_started_at = Some(Utc::now());
                    Some(recorder.status())
                }
                None => None,
            }
        };

        if let Some(status) = status {
            info!("Recording restarted");
            self.announce(&status);
        }
    }

    fn announce(&self, status: &RecorderStatus) {
        match serde_json::to_value(status) {
            Ok(params) => {
                self.broadcaster
                    .broadcast("jamulusserver/recorderStateChanged", params);
            }
            Err(e) => warn!(error = %e, "Failed to encode recorder status"),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ServerInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ServerInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns why `directory` cannot hold recordings, if it cannot.
fn check_directory(directory: &Path) -> Option<String> {
    if directory.as_os_str().is_empty() {
        return Some("Recording directory not set".to_string());
    }

    match std::fs::metadata(directory) {
        Ok(meta) if !meta.is_dir() => Some(format!("{} is not a directory", directory.display())),
        Ok(meta) if meta.permissions().readonly() => {
            Some(format!("{} is not writable", directory.display()))
        }
        Ok(_) => None,
        Err(e) => Some(format!("{}: {}", directory.display(), e)),
    }
}

//! JSON document persistence for profiles and history.
//!
//! A document holds the root lifter's profile, any coached client profiles,
//! and one shared session history. Sessions are attributed to profiles by
//! `profileId`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{ROOT_PROFILE_ID, WorkoutSession};
use crate::error::StoreError;
use crate::profile::TrainingProfile;

/// Everything persisted for one lifter and their clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramDocument {
    pub profile: TrainingProfile,
    #[serde(default)]
    pub clients: Vec<TrainingProfile>,
    #[serde(default)]
    pub history: Vec<WorkoutSession>,
}

impl ProgramDocument {
    pub fn new(profile: TrainingProfile) -> Self {
        Self {
            profile,
            clients: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Root profile first, then clients in document order.
    pub fn profiles(&self) -> impl Iterator<Item = &TrainingProfile> {
        std::iter::once(&self.profile).chain(self.clients.iter())
    }

    pub fn find_profile(&self, profile_id: &str) -> Result<&TrainingProfile, StoreError> {
        self.profiles()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| StoreError::UnknownProfile(profile_id.to_string()))
    }

    /// Replaces the profile with the same id, adding it as a client if new.
    pub fn upsert_profile(&mut self, profile: TrainingProfile) {
        if profile.id == self.profile.id {
            self.profile = profile;
        } else if let Some(existing) = self.clients.iter_mut().find(|c| c.id == profile.id) {
            *existing = profile;
        } else {
            log::info!("Adding client profile {}", profile.id);
            self.clients.push(profile);
        }
    }
}

/// Loads a program document from a JSON file.
///
/// # Errors
/// Returns `StoreError` if the file is missing, unreadable or not a valid
/// document.
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<ProgramDocument, StoreError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(StoreError::FileNotFound(path.display().to_string()));
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| StoreError::CannotRead(format!("{}: {}", path.display(), e)))?;

    let document: ProgramDocument = serde_json::from_str(&contents)
        .map_err(|e| StoreError::InvalidFormat(format!("{}: {}", path.display(), e)))?;

    log::debug!(
        "Loaded {} profiles and {} sessions from {}",
        document.clients.len() + 1,
        document.history.len(),
        path.display()
    );

    Ok(document)
}

/// Writes a program document, replacing the file atomically.
///
/// The JSON is written to a sibling temp file which is then renamed over
/// `path`, so readers never see a half-written document.
pub fn save_document<P: AsRef<Path>>(path: P, document: &ProgramDocument) -> Result<(), StoreError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| StoreError::CannotWrite(format!("{}: {}", path.display(), e)))?;

    let temp = temp_path(path);
    fs::write(&temp, json)
        .map_err(|e| StoreError::CannotWrite(format!("{}: {}", temp.display(), e)))?;
    fs::rename(&temp, path)
        .map_err(|e| StoreError::CannotWrite(format!("{}: {}", path.display(), e)))?;

    log::debug!("Saved document to {}", path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program.json".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Persistence boundary used by callers of the engine.
pub trait ProgramStore {
    fn load_profile(&self, profile_id: &str) -> Result<TrainingProfile, StoreError>;
    fn load_history(&self) -> Result<Vec<WorkoutSession>, StoreError>;
    fn save_profile(&self, profile: &TrainingProfile) -> Result<(), StoreError>;
    fn save_history(&self, history: &[WorkoutSession]) -> Result<(), StoreError>;
}

/// [`ProgramStore`] backed by a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<ProgramDocument, StoreError> {
        load_document(&self.path)
    }

    pub fn save(&self, document: &ProgramDocument) -> Result<(), StoreError> {
        save_document(&self.path, document)
    }

    /// Loads the document, or starts an empty one when the file is absent.
    fn load_or_new(&self) -> Result<ProgramDocument, StoreError> {
        match self.load() {
            Err(StoreError::FileNotFound(_)) => {
                Ok(ProgramDocument::new(TrainingProfile::new(ROOT_PROFILE_ID)))
            }
            other => other,
        }
    }
}

impl ProgramStore for JsonFileStore {
    fn load_profile(&self, profile_id: &str) -> Result<TrainingProfile, StoreError> {
        self.load()?.find_profile(profile_id).cloned()
    }

    fn load_history(&self) -> Result<Vec<WorkoutSession>, StoreError> {
        Ok(self.load()?.history)
    }

    fn save_profile(&self, profile: &TrainingProfile) -> Result<(), StoreError> {
        let mut document = self.load_or_new()?;
        document.upsert_profile(profile.clone());
        self.save(&document)
    }

    fn save_history(&self, history: &[WorkoutSession]) -> Result<(), StoreError> {
        let mut document = self.load_or_new()?;
        document.history = history.to_vec();
        self.save(&document)
    }
}

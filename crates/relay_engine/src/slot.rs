//! Same-origin storage slot that carries a prompt into a page before the
//! messaging channel is confirmed alive. Reading it clears it.
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("slot directory missing or not writable: {0}")]
    Dir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub trait PromptSlot: Send + Sync {
    fn put(&self, prompt: &str) -> Result<(), SlotError>;

    /// Reads and clears the slot.
    fn take(&self) -> Result<Option<String>, SlotError>;
}

#[derive(Debug, Default)]
pub struct MemoryPromptSlot {
    prompt: Mutex<Option<String>>,
}

impl MemoryPromptSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Mutex::new(Some(prompt.into())),
        }
    }
}

impl PromptSlot for MemoryPromptSlot {
    fn put(&self, prompt: &str) -> Result<(), SlotError> {
        *self.prompt.lock().unwrap_or_else(PoisonError::into_inner) = Some(prompt.to_string());
        Ok(())
    }

    fn take(&self) -> Result<Option<String>, SlotError> {
        Ok(self
            .prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take())
    }
}

/// One file per origin under `dir`, written atomically.
#[derive(Debug, Clone)]
pub struct FilePromptSlot {
    dir: PathBuf,
    filename: String,
}

impl FilePromptSlot {
    pub fn new(dir: PathBuf, origin: &str) -> Self {
        Self {
            dir,
            filename: slot_filename(origin),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }
}

impl PromptSlot for FilePromptSlot {
    fn put(&self, prompt: &str) -> Result<(), SlotError> {
        ensure_slot_dir(&self.dir)?;

        let target = self.path();
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(prompt.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| SlotError::Io(e.error))?;
        Ok(())
    }

    fn take(&self) -> Result<Option<String>, SlotError> {
        let target = self.path();
        let prompt = match fs::read_to_string(&target) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        fs::remove_file(&target)?;
        Ok(Some(prompt).filter(|text| !text.is_empty()))
    }
}

/// Ensure the slot directory exists; create if missing.
pub fn ensure_slot_dir(dir: &Path) -> Result<(), SlotError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| SlotError::Dir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(SlotError::Dir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| SlotError::Dir(e.to_string()))?;
    }
    Ok(())
}

fn slot_filename(origin: &str) -> String {
    let safe: String = origin
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{safe}.prompt")
}

#[cfg(test)]
mod tests {
    use super::slot_filename;

    #[test]
    fn origin_becomes_safe_filename() {
        assert_eq!(slot_filename("https://claude.ai/"), "claude.ai.prompt");
        assert_eq!(slot_filename("http://localhost:8080"), "localhost_8080.prompt");
    }
}

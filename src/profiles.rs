//! Settings profiles
//!
//! Save/load/list/delete `LinkSettings` as pretty-printed JSON files, one per
//! profile, in a directory chosen by the caller.

use std::path::{Path, PathBuf};

use crate::domain::{LinkSettings, PpmError, PpmResult};

/// Profile that always exists conceptually and cannot be deleted
pub const DEFAULT_PROFILE: &str = "Default";

/// Sanitize a profile name to prevent path traversal.
/// Rejects anything with path separators, "..", or empty strings.
fn sanitize_name(name: &str) -> PpmResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PpmError::Profile("Profile name cannot be empty".to_string()));
    }
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(PpmError::Profile("Invalid profile name".to_string()));
    }
    // Only allow alphanumeric, spaces, hyphens, underscores
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err(PpmError::Profile(
            "Profile name contains invalid characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Directory of JSON settings profiles
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Open (and create if needed) the profile directory
    pub fn open(dir: impl AsRef<Path>) -> PpmResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| PpmError::Profile(format!("Failed to create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Validate and write `settings` under `name`, replacing any existing profile
    pub fn save(&self, name: &str, settings: &LinkSettings) -> PpmResult<()> {
        let name = sanitize_name(name)?;
        settings.validate()?;
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| PpmError::Profile(format!("Serialization error: {e}")))?;
        std::fs::write(self.path_for(&name), json)
            .map_err(|e| PpmError::Profile(format!("Failed to write profile '{name}': {e}")))?;
        log::info!("Saved profile '{name}'");
        Ok(())
    }

    /// Read and validate the profile `name`. A missing `Default` profile
    /// yields the built-in defaults.
    pub fn load(&self, name: &str) -> PpmResult<LinkSettings> {
        let name = sanitize_name(name)?;
        let path = self.path_for(&name);
        if name == DEFAULT_PROFILE && !path.exists() {
            return Ok(LinkSettings::default());
        }
        let json = std::fs::read_to_string(&path)
            .map_err(|e| PpmError::Profile(format!("Failed to read profile '{name}': {e}")))?;
        let settings: LinkSettings = serde_json::from_str(&json)
            .map_err(|e| PpmError::Profile(format!("Failed to parse profile '{name}': {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Names of all saved profiles, sorted
    pub fn list(&self) -> PpmResult<Vec<String>> {
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)
            .map_err(|e| PpmError::Profile(format!("Failed to read profile dir: {e}")))?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                if path.extension()?.to_str()? == "json" {
                    path.file_stem()?.to_str().map(String::from)
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn delete(&self, name: &str) -> PpmResult<()> {
        let name = sanitize_name(name)?;
        if name == DEFAULT_PROFILE {
            return Err(PpmError::Profile(
                "Cannot delete the Default profile".to_string(),
            ));
        }
        let path = self.path_for(&name);
        if !path.exists() {
            return Err(PpmError::Profile(format!("Profile '{name}' not found")));
        }
        std::fs::remove_file(&path)
            .map_err(|e| PpmError::Profile(format!("Failed to delete profile '{name}': {e}")))
    }
}

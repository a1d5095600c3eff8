use crate::error::UpdateError;
use crate::resolver::DEFAULT_RESOURCE_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`UpdaterConfig::base_dir`].
pub const BASE_DIR_ENV: &str = "SHEETPATCH_BASE_DIR";
/// Environment variable overriding [`UpdaterConfig::resource_root`].
pub const RESOURCE_ROOT_ENV: &str = "SHEETPATCH_RESOURCE_ROOT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Xlsx,
    Json,
}

impl BackendKind {
    /// Guess from a file extension; anything unknown is treated as XLSX.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => BackendKind::Json,
            _ => BackendKind::Xlsx,
        }
    }
}

/// Updater settings, usually read from a YAML file.
///
/// ```yaml
/// base_dir: /srv/reports
/// resource_prefix: src/main/resources/
/// resource_root: templates
/// backend: xlsx
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct UpdaterConfig {
    /// Directory that relative destinations and template paths are joined to.
    /// Falls back to the working directory when unset.
    pub base_dir: Option<PathBuf>,
    pub resource_prefix: String,
    /// On-disk directory holding bundled templates. Relative to `base_dir`.
    pub resource_root: Option<PathBuf>,
    pub backend: BackendKind,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            resource_prefix: DEFAULT_RESOURCE_PREFIX.to_string(),
            resource_root: None,
            backend: BackendKind::default(),
        }
    }
}

impl UpdaterConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, UpdateError> {
        serde_yaml::from_str(yaml).map_err(|e| UpdateError::Config(e.to_string()))
    }

    pub fn from_yaml_reader<R: std::io::Read>(reader: R) -> Result<Self, UpdateError> {
        serde_yaml::from_reader(reader).map_err(|e| UpdateError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, UpdateError> {
        let file = std::fs::File::open(path).map_err(|e| UpdateError::io(path, e))?;
        serde_yaml::from_reader(file)
            .map_err(|e| UpdateError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(BASE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.base_dir = Some(PathBuf::from(dir));
        }
        if let Some(root) = lookup(RESOURCE_ROOT_ENV).filter(|v| !v.is_empty()) {
            self.resource_root = Some(PathBuf::from(root));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_with_defaults() {
        let cfg = UpdaterConfig::from_yaml_str("base_dir: /srv/out\nbackend: json\n").unwrap();
        assert_eq!(cfg.base_dir.as_deref(), Some(Path::new("/srv/out")));
        assert_eq!(cfg.backend, BackendKind::Json);
        assert_eq!(cfg.resource_prefix, DEFAULT_RESOURCE_PREFIX);
        assert_eq!(cfg.resource_root, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = UpdaterConfig::from_yaml_str("base_dri: /tmp\n").unwrap_err();
        assert!(matches!(err, UpdateError::Config(msg) if msg.contains("base_dri")));
    }

    #[test]
    fn env_overrides_win() {
        let cfg = UpdaterConfig {
            base_dir: Some("/from/file".into()),
            ..Default::default()
        }
        .with_overrides_from(|key| match key {
            BASE_DIR_ENV => Some("/from/env".into()),
            RESOURCE_ROOT_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(cfg.base_dir.as_deref(), Some(Path::new("/from/env")));
        assert_eq!(cfg.resource_root, None);
    }

    #[test]
    fn backend_from_extension() {
        assert_eq!(BackendKind::from_path(Path::new("a/b.JSON")), BackendKind::Json);
        assert_eq!(BackendKind::from_path(Path::new("a/b.xlsm")), BackendKind::Xlsx);
        assert_eq!(BackendKind::from_path(Path::new("noext")), BackendKind::Xlsx);
    }
}

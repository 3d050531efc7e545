use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_core::{AdapterRegistry, CoordinatorSettings, SiteAdapter};
use relay_engine::FillSettings;
use serde::{Deserialize, Serialize};

use crate::logging::LogDestination;

pub const DEFAULT_CONFIG_FILENAME: &str = "relay.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub dispatch_window_secs: u64,
    pub auto_send: bool,
    pub input_timeout_ms: u64,
    pub submit_timeout_ms: u64,
    /// Appended after the built-in sites.
    pub adapters: Vec<SiteAdapter>,
    pub log: LogDestination,
    /// Keeps per-origin storage slots as files here instead of in memory.
    pub slot_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let coordinator = CoordinatorSettings::default();
        let fill = FillSettings::default();
        Self {
            dispatch_window_secs: coordinator.dispatch_window.as_secs(),
            auto_send: coordinator.auto_send,
            input_timeout_ms: millis(fill.input_timeout),
            submit_timeout_ms: millis(fill.submit_timeout),
            adapters: Vec::new(),
            log: LogDestination::default(),
            slot_dir: None,
        }
    }
}

impl RelayConfig {
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            dispatch_window: Duration::from_secs(self.dispatch_window_secs),
            auto_send: self.auto_send,
        }
    }

    pub fn fill_settings(&self) -> FillSettings {
        FillSettings {
            input_timeout: Duration::from_millis(self.input_timeout_ms),
            submit_timeout: Duration::from_millis(self.submit_timeout_ms),
        }
    }

    pub fn registry(&self) -> AdapterRegistry {
        let mut registry = AdapterRegistry::builtin();
        registry.extend(self.adapters.iter().cloned());
        registry
    }
}

/// Reads the config file. Returns defaults plus a description of the problem
/// when the file exists but cannot be used; logging is not up yet at this point.
pub fn load(path: &Path) -> (RelayConfig, Option<String>) {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return (RelayConfig::default(), None);
        }
        Err(err) => {
            return (
                RelayConfig::default(),
                Some(format!("Failed to read config from {:?}: {}", path, err)),
            );
        }
    };

    match ron::from_str(&content) {
        Ok(config) => (config, None),
        Err(err) => (
            RelayConfig::default(),
            Some(format!("Failed to parse config from {:?}: {}", path, err)),
        ),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relay_core::{EditingModel, InputTarget};
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults_silently() {
        let dir = tempdir().unwrap();
        let (config, problem) = load(&dir.path().join(DEFAULT_CONFIG_FILENAME));

        assert_eq!(config, RelayConfig::default());
        assert_eq!(problem, None);
        assert_eq!(config.dispatch_window_secs, 30);
        assert_eq!(config.input_timeout_ms, 10_000);
        assert!(config.auto_send);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(
            &path,
            r#"(auto_send: false, dispatch_window_secs: 5, log: both, slot_dir: Some("slots"))"#,
        )
        .unwrap();

        let (config, problem) = load(&path);

        assert_eq!(problem, None);
        assert!(!config.auto_send);
        assert_eq!(config.log, LogDestination::Both);
        assert_eq!(config.slot_dir, Some(PathBuf::from("slots")));
        assert_eq!(
            config.coordinator_settings().dispatch_window,
            Duration::from_secs(5)
        );
        assert_eq!(config.fill_settings().submit_timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn malformed_file_falls_back_with_a_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(&path, "(auto_send: maybe").unwrap();

        let (config, problem) = load(&path);

        assert_eq!(config, RelayConfig::default());
        assert!(problem.unwrap().contains("Failed to parse config"));
    }

    #[test]
    fn extra_adapters_come_after_builtins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        let ron = r#"(
            adapters: [
                (
                    id: "mistral",
                    domain: "chat.mistral.ai",
                    inputs: [(selector: "textarea", model: value_assignment)],
                    submit: "button[type='submit']",
                ),
            ],
        )"#;
        fs::write(&path, ron).unwrap();

        let (config, problem) = load(&path);
        let registry = config.registry();

        assert_eq!(problem, None);
        let mistral = registry.resolve("chat.mistral.ai").expect("configured site");
        assert_eq!(
            mistral.inputs,
            vec![InputTarget::new("textarea", EditingModel::ValueAssignment)]
        );
        assert_eq!(mistral.notify, vec![relay_core::DomEvent::Input]);
        assert_eq!(
            registry.adapters().len(),
            AdapterRegistry::builtin().adapters().len() + 1
        );
    }
}

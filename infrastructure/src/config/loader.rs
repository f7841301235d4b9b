//! Configuration file loader with multi-source merging

use super::file_config::EngineFileConfig;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::path::PathBuf;

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Explicit config path (if provided)
    /// 2. Project root: `./parley.toml` or `./.parley.toml`
    /// 3. XDG config: `$XDG_CONFIG_HOME/parley/config.toml`
    /// 4. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<EngineFileConfig, Box<figment::Error>> {
        let mut figment =
            Figment::new().merge(Serialized::defaults(EngineFileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        for filename in &["parley.toml", ".parley.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
                break;
            }
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.extract().map_err(Box::new)
    }

    /// Load only default configuration
    pub fn load_defaults() -> EngineFileConfig {
        EngineFileConfig::default()
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("parley").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.engine.min_participants_to_start, 2);
        assert_eq!(config.bridge.outbound_topic, "discussion.events");
    }

    #[test]
    fn test_explicit_path_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[engine]\nmin_participants_to_start = 3\n\n[bridge]\ninbound_topic = \"custom.commands\""
        )
        .unwrap();

        let config = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(config.engine.min_participants_to_start, 3);
        assert_eq!(config.bridge.inbound_topic, "custom.commands");
        // Untouched keys keep their defaults
        assert_eq!(config.engine.default_turn_timeout_seconds, 300);
    }

    #[test]
    fn test_global_config_path_names_parley() {
        if let Some(path) = ConfigLoader::global_config_path() {
            assert!(path.to_string_lossy().contains("parley"));
        }
    }
}

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use engine_logging::{engine_info, engine_warn};
use harvester_engine::EngineConfig;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "harvester.ron";

/// Loads the engine configuration.
///
/// An explicit path must exist. Without one, `harvester.ron` is used when
/// present and the built-in defaults otherwise. Parse errors are always
/// reported.
pub fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound && explicit.is_none() => {
            engine_info!("No {} found, using default configuration", DEFAULT_CONFIG_FILE);
            return Ok(EngineConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read config {}", path.display()));
        }
    };

    let config: EngineConfig = ron::from_str(&content)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    if config.default_run.timeout_ms == 0 {
        engine_warn!("default_run.timeout_ms is 0; the default timeout will be used");
    }
    engine_info!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Pretty RON text of a configuration, suitable as a starting config file.
pub fn render_config(config: &EngineConfig) -> Result<String> {
    let pretty = ron::ser::PrettyConfig::new();
    ron::ser::to_string_pretty(config, pretty).context("Failed to serialize configuration")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use harvester_engine::Matcher;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.ron");
        fs::write(
            &path,
            r#"(
                runs_dir: "/srv/harvest",
                default_run: (delay_secs: 2),
                profile: (query_param: None, row_matcher: Css("ul.results li")),
            )"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.runs_dir, PathBuf::from("/srv/harvest"));
        assert_eq!(config.default_run.delay_secs, 2);
        assert_eq!(config.default_run.timeout_ms, 45_000);
        assert_eq!(config.profile.query_param, None);
        assert_eq!(config.profile.row_matcher, Matcher::css("ul.results li"));
        assert_eq!(config.retention_secs, 24 * 60 * 60);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = load_config(Some(&temp.path().join("absent.ron"))).unwrap_err();
        assert!(err.to_string().contains("absent.ron"), "{err}");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.ron");
        fs::write(&path, "(runs_dir: 42").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn rendered_defaults_load_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harvester.ron");
        let defaults = EngineConfig::default();
        fs::write(&path, render_config(&defaults).unwrap()).unwrap();

        assert_eq!(load_config(Some(&path)).unwrap(), defaults);
    }
}

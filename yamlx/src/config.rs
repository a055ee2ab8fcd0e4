//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/yamlx/yamlx.toml`
//! 3. Local config: `./.yamlx.toml` or the file given with `--config`
//! 4. Environment variables: `YAMLX_*` prefix
//! 5. Command line flags (applied by the CLI)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::DocumentFormat;
use crate::application::ApplicationError;
use crate::domain::{Detection, ResolveOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_EXPANSIONS};

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = ".yamlx.toml";

/// Unified configuration for yamlx.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Which string leaves count as expressions
    pub detection: Detection,
    /// Resolve expressions inside sequences too
    pub resolve_sequences: bool,
    /// Limit for chained variable references
    pub max_depth: usize,
    /// Limit for referenced expressions expanded by one leaf
    pub max_expansions: usize,
    /// Format used when printing resolved documents
    pub output_format: DocumentFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detection: Detection::Loose,
            resolve_sequences: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            output_format: DocumentFormat::Yaml,
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub detection: Option<Detection>,
    pub resolve_sequences: Option<bool>,
    pub max_depth: Option<usize>,
    pub max_expansions: Option<usize>,
    pub output_format: Option<DocumentFormat>,
}

/// Get the XDG config directory for yamlx.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "yamlx").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("yamlx.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins where it says something; otherwise keep self.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            detection: overlay.detection.unwrap_or(self.detection),
            resolve_sequences: overlay.resolve_sequences.unwrap_or(self.resolve_sequences),
            max_depth: overlay.max_depth.unwrap_or(self.max_depth),
            max_expansions: overlay.max_expansions.unwrap_or(self.max_expansions),
            output_format: overlay.output_format.unwrap_or(self.output_format),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_file` - Optional local config file; a missing file is skipped
    pub fn load(local_file: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config
        if let Some(local_path) = local_file {
            if local_path.exists() {
                let raw = load_raw_settings(local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables
        Self::apply_env_overrides(current)
    }

    /// Apply YAMLX_* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("YAMLX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        Self::apply_overrides(settings, &config)
    }

    /// Overlay every key present in `config`. A key that is set but does
    /// not read as its type is an error.
    fn apply_overrides(mut settings: Self, config: &Config) -> Result<Self, ApplicationError> {
        if let Some(val) = present(config.get_string("detection"), "detection")? {
            settings.detection = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Some(val) = present(config.get_bool("resolve_sequences"), "resolve_sequences")? {
            settings.resolve_sequences = val;
        }
        if let Some(val) = present(config.get_int("max_depth"), "max_depth")? {
            settings.max_depth = non_negative(val, "max_depth")?;
        }
        if let Some(val) = present(config.get_int("max_expansions"), "max_expansions")? {
            settings.max_expansions = non_negative(val, "max_expansions")?;
        }
        if let Some(val) = present(config.get_string("output_format"), "output_format")? {
            settings.output_format = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }

        Ok(settings)
    }

    /// Options for the domain resolver.
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            detection: self.detection,
            resolve_sequences: self.resolve_sequences,
            max_depth: self.max_depth,
            max_expansions: self.max_expansions,
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# yamlx configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/yamlx/yamlx.toml
#   Local:  ./.yamlx.toml (or --config FILE)
#   Env:    YAMLX_* environment variables
#   Flags:  --strict, --sequences, --max-depth, --max-expansions, --format

# Which strings are expressions:
#   "loose"  - anything containing $ + - * / % (hyphenated words fail to parse)
#   "strict" - strings with ${...}, or made only of numbers and operators
# detection = "loose"

# Resolve expressions inside lists as well
# resolve_sequences = false

# How many variable references deep a chain of expressions may go
# max_depth = 64

# How many referenced expressions one value may expand in total
# max_expansions = 10000

# Output format for `yamlx resolve`: "yaml" or "json"
# output_format = "yaml"
"#
        .to_string()
    }
}

/// `None` if `key` is unset; any other lookup failure is a config error.
fn present<T>(result: Result<T, ConfigError>, key: &str) -> Result<Option<T>, ApplicationError> {
    match result {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ApplicationError::Config {
            message: format!("YAMLX_{}: {}", key.to_ascii_uppercase(), e),
        }),
    }
}

fn non_negative(val: i64, key: &str) -> Result<usize, ApplicationError> {
    usize::try_from(val).map_err(|_| ApplicationError::Config {
        message: format!("YAMLX_{} must not be negative: {val}", key.to_ascii_uppercase()),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn given_default_settings_when_converting_then_matches_resolver_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.resolve_options(), ResolveOptions::default());
        assert_eq!(settings.output_format, DocumentFormat::Yaml);
    }

    #[test]
    fn given_partial_overlay_when_merging_then_only_specified_fields_change() {
        let base = Settings::default();
        let overlay = RawSettings {
            detection: Some(Detection::Strict),
            max_depth: Some(8),
            ..Default::default()
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.detection, Detection::Strict);
        assert_eq!(merged.max_depth, 8);
        assert!(!merged.resolve_sequences);
        assert_eq!(merged.output_format, DocumentFormat::Yaml);
    }

    #[test]
    fn given_local_file_when_loading_then_applies_it() {
        let dir = TempDir::new().unwrap();
        let path = local_config_path(dir.path());
        std::fs::write(
            &path,
            "resolve_sequences = true\noutput_format = \"json\"\n",
        )
        .unwrap();

        let settings = Settings::load(Some(path.as_path())).expect("load settings");

        assert!(settings.resolve_sequences);
        assert_eq!(settings.output_format, DocumentFormat::Json);
    }

    #[test]
    fn given_invalid_local_file_when_loading_then_config_error() {
        let dir = TempDir::new().unwrap();
        let path = local_config_path(dir.path());
        std::fs::write(&path, "detection = \"eager\"\n").unwrap();

        let err = Settings::load(Some(path.as_path())).unwrap_err();

        assert!(matches!(err, ApplicationError::Config { .. }));
    }

    #[test]
    fn given_settings_when_serializing_then_toml_round_trips() {
        let settings = Settings {
            detection: Detection::Strict,
            resolve_sequences: true,
            max_depth: 3,
            max_expansions: 50,
            output_format: DocumentFormat::Json,
        };

        let text = settings.to_toml().unwrap();
        let raw: RawSettings = toml::from_str(&text).unwrap();

        assert_eq!(Settings::default().merge_with(&raw), settings);
    }

    fn overrides(pairs: &[(&str, &str)]) -> Config {
        pairs
            .iter()
            .fold(Config::builder(), |builder, (key, val)| {
                builder.set_override(*key, *val).unwrap()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn given_valid_overrides_when_applying_then_all_fields_set() {
        let config = overrides(&[
            ("detection", "strict"),
            ("resolve_sequences", "true"),
            ("max_depth", "7"),
            ("max_expansions", "99"),
            ("output_format", "json"),
        ]);

        let settings = Settings::apply_overrides(Settings::default(), &config).unwrap();

        assert_eq!(
            settings,
            Settings {
                detection: Detection::Strict,
                resolve_sequences: true,
                max_depth: 7,
                max_expansions: 99,
                output_format: DocumentFormat::Json,
            }
        );
    }

    #[test]
    fn given_no_overrides_when_applying_then_settings_unchanged() {
        let settings = Settings::apply_overrides(Settings::default(), &overrides(&[])).unwrap();

        assert_eq!(settings, Settings::default());
    }

    #[rstest]
    #[case("detection", "eager")]
    #[case("resolve_sequences", "abc")]
    #[case("max_depth", "abc")]
    #[case("max_depth", "-1")]
    #[case("max_expansions", "lots")]
    #[case("output_format", "toml")]
    fn given_unreadable_override_when_applying_then_config_error(
        #[case] key: &str,
        #[case] val: &str,
    ) {
        let err = Settings::apply_overrides(Settings::default(), &overrides(&[(key, val)]))
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Config { .. }), "{key}={val}");
    }

    #[test]
    fn given_template_when_parsing_then_is_valid_empty_config() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();

        assert_eq!(Settings::default().merge_with(&raw), Settings::default());
    }
}

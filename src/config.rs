use serde::{Deserialize, Deserializer};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::ConfigError;
use crate::materializer::{DEFAULT_NAME_LENGTH, DEFAULT_SAFETY_MARGIN};

/// Settings file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "uniquegen.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub generation: GenerationSettings,
    pub space: SpaceSettings,
    pub warnings: WarningSettings,
    pub logging: LogSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub name_length: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpaceSettings {
    pub check: bool,
    #[serde(deserialize_with = "size_field")]
    pub safety_margin: u64,
}

/// Thresholds above which the CLI asks before starting.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WarningSettings {
    pub file_count: u64,
    #[serde(deserialize_with = "size_field")]
    pub file_size: u64,
    pub delay_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub directory: Option<PathBuf>,
    pub json: bool,
    pub level: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            name_length: DEFAULT_NAME_LENGTH,
        }
    }
}

impl Default for SpaceSettings {
    fn default() -> Self {
        SpaceSettings {
            check: true,
            safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }
}

impl Default for WarningSettings {
    fn default() -> Self {
        WarningSettings {
            file_count: 50_000,
            file_size: 100_000_000,
            delay_ms: 60_000,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            directory: None,
            json: false,
            level: "warn".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(config_str)?)
    }

    /// Loads `path` if given, otherwise [`DEFAULT_CONFIG_FILE`] when it exists,
    /// otherwise the built-in defaults. An explicitly named file must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::load(default_path)
                } else {
                    Ok(Settings::default())
                }
            }
        }
    }
}

fn size_field<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Bytes(u64),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Bytes(bytes) => Ok(bytes),
        Size::Text(text) => parse_size(&text).map_err(serde::de::Error::custom),
    }
}

/// Parses a byte count such as `1000`, `1,000`, `500KB`, `1.5MB` or `2GB`.
/// Units are decimal.
pub fn parse_size(size_str: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidSize {
        value: size_str.to_string(),
    };

    let normalized = size_str.trim().replace(',', "").to_uppercase();
    let (number, multiplier) = if let Some(stripped) = normalized.strip_suffix("GB") {
        (stripped, 1_000_000_000)
    } else if let Some(stripped) = normalized.strip_suffix("MB") {
        (stripped, 1_000_000)
    } else if let Some(stripped) = normalized.strip_suffix("KB") {
        (stripped, 1_000)
    } else if let Some(stripped) = normalized.strip_suffix('B') {
        (stripped, 1)
    } else {
        // assume its given in bytes already
        (normalized.as_str(), 1)
    };

    let number = number.trim();
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_value: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let mut bytes = whole_value.checked_mul(multiplier).ok_or_else(invalid)?;

    // fractional digits beyond the unit's precision are dropped
    let mut scale = multiplier;
    for digit in fraction.chars() {
        scale /= 10;
        if scale == 0 {
            break;
        }
        let value = u64::from(digit.to_digit(10).unwrap_or(0));
        bytes = bytes.checked_add(value * scale).ok_or_else(invalid)?;
    }

    Ok(bytes)
}

/// Parses the file count argument, ignoring thousands separators.
pub fn parse_count(count_str: &str) -> Result<u64, ConfigError> {
    let invalid = |reason| ConfigError::InvalidCount {
        value: count_str.to_string(),
        reason,
    };

    let digits = count_str.trim().replace(',', "");
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a whole number"));
    }

    match digits.parse::<u64>() {
        Ok(0) => Err(invalid("must be at least 1")),
        Ok(count) => Ok(count),
        Err(_) => Err(invalid("too large")),
    }
}

/// Appends a space separator unless the prefix is empty or already ends in
/// a non-alphanumeric character such as `-` or `_`.
pub fn normalize_prefix(prefix: &str) -> String {
    match prefix.chars().last() {
        Some(last) if last.is_alphanumeric() => format!("{prefix} "),
        _ => prefix.to_string(),
    }
}

/// Ensures a non-empty extension starts with exactly one `.`.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1GB").unwrap(), 1_000_000_000);
        assert_eq!(parse_size("500MB").unwrap(), 500_000_000);
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1,000").unwrap(), 1000);
        assert_eq!(parse_size("1.5kb").unwrap(), 1500);
        assert_eq!(parse_size("0.5GB").unwrap(), 500_000_000);
        assert_eq!(parse_size("12B").unwrap(), 12);
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("MB").is_err());
        assert!(parse_size("-5").is_err());
        assert!(parse_size("ten").is_err());
        assert!(parse_size("99999999999999999999GB").is_err());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("10").unwrap(), 10);
        assert_eq!(parse_count("1,000").unwrap(), 1000);

        match parse_count("0") {
            Err(ConfigError::InvalidCount { reason, .. }) => assert_eq!(reason, "must be at least 1"),
            other => panic!("unexpected {other:?}"),
        }
        match parse_count("99999999999999999999999") {
            Err(ConfigError::InvalidCount { reason, .. }) => assert_eq!(reason, "too large"),
            other => panic!("unexpected {other:?}"),
        }
        match parse_count("12a") {
            Err(ConfigError::InvalidCount { reason, .. }) => assert_eq!(reason, "not a whole number"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("TEST"), "TEST ");
        assert_eq!(normalize_prefix("TEST-"), "TEST-");
        assert_eq!(normalize_prefix("draft_"), "draft_");
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(""), "");
        assert_eq!(normalize_extension("txt"), ".txt");
        assert_eq!(normalize_extension(".txt"), ".txt");
        assert_eq!(normalize_extension("..md"), ".md");
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.generation.name_length, 10);
        assert!(settings.space.check);
        assert_eq!(settings.space.safety_margin, 500_000_000);
        assert!(settings.logging.directory.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[generation]
name_length = 16

[space]
safety_margin = "1GB"

[warnings]
file_size = 2048
"#
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.generation.name_length, 16);
        assert_eq!(settings.space.safety_margin, 1_000_000_000);
        assert!(settings.space.check);
        assert_eq!(settings.warnings.file_size, 2048);
        assert_eq!(settings.warnings.file_count, 50_000);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let settings = Settings::from_toml(include_str!("../uniquegen.toml.example")).unwrap();
        let defaults = Settings::default();
        assert_eq!(settings.generation.name_length, defaults.generation.name_length);
        assert_eq!(settings.space.safety_margin, defaults.space.safety_margin);
        assert_eq!(settings.warnings.file_size, defaults.warnings.file_size);
        assert_eq!(settings.logging.level, defaults.logging.level);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        assert!(matches!(
            Settings::from_toml("[space]\nsafety_margin = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Settings::load(Path::new("definitely/not/here.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}

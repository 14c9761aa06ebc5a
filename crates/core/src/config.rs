//! Loading task options from configuration files
//!
//! Options structs derive `Deserialize`; this module picks the parser from
//! the file extension (`.toml`, `.yaml`/`.yml`, `.json`).

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Supported configuration syntaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(ConfigFormat::Toml),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(Error::Config(format!(
                "Cannot infer config format from {}",
                path.display()
            ))),
        }
    }
}

/// Parse configuration text
pub fn parse_str<T: DeserializeOwned>(text: &str, format: ConfigFormat) -> Result<T> {
    let value = match format {
        ConfigFormat::Toml => toml::from_str(text)?,
        ConfigFormat::Yaml => serde_yaml::from_str(text)?,
        ConfigFormat::Json => serde_json::from_str(text)?,
    };
    Ok(value)
}

/// Read and parse a configuration file
pub fn load_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    tracing::debug!("Loading {:?} config from {}", format, path.display());
    parse_str(&text, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        count: u32,
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
    }

    #[test]
    fn test_parse_each_format() {
        let toml: Sample = parse_str("name = \"x\"\ncount = 2", ConfigFormat::Toml).unwrap();
        let yaml: Sample = parse_str("name: x\ncount: 2", ConfigFormat::Yaml).unwrap();
        let json: Sample = parse_str(r#"{"name":"x","count":2}"#, ConfigFormat::Json).unwrap();
        assert_eq!(toml, yaml);
        assert_eq!(yaml, json);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "name: from-disk").unwrap();
        let sample: Sample = load_file(file.path()).unwrap();
        assert_eq!(sample.name, "from-disk");
        assert_eq!(sample.count, 0);
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = parse_str::<Sample>("name = ", ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive; values are returned as
//! written. Typed parsing happens in `domain::config_validation`.

use crate::domain::error::FractalTraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
    source: String,
}

impl FileConfigAdapter {
    pub fn from_file(path: &Path) -> Result<Self, FractalTraderError> {
        let source = path.display().to_string();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| FractalTraderError::ConfigParse {
            file: source.clone(),
            reason,
        })?;
        Ok(Self { config, source })
    }

    pub fn from_string(content: &str) -> Result<Self, FractalTraderError> {
        let source = "<inline>".to_string();
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| FractalTraderError::ConfigParse {
                file: source.clone(),
                reason,
            })?;
        Ok(Self { config, source })
    }

    /// File path the configuration was loaded from, or `<inline>`.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn keys(&self, section: &str) -> Vec<String> {
        self.config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[strategy]
ema_period = 200
Fractal_Mode = Causal

[backtest]
data_path = data/klines.csv
commission_policy =
"#;

    #[test]
    fn values_keep_their_case() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("strategy", "fractal_mode"), Some("Causal".to_string()));
        assert_eq!(adapter.get_string("STRATEGY", "ema_period"), Some("200".to_string()));
        assert_eq!(adapter.source(), "<inline>");
    }

    #[test]
    fn missing_keys_and_sections_are_none() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("analytics", "risk_free_rate"), None);
    }

    #[test]
    fn blank_value_is_absent() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_optional_string("backtest", "commission_policy"), None);
        assert_eq!(
            adapter.get_optional_string("backtest", "data_path"),
            Some("data/klines.csv".to_string())
        );
    }

    #[test]
    fn keys_lists_a_section() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        let mut keys = adapter.keys("strategy");
        keys.sort();
        assert_eq!(keys, vec!["ema_period", "fractal_mode"]);
        assert!(adapter.keys("analytics").is_empty());
    }

    #[test]
    fn from_file_records_its_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[analytics]\nrisk_free_rate = 0.03\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("analytics", "risk_free_rate"), Some("0.03".to_string()));
        assert_eq!(adapter.source(), file.path().display().to_string());
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = FileConfigAdapter::from_file(Path::new("/nonexistent/path/config.ini")).err().unwrap();
        match err {
            FractalTraderError::ConfigParse { file, .. } => assert_eq!(file, "/nonexistent/path/config.ini"),
            other => panic!("unexpected error {:?}", other),
        }
    }
}

use crate::adapters::{ConfiguredCatalog, InMemoryCatalog, PostgrestCatalog};
use crate::config::{CliConfig, DEFAULT_CONCURRENT_REQUESTS};
use crate::domain::model::{DEFAULT_HORIZON, MAX_HORIZON};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, WaterfallError};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CATALOG_POSTGREST: &str = "postgrest";
pub const CATALOG_MEMORY: &str = "memory";
const VALID_FORMATS: [&str; 2] = ["csv", "json"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub scenario: Option<ScenarioConfig>,
    pub catalog: CatalogConfig,
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: Option<String>,
    pub horizon: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub r#type: String,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub concurrent_requests: Option<usize>,
    pub fixture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: Option<String>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            scenario: None,
            catalog: CatalogConfig {
                r#type: CATALOG_MEMORY.to_string(),
                endpoint: None,
                api_key: None,
                timeout_seconds: None,
                concurrent_requests: None,
                fixture: None,
            },
            output: OutputConfig {
                output_path: "./output".to_string(),
                output_formats: vec!["csv".to_string(), "json".to_string()],
                compression: None,
            },
            logging: None,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(WaterfallError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| WaterfallError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SUPABASE_KEY})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| WaterfallError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 套用命令列覆蓋設定
    pub fn apply_overrides(&mut self, cli: &CliConfig) {
        if let Some(endpoint) = &cli.catalog_endpoint {
            self.catalog.r#type = CATALOG_POSTGREST.to_string();
            self.catalog.endpoint = Some(endpoint.clone());
        }
        if let Some(fixture) = &cli.fixture {
            self.catalog.r#type = CATALOG_MEMORY.to_string();
            self.catalog.fixture = Some(fixture.clone());
        }
        if let Some(api_key) = &cli.api_key {
            self.catalog.api_key = Some(api_key.clone());
        }
        if let Some(concurrent) = cli.concurrent_requests {
            self.catalog.concurrent_requests = Some(concurrent);
        }
        if let Some(output_path) = &cli.output_path {
            self.output.output_path = output_path.clone();
        }
        if !cli.formats.is_empty() {
            self.output.output_formats = cli.formats.clone();
        }
        if let Some(archive) = &cli.zip {
            self.output.compression = Some(CompressionConfig {
                enabled: true,
                filename: archive.clone(),
            });
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        use crate::utils::validation::{
            validate_non_empty_string, validate_path, validate_positive_number, validate_range,
            validate_required_field, validate_url,
        };

        match self.catalog.r#type.as_str() {
            CATALOG_POSTGREST => {
                let endpoint = validate_required_field("catalog.endpoint", &self.catalog.endpoint)?;
                validate_url("catalog.endpoint", endpoint)?;
            }
            CATALOG_MEMORY => {
                let fixture = validate_required_field("catalog.fixture", &self.catalog.fixture)?;
                validate_path("catalog.fixture", fixture)?;
            }
            other => {
                return Err(WaterfallError::InvalidConfigValueError {
                    field: "catalog.type".to_string(),
                    value: other.to_string(),
                    reason: format!(
                        "Unsupported catalog. Valid types: {}, {}",
                        CATALOG_POSTGREST, CATALOG_MEMORY
                    ),
                })
            }
        }

        if let Some(concurrent) = self.catalog.concurrent_requests {
            validate_positive_number("catalog.concurrent_requests", concurrent, 1)?;
        }

        validate_path("output.output_path", &self.output.output_path)?;

        if self.output.output_formats.is_empty() {
            return Err(WaterfallError::MissingConfigError {
                field: "output.output_formats".to_string(),
            });
        }
        for format in &self.output.output_formats {
            if !VALID_FORMATS.contains(&format.as_str()) {
                return Err(WaterfallError::InvalidConfigValueError {
                    field: "output.output_formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        VALID_FORMATS.join(", ")
                    ),
                });
            }
        }

        if let Some(compression) = self.output.compression.as_ref().filter(|c| c.enabled) {
            validate_non_empty_string("output.compression.filename", &compression.filename)?;
        }

        if let Some(horizon) = self.scenario.as_ref().and_then(|s| s.horizon) {
            validate_range("scenario.horizon", horizon, 1, MAX_HORIZON)?;
        }

        Ok(())
    }

    /// 依設定建立 SKU 目錄
    pub fn build_catalog(&self) -> Result<ConfiguredCatalog> {
        match self.catalog.r#type.as_str() {
            CATALOG_POSTGREST => {
                let endpoint = self.catalog.endpoint.clone().ok_or_else(|| {
                    WaterfallError::MissingConfigError {
                        field: "catalog.endpoint".to_string(),
                    }
                })?;
                let mut catalog = PostgrestCatalog::new(endpoint);
                if let Some(api_key) = &self.catalog.api_key {
                    catalog = catalog.with_api_key(api_key.clone());
                }
                if let Some(timeout) = self.catalog.timeout_seconds {
                    catalog = catalog.with_timeout(Duration::from_secs(timeout));
                }
                Ok(ConfiguredCatalog::Postgrest(catalog))
            }
            CATALOG_MEMORY => {
                let fixture = self.catalog.fixture.as_deref().ok_or_else(|| {
                    WaterfallError::MissingConfigError {
                        field: "catalog.fixture".to_string(),
                    }
                })?;
                Ok(ConfiguredCatalog::Memory(InMemoryCatalog::from_json_file(fixture)?))
            }
            other => Err(WaterfallError::ConfigError {
                message: format!("Unsupported catalog type: {}", other),
            }),
        }
    }

    /// 取得情境名稱
    pub fn scenario_name(&self) -> Option<&str> {
        self.scenario.as_ref().and_then(|s| s.name.as_deref())
    }

    /// 取得預測月數
    pub fn horizon(&self) -> u32 {
        self.scenario
            .as_ref()
            .and_then(|s| s.horizon)
            .unwrap_or(DEFAULT_HORIZON)
    }

    /// 是否使用 JSON 日誌格式
    pub fn json_logging(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn catalog_endpoint(&self) -> &str {
        match self.catalog.r#type.as_str() {
            CATALOG_MEMORY => self.catalog.fixture.as_deref().unwrap_or(""),
            _ => self.catalog.endpoint.as_deref().unwrap_or(""),
        }
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.output_formats
    }

    fn concurrent_requests(&self) -> usize {
        self.catalog.concurrent_requests.unwrap_or(DEFAULT_CONCURRENT_REQUESTS)
    }

    fn archive_name(&self) -> Option<&str> {
        self.output
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[scenario]
name = "r10-waterfall"
horizon = 24

[catalog]
type = "postgrest"
endpoint = "https://project.supabase.co/rest/v1"
timeout_seconds = 10
concurrent_requests = 2

[output]
output_path = "./test-output"
output_formats = ["csv", "json"]

[output.compression]
enabled = true
filename = "report.zip"

[logging]
format = "json"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.scenario_name(), Some("r10-waterfall"));
        assert_eq!(config.horizon(), 24);
        assert_eq!(config.catalog_endpoint(), "https://project.supabase.co/rest/v1");
        assert_eq!(config.concurrent_requests(), 2);
        assert_eq!(config.archive_name(), Some("report.zip"));
        assert!(config.json_logging());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_WATERFALL_CATALOG", "https://test.supabase.co/rest/v1");

        let toml_content = r#"
[catalog]
type = "postgrest"
endpoint = "${TEST_WATERFALL_CATALOG}"
api_key = "${TEST_WATERFALL_UNSET_KEY}"

[output]
output_path = "./output"
output_formats = ["csv"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.catalog.endpoint.as_deref(),
            Some("https://test.supabase.co/rest/v1")
        );
        assert_eq!(
            config.catalog.api_key.as_deref(),
            Some("${TEST_WATERFALL_UNSET_KEY}")
        );
        assert_eq!(config.horizon(), 36);

        std::env::remove_var("TEST_WATERFALL_CATALOG");
    }

    #[test]
    fn test_config_validation() {
        let invalid_endpoint = r#"
[catalog]
type = "postgrest"
endpoint = "invalid-url"

[output]
output_path = "./output"
output_formats = ["csv"]
"#;
        let config = TomlConfig::from_toml_str(invalid_endpoint).unwrap();
        assert!(config.validate().is_err());

        let missing_fixture = r#"
[catalog]
type = "memory"

[output]
output_path = "./output"
output_formats = ["csv"]
"#;
        let config = TomlConfig::from_toml_str(missing_fixture).unwrap();
        assert!(matches!(
            config.validate(),
            Err(WaterfallError::MissingConfigError { .. })
        ));

        let bad_format = r#"
[catalog]
type = "memory"
fixture = "catalog.json"

[output]
output_path = "./output"
output_formats = ["xlsx"]
"#;
        let config = TomlConfig::from_toml_str(bad_format).unwrap();
        assert!(matches!(
            config.validate(),
            Err(WaterfallError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_horizon_range() {
        let mut config = TomlConfig::default();
        config.catalog.fixture = Some("catalog.json".to_string());
        config.scenario = Some(ScenarioConfig {
            name: None,
            horizon: Some(0),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = TomlConfig::default();
        let cli = CliConfig {
            catalog_endpoint: Some("https://override.example.com/rest/v1".to_string()),
            fixture: None,
            api_key: Some("key".to_string()),
            concurrent_requests: Some(8),
            output_path: Some("/tmp/reports".to_string()),
            formats: vec!["json".to_string()],
            zip: Some("bundle.zip".to_string()),
        };

        config.apply_overrides(&cli);

        assert_eq!(config.catalog.r#type, CATALOG_POSTGREST);
        assert_eq!(config.concurrent_requests(), 8);
        assert_eq!(config.output_path(), "/tmp/reports");
        assert_eq!(config.output_formats(), &["json".to_string()]);
        assert_eq!(config.archive_name(), Some("bundle.zip"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[scenario]
name = "file-test"

[catalog]
type = "memory"
fixture = "catalog.json"

[output]
output_path = "./output"
output_formats = ["json"]
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.scenario_name(), Some("file-test"));
        assert_eq!(config.catalog_endpoint(), "catalog.json");
    }
}

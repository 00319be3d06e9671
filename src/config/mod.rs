pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub use toml_config::TomlConfig;

pub const DEFAULT_OUTPUT_PATH: &str = "./output";
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 4;

static DEFAULT_FORMATS: LazyLock<Vec<String>> =
    LazyLock::new(|| vec!["csv".to_string(), "json".to_string()]);

/// Command-line knobs for one-off runs. Every flag is optional so the same
/// struct can override a TOML file or stand on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct CliConfig {
    /// PostgREST endpoint, e.g. https://<project>.supabase.co/rest/v1
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub catalog_endpoint: Option<String>,

    /// JSON fixture for the in-memory catalog
    #[cfg_attr(feature = "cli", arg(long, global = true, conflicts_with = "catalog_endpoint"))]
    pub fixture: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub api_key: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub concurrent_requests: Option<usize>,

    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub output_path: Option<String>,

    /// Output formats (csv, json)
    #[cfg_attr(feature = "cli", arg(long = "format", global = true, value_delimiter = ','))]
    pub formats: Vec<String>,

    /// Bundle all outputs into this ZIP archive
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub zip: Option<String>,
}

impl ConfigProvider for CliConfig {
    fn catalog_endpoint(&self) -> &str {
        self.catalog_endpoint
            .as_deref()
            .or(self.fixture.as_deref())
            .unwrap_or("")
    }

    fn output_path(&self) -> &str {
        self.output_path.as_deref().unwrap_or(DEFAULT_OUTPUT_PATH)
    }

    fn output_formats(&self) -> &[String] {
        if self.formats.is_empty() {
            DEFAULT_FORMATS.as_slice()
        } else {
            self.formats.as_slice()
        }
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
            .unwrap_or(DEFAULT_CONCURRENT_REQUESTS)
            .max(1)
    }

    fn archive_name(&self) -> Option<&str> {
        self.zip.as_deref()
    }
}

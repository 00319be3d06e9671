pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{ConfiguredCatalog, InMemoryCatalog, LocalStorage, PostgrestCatalog};
pub use app::ReportExporter;
pub use config::{CliConfig, TomlConfig};
pub use core::WaterfallEngine;
pub use domain::model::{ScenarioRequest, WaterfallReport};
pub use utils::error::{Result, WaterfallError};

pub mod cogs;
pub mod expander;
pub mod metrics;
pub mod revenue;
pub mod waterfall;

pub use crate::domain::model::{MonthSeries, WaterfallReport};
pub use crate::domain::ports::{ConfigProvider, SkuCatalog, Storage};
pub use crate::utils::error::Result;
pub use waterfall::WaterfallEngine;

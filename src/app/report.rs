use crate::domain::model::WaterfallReport;
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::{Result, WaterfallError};
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const CSV_FILENAME: &str = "waterfall.csv";
pub const JSON_FILENAME: &str = "waterfall.json";

/// One CSV line per month. Amounts are written as plain decimals next to
/// their display strings.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    month: u32,
    revenue: String,
    cogs: String,
    gross_income: String,
    margin_percent: Option<f64>,
    cumulative_gross_profit: String,
    formatted_revenue: &'a str,
    formatted_cogs: &'a str,
    formatted_gross_income: &'a str,
    formatted_margin: &'a str,
    formatted_cumulative_gross_profit: &'a str,
}

/// Writes a `WaterfallReport` to storage as CSV and/or JSON, optionally bundled
/// into a single ZIP archive.
pub struct ReportExporter<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ReportExporter<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    /// 匯出報表，回傳主要輸出檔案的路徑
    pub async fn export(&self, report: &WaterfallReport) -> Result<String> {
        let files = self.render(report)?;
        let output_path = self.config.output_path();

        if let Some(archive_name) = self.config.archive_name() {
            tracing::debug!("Creating ZIP file with {} files", files.len());
            let zip_data = bundle(&files)?;

            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(archive_name, &zip_data).await?;

            let path = format!("{}/{}", output_path, archive_name);
            tracing::info!("💾 Report archived to {}", path);
            return Ok(path);
        }

        for (filename, data) in &files {
            tracing::debug!("Writing {} ({} bytes) to storage", filename, data.len());
            self.storage.write_file(filename, data).await?;
        }

        let primary = files
            .first()
            .map(|(filename, _)| format!("{}/{}", output_path, filename))
            .ok_or_else(|| WaterfallError::MissingConfigError {
                field: "output.output_formats".to_string(),
            })?;

        tracing::info!("💾 Report written to {}", primary);
        Ok(primary)
    }

    fn render(&self, report: &WaterfallReport) -> Result<Vec<(&'static str, Vec<u8>)>> {
        self.config
            .output_formats()
            .iter()
            .map(|format| match format.as_str() {
                "csv" => Ok((CSV_FILENAME, render_csv(report)?)),
                "json" => Ok((JSON_FILENAME, serde_json::to_vec_pretty(report)?)),
                other => Err(WaterfallError::InvalidConfigValueError {
                    field: "output.output_formats".to_string(),
                    value: other.to_string(),
                    reason: "Unsupported format. Valid formats: csv, json".to_string(),
                }),
            })
            .collect()
    }
}

pub fn render_csv(report: &WaterfallReport) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let rows = report
        .monthly_details
        .iter()
        .zip(&report.monthly_cogs_details)
        .zip(&report.monthly_gross_income_details)
        .zip(&report.monthly_profit_margin_details)
        .zip(&report.monthly_cumulative_gross_profit_details);

    for ((((revenue, cogs), gross), margin), cumulative) in rows {
        writer.serialize(CsvRow {
            month: revenue.month,
            revenue: revenue.total.to_string(),
            cogs: cogs.total.to_string(),
            gross_income: gross.total.to_string(),
            margin_percent: margin.margin_percent,
            cumulative_gross_profit: cumulative.total.to_string(),
            formatted_revenue: &revenue.formatted_total,
            formatted_cogs: &cogs.formatted_total,
            formatted_gross_income: &gross.formatted_total,
            formatted_margin: &margin.formatted_margin,
            formatted_cumulative_gross_profit: &cumulative.formatted_total,
        })?;
    }

    writer
        .into_inner()
        .map_err(|e| WaterfallError::IoError(e.into_error()))
}

fn bundle(files: &[(&str, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (filename, data) in files {
        zip.start_file::<_, ()>(*filename, FileOptions::default())?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

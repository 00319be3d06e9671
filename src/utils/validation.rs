use crate::domain::model::{RevenueSkuRule, ScenarioRequest, MAX_HORIZON};
use crate::utils::error::{Result, WaterfallError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid_value(field_name: &str, value: impl ToString, reason: impl Into<String>) -> WaterfallError {
    WaterfallError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Only `http` and `https` endpoints are accepted.
pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid_value(field_name, url_str, "URL cannot be empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid_value(field_name, url_str, format!("Invalid URL format: {}", e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid_value(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", scheme),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid_value(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid_value(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid_value(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| WaterfallError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid_value(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid_value(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn invalid_request(message: String) -> WaterfallError {
    WaterfallError::ValidationError { message }
}

/// 請求檢查：至少一個 SKU、sku_id 非空、start_month 從 1 開始、horizon 不超過 MAX_HORIZON。數量不檢查 (負數視為退貨)
impl Validate for ScenarioRequest {
    fn validate(&self) -> Result<()> {
        if self.skus.is_empty() {
            return Err(invalid_request(format!(
                "Scenario '{}' must contain at least one SKU",
                self.name
            )));
        }

        for (index, item) in self.skus.iter().enumerate() {
            if item.sku_id.trim().is_empty() {
                return Err(invalid_request(format!("skus[{}].sku_id cannot be empty", index)));
            }
            if item.start_month < 1 {
                return Err(invalid_request(format!(
                    "skus[{}].start_month must be at least 1 (got {})",
                    index, item.start_month
                )));
            }
        }

        if let Some(horizon) = self.horizon {
            if !(1..=MAX_HORIZON).contains(&horizon) {
                return Err(invalid_request(format!(
                    "horizon must be between 1 and {} (got {})",
                    MAX_HORIZON, horizon
                )));
            }
        }

        Ok(())
    }
}

impl Validate for RevenueSkuRule {
    fn validate(&self) -> Result<()> {
        if self.sku_id.trim().is_empty() {
            return Err(invalid_request("Revenue SKU id cannot be empty".to_string()));
        }
        if self.active_revenue_start_month < 1 {
            return Err(invalid_request(format!(
                "{}: active_revenue_start_month must be at least 1",
                self.sku_id
            )));
        }
        if let Some(end) = self.revenue_end_month() {
            if end < self.active_revenue_start_month {
                return Err(invalid_request(format!(
                    "{}: active_revenue_end_month {} is before start month {}",
                    self.sku_id, end, self.active_revenue_start_month
                )));
            }
        }
        Ok(())
    }
}

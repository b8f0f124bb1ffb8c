use crate::domain::model::notice_type_label;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
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
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// The SAM.gov API takes posted dates as MM/DD/YYYY.
pub fn validate_date(field_name: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%m/%d/%Y").map_err(|_| EtlError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: "Date must be in MM/DD/YYYY format".to_string(),
    })
}

pub fn validate_date_window(
    from_field: &str,
    from: &str,
    to_field: &str,
    to: &str,
) -> Result<()> {
    let from_date = validate_date(from_field, from)?;
    let to_date = validate_date(to_field, to)?;

    if from_date > to_date {
        return Err(EtlError::InvalidConfigValueError {
            field: from_field.to_string(),
            value: from.to_string(),
            reason: format!("Start date is after end date ({})", to),
        });
    }
    Ok(())
}

/// NAICS codes are 2 to 6 digits; the API accepts any prefix length.
pub fn validate_naics_code(field_name: &str, value: &str) -> Result<()> {
    let digits_only = value.chars().all(|c| c.is_ascii_digit());
    if !digits_only || value.len() < 2 || value.len() > 6 {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "NAICS code must be 2-6 digits".to_string(),
        });
    }
    Ok(())
}

pub fn validate_notice_type(field_name: &str, value: &str) -> Result<()> {
    if notice_type_label(value).is_none() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Unknown notice type code (expected one of: o, p, k, r, s, a, u, g, i)"
                .to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api.endpoint", "https://api.sam.gov/prod").is_ok());
        assert!(validate_url("api.endpoint", "http://localhost:8080").is_ok());
        assert!(validate_url("api.endpoint", "").is_err());
        assert!(validate_url("api.endpoint", "not-a-url").is_err());
        assert!(validate_url("api.endpoint", "ftp://api.sam.gov").is_err());
    }

    #[test]
    fn test_validate_date() {
        assert!(validate_date("posted_from", "01/31/2025").is_ok());
        assert!(validate_date("posted_from", "2025-01-31").is_err());
        assert!(validate_date("posted_from", "13/01/2025").is_err());
        assert!(validate_date("posted_from", "").is_err());
    }

    #[test]
    fn test_validate_date_window() {
        assert!(validate_date_window("from", "01/01/2025", "to", "02/01/2025").is_ok());
        assert!(validate_date_window("from", "01/01/2025", "to", "01/01/2025").is_ok());
        assert!(validate_date_window("from", "03/01/2025", "to", "02/01/2025").is_err());
    }

    #[test]
    fn test_validate_naics_code() {
        assert!(validate_naics_code("naics", "541330").is_ok());
        assert!(validate_naics_code("naics", "54").is_ok());
        assert!(validate_naics_code("naics", "5413301").is_err());
        assert!(validate_naics_code("naics", "5413a0").is_err());
        assert!(validate_naics_code("naics", "5").is_err());
    }

    #[test]
    fn test_validate_notice_type() {
        assert!(validate_notice_type("notice_type", "o").is_ok());
        assert!(validate_notice_type("notice_type", "k").is_ok());
        assert!(validate_notice_type("notice_type", "x").is_err());
        assert!(validate_notice_type("notice_type", "solicitation").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("api.page_size", 100, 1, 1000).is_ok());
        assert!(validate_range("api.page_size", 0, 1, 1000).is_err());
        assert!(validate_range("api.page_size", 1001, 1, 1000).is_err());
    }
}

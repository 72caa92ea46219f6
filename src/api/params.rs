// Query and body parameter types shared by the handlers

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::analytics::DateRange;
use crate::entities::parse_enum;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{PageRequest, SortOrder};

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `?page=&limit=&sortBy=&sortOrder=&search=` plus the per-collection filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub search: Option<String>,
    pub organization_id: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub org_type: Option<String>,
}

impl ListParams {
    pub fn page_request(&self, allowed_sorts: &[&str]) -> AppResult<PageRequest> {
        PageRequest::new(
            self.page,
            self.limit,
            non_blank(&self.sort_by).map(str::to_string),
            self.sort_order,
            allowed_sorts,
        )
    }

    pub fn search(&self) -> Option<String> {
        non_blank(&self.search).map(str::to_string)
    }

    pub fn organization_id(&self) -> Option<String> {
        non_blank(&self.organization_id).map(str::to_string)
    }

    pub fn status<T: serde::de::DeserializeOwned>(&self) -> AppResult<Option<T>> {
        non_blank(&self.status)
            .map(|raw| parse_enum("status", raw))
            .transpose()
    }

    pub fn org_type<T: serde::de::DeserializeOwned>(&self) -> AppResult<Option<T>> {
        non_blank(&self.org_type)
            .map(|raw| parse_enum("type", raw))
            .transpose()
    }
}

/// `?startDate=&endDate=&search=` for the analytics endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
}

impl AnalyticsParams {
    /// Both bounds or neither; an inverted range is rejected
    pub fn range(&self) -> AppResult<Option<DateRange>> {
        match (non_blank(&self.start_date), non_blank(&self.end_date)) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => {
                DateRange::new(parse_date("startDate", start)?, parse_date("endDate", end)?)
                    .map(Some)
            }
            _ => Err(AppError::Validation(
                "startDate and endDate must be given together".to_string(),
            )),
        }
    }

    pub fn search(&self) -> Option<&str> {
        non_blank(&self.search)
    }
}

/// `?search=` for the dashboard
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

impl SearchParams {
    pub fn search(&self) -> Option<&str> {
        non_blank(&self.search)
    }
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp reduced to its UTC calendar day
pub fn parse_date(field: &str, raw: &str) -> AppResult<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc).date_naive())
        .map_err(|_| AppError::Validation(format!("{} '{}' is not a valid date", field, raw)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange<T> {
    pub status: T,
}

//! HTTP handlers. Mutations that touch calendars answer with
//! `{"data": ..., "warnings": [...]}`; `warnings` is omitted when empty.

use actix_web::{HttpResponse, http::StatusCode};
use serde::Serialize;

use crate::calendar::sync::SyncReport;

pub mod calendar;
pub mod employee;
pub mod leave;
pub mod project;
pub mod task;

#[cfg(test)]
pub mod testing;

#[derive(Serialize)]
struct Synced<T> {
    data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub(crate) fn synced<T: Serialize>(status: StatusCode, data: T, report: SyncReport) -> HttpResponse {
    if !report.warnings.is_empty() {
        tracing::warn!(warnings = ?report.warnings, "Calendar sync finished with warnings");
    }
    HttpResponse::build(status).json(Synced {
        data,
        warnings: report.warnings,
    })
}

/// 1-based page and size defaults shared by list endpoints.
pub(crate) fn paging(page: Option<u32>, per_page: Option<u32>) -> (u32, u32) {
    (page.unwrap_or(1).max(1), per_page.unwrap_or(10).clamp(1, 100))
}

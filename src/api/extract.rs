//! Extractors whose rejections use the application's error body.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::repositories::Page;
use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;

/// JSON body; malformed input becomes a 400 `VALIDATION_ERROR`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `?skip=&limit=` on list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Apply configured defaults and clamp to the maximum page size
    pub fn page(self, config: &AppConfig) -> Page {
        let limit = self
            .limit
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size.max(1));
        Page::new(self.skip.unwrap_or(0), limit)
    }
}

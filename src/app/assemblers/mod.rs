pub mod departments;
pub mod doctors;
pub mod services;

pub use departments::{department_assembler, ScrapedDepartments, StaticDepartments};
pub use doctors::DoctorAssembler;
pub use services::{parse_price, ServiceAssembler};

use crate::utils::error::{ClinicError, Result};
use crate::utils::validation::parse_http_url;
use std::fmt;
use url::Url;

/// 組裝器的執行階段，只用於日誌
#[derive(Debug, Clone)]
pub enum Stage<'a> {
    FetchingList(&'a str),
    FetchingDetails(usize),
    Done(usize),
    Failed(&'a ClinicError),
}

impl fmt::Display for Stage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::FetchingList(url) => write!(f, "fetching list {}", url),
            Stage::FetchingDetails(count) => write!(f, "fetching {} detail pages", count),
            Stage::Done(count) => write!(f, "done with {} records", count),
            Stage::Failed(error) => write!(f, "failed: {}", error),
        }
    }
}

pub(crate) fn log_stage(assembler: &str, stage: Stage<'_>) {
    match stage {
        Stage::Failed(_) => tracing::warn!("❌ {}: {}", assembler, stage),
        Stage::Done(_) => tracing::info!("✅ {}: {}", assembler, stage),
        _ => tracing::info!("📡 {}: {}", assembler, stage),
    }
}

/// 把頁面路徑接到基底網址上
pub(crate) fn page_url(base_url: &str, path: &str) -> Result<Url> {
    let base = parse_http_url(base_url)?;
    base.join(path).map_err(|e| ClinicError::InvalidUrl {
        url: format!("{}{}", base_url, path),
        reason: e.to_string(),
    })
}

/// 解析頁面中的相對連結；空字串或無法解析時回傳 None
pub(crate) fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match base.join(href) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            tracing::debug!("Ignoring non-http link: {}", url);
            None
        }
        Err(e) => {
            tracing::debug!("Ignoring unparsable link '{}': {}", href, e);
            None
        }
    }
}

use super::{log_stage, page_url, Stage};
use crate::config::{ClinicConfig, DEFAULT_SERVICE_CATEGORY};
use crate::core::extractor::{self, Shape};
use crate::domain::model::{Record, Service};
use crate::domain::ports::{Assembler, HtmlFetcher};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// 解析價格文字：移除貨幣字樣與所有空白（含不換行空白），逗號視為小數點。
/// 無法解析、負數或非有限值一律回傳 0.0。
pub fn parse_price(raw: &str, currency_token: &str) -> f64 {
    let stripped = if currency_token.is_empty() {
        raw.to_string()
    } else {
        raw.replace(currency_token, "")
    };

    let compact: String = stripped
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    match compact.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => 0.0,
    }
}

pub struct ServiceAssembler {
    fetcher: Arc<dyn HtmlFetcher>,
    base_url: String,
    price_path: String,
    shape: Shape,
    currency_token: String,
}

impl ServiceAssembler {
    pub fn new(fetcher: Arc<dyn HtmlFetcher>, config: &ClinicConfig) -> Self {
        Self {
            fetcher,
            base_url: config.source.base_url.clone(),
            price_path: config.source.price_path.clone(),
            shape: config.extract.shapes.price_list.clone(),
            currency_token: config.extract.currency_token.clone(),
        }
    }

    /// 沒有名稱的列不算服務，不論價格表形狀是否標成必填
    fn to_service(&self, record: &Record) -> Option<Service> {
        let name = record.text("name");
        if name.is_empty() {
            return None;
        }

        let category = record.text("category");
        Some(Service {
            id: Uuid::new_v4(),
            name,
            price: parse_price(&record.text("price"), &self.currency_token),
            category: if category.is_empty() {
                DEFAULT_SERVICE_CATEGORY.to_string()
            } else {
                category
            },
            price_code: record.text("price_code"),
        })
    }

    async fn run(&self) -> Result<Vec<Service>> {
        let url = page_url(&self.base_url, &self.price_path)?;
        log_stage(self.name(), Stage::FetchingList(url.as_str()));

        let html = self.fetcher.fetch(url.as_str()).await?;
        let records = extractor::extract(&html, &self.shape)?;
        Ok(records.iter().filter_map(|r| self.to_service(r)).collect())
    }
}

#[async_trait]
impl Assembler for ServiceAssembler {
    type Output = Service;

    fn name(&self) -> &str {
        "services"
    }

    async fn assemble(&self) -> Result<Vec<Service>> {
        match self.run().await {
            Ok(services) => {
                log_stage(self.name(), Stage::Done(services.len()));
                Ok(services)
            }
            Err(e) => {
                log_stage(self.name(), Stage::Failed(&e));
                Err(e)
            }
        }
    }
}

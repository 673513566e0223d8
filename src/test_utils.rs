//! 單元測試共用的記憶體內抓取器

use crate::domain::ports::HtmlFetcher;
use crate::utils::error::{ClinicError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const BASE: &str = "https://clinic.test";

#[derive(Default)]
pub struct MapFetcher {
    pages: HashMap<String, String>,
    hanging: HashMap<String, usize>,
    delay: Option<Duration>,
    hits: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, path: &str, html: &str) -> Self {
        self.pages.insert(format!("{}{}", BASE, path), html.to_string());
        self
    }

    /// 這個路徑的請求永遠不會完成
    pub fn hang(self, path: &str) -> Self {
        self.hang_from(path, 1)
    }

    /// 從第 `nth` 次請求起不再完成
    pub fn hang_from(mut self, path: &str, nth: usize) -> Self {
        self.hanging.insert(format!("{}{}", BASE, path), nth);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self, path: &str) -> usize {
        let url = format!("{}{}", BASE, path);
        self.hits().iter().filter(|hit| **hit == url).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HtmlFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let attempt = {
            let mut hits = self.hits.lock().unwrap();
            hits.push(url.to_string());
            hits.iter().filter(|hit| *hit == url).count()
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.hanging.get(url).is_some_and(|nth| attempt >= *nth) {
            futures::future::pending::<()>().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ClinicError::Network {
                url: url.to_string(),
                message: "HTTP status 404 Not Found".to_string(),
            })
    }
}

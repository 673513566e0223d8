use crate::config::ClinicConfig;
use crate::domain::ports::HtmlFetcher;
use crate::utils::error::{ClinicError, Result};
use crate::utils::validation::parse_http_url;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// 以 reqwest 實作的 HTML 抓取器。非 2xx 狀態一律視為網路錯誤，不做重試。
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ClinicError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ClinicConfig) -> Result<Self> {
        Self::new(config.request_timeout(), &config.source.user_agent)
    }
}

fn network_error(url: &str, error: reqwest::Error) -> ClinicError {
    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };
    ClinicError::Network {
        url: url.to_string(),
        message,
    }
}

#[async_trait]
impl HtmlFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = parse_http_url(url)?;

        tracing::debug!("Making request to: {}", parsed);
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        tracing::debug!("Response status for {}: {}", url, status);
        if !status.is_success() {
            return Err(ClinicError::Network {
                url: url.to_string(),
                message: format!("HTTP status {}", status),
            });
        }

        let body = response.bytes().await.map_err(|e| network_error(url, e))?;
        String::from_utf8(body.to_vec()).map_err(|_| ClinicError::Decode {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), "clinic-etl-test").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start();
        let page = server.mock(|when, then| {
            when.method(GET).path("/doctors/");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body("<div class=\"doctor-item\">Иванов</div>");
        });

        let body = fetcher().fetch(&server.url("/doctors/")).await.unwrap();

        page.assert();
        assert!(body.contains("Иванов"));
    }

    #[tokio::test]
    async fn test_from_config_uses_source_settings() {
        let server = MockServer::start();
        let page = server.mock(|when, then| {
            when.method(GET)
                .path("/price/")
                .header("user-agent", "clinic-etl-config");
            then.status(200).body("ok");
        });
        let mut config = ClinicConfig::default();
        config.source.user_agent = "clinic-etl-config".to_string();

        let body = HttpFetcher::from_config(&config)
            .unwrap()
            .fetch(&server.url("/price/"))
            .await
            .unwrap();

        page.assert();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_request() {
        let result = fetcher().fetch("not a url").await;
        assert!(matches!(result, Err(ClinicError::InvalidUrl { .. })));

        let result = fetcher().fetch("file:///etc/passwd").await;
        assert!(matches!(result, Err(ClinicError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_non_success_status_is_network_error() {
        let server = MockServer::start();
        let page = server.mock(|when, then| {
            when.method(GET).path("/price/");
            then.status(503);
        });

        let result = fetcher().fetch(&server.url("/price/")).await;

        page.assert();
        match result {
            Err(ClinicError::Network { message, .. }) => assert!(message.contains("503")),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_utf8_body_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/price/");
            then.status(200).body(vec![0xd0u8, 0xff, 0xfe, 0x00, 0xc3]);
        });

        let result = fetcher().fetch(&server.url("/price/")).await;
        assert!(matches!(result, Err(ClinicError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = fetcher()
            .fetch(&format!("http://127.0.0.1:{}/doctors/", port))
            .await;
        assert!(matches!(result, Err(ClinicError::Network { .. })));
    }
}

use crate::domain::ports::DataSource;
use crate::utils::error::{EvalError, Result};
use crate::utils::validation;
use async_trait::async_trait;
use reqwest::Client;

/// 從基底 URL 讀取名單與設定檔
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: Client,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Result<Self> {
        validation::validate_url("source", base_url)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        })
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.url_for(name);
        tracing::debug!("Fetching {}", url);

        let response = self.client.get(&url).send().await?;
        tracing::debug!("Response status for {}: {}", url, response.status());

        if !response.status().is_success() {
            return Err(EvalError::data_unavailable(
                name,
                format!("{} returned HTTP {}", url, response.status()),
            ));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_rejects_non_http_base() {
        assert!(HttpSource::new("ftp://example.com/data").is_err());
        assert!(HttpSource::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_fetch_joins_base_and_name() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/data/students.csv");
            then.status(200).body("id,name\n1,Ana\n");
        });

        let source = HttpSource::new(&server.url("/data/")).unwrap();
        let body = source.fetch("students.csv").await.unwrap();

        mock.assert();
        assert_eq!(body, b"id,name\n1,Ana\n");
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_data_unavailable() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/config.json");
            then.status(404);
        });

        let source = HttpSource::new(&server.base_url()).unwrap();
        let result = source.fetch("config.json").await;

        mock.assert();
        assert!(matches!(result, Err(EvalError::DataUnavailable { .. })));
    }
}

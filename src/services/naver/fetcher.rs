//! 市值排行页面请求
//!
//! 单次请求、不重试；任何传输错误或非 2xx 状态都返回 [`ScrapeError`]，由调用方记录日志

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use url::Url;

use super::ScrapeError;
use crate::config::ScrapeConfig;

pub struct ListingFetcher {
    client: Client,
    base_url: String,
    market: u8,
}

impl ListingFetcher {
    pub fn new(config: &ScrapeConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            market: config.market,
        })
    }

    /// 构造第 `page` 页的地址，如 `...sise_market_sum.naver?sosok=0&page=1`
    pub fn page_url(&self, page: u32) -> Result<Url, ScrapeError> {
        let mut url = Url::parse(&self.base_url)?;
        url.query_pairs_mut()
            .append_pair("sosok", &self.market.to_string())
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    /// 获取一页 HTML
    pub async fn fetch(&self, page: u32) -> Result<String, ScrapeError> {
        let url = self.page_url(page)?;
        log::debug!("请求市值排行页面 URL: {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus { status });
        }

        let is_utf8 = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().contains("utf-8"))
            .unwrap_or(false);

        let bytes = response.bytes().await?;
        Ok(decode_page(&bytes, is_utf8))
    }
}

/// 네이버 금융页面为 EUC-KR 编码
fn decode_page(bytes: &[u8], is_utf8: bool) -> String {
    if is_utf8 {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        encoding_rs::EUC_KR.decode(bytes).0.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> ListingFetcher {
        let config = ScrapeConfig {
            base_url: format!("{}/sise/sise_market_sum.naver", server.uri()),
            timeout_secs: 5,
            connect_timeout_secs: 2,
            ..ScrapeConfig::default()
        };
        ListingFetcher::new(&config).unwrap()
    }

    #[test]
    fn test_page_url() {
        let fetcher = ListingFetcher::new(&ScrapeConfig::default()).unwrap();
        let url = fetcher.page_url(2).unwrap();
        assert_eq!(
            url.as_str(),
            "https://finance.naver.com/sise/sise_market_sum.naver?sosok=0&page=2"
        );
    }

    #[test]
    fn test_decode_euc_kr() {
        let (encoded, _, _) = encoding_rs::EUC_KR.encode("삼성전자");
        assert_eq!(decode_page(&encoded, false), "삼성전자");
        assert_eq!(decode_page("삼성전자".as_bytes(), true), "삼성전자");
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sise/sise_market_sum.naver"))
            .and(query_param("sosok", "0"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<html>삼성전자</html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let body = fetcher_for(&server).fetch(1).await.unwrap();
        assert_eq!(body, "<html>삼성전자</html>");
    }

    #[tokio::test]
    async fn test_fetch_euc_kr_page() {
        let server = MockServer::start().await;
        let (encoded, _, _) = encoding_rs::EUC_KR.encode("<html>현대차</html>");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(encoded.into_owned(), "text/html;charset=EUC-KR"))
            .mount(&server)
            .await;

        let body = fetcher_for(&server).fetch(1).await.unwrap();
        assert_eq!(body, "<html>현대차</html>");
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = fetcher_for(&server).fetch(1).await;
        match result {
            Err(ScrapeError::HttpStatus { status }) => assert_eq!(status.as_u16(), 503),
            other => panic!("expected HttpStatus, got {:?}", other.map(|s| s.len())),
        }
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        let config = ScrapeConfig {
            base_url: "http://127.0.0.1:1/sise_market_sum.naver".to_string(),
            timeout_secs: 2,
            connect_timeout_secs: 1,
            ..ScrapeConfig::default()
        };
        let fetcher = ListingFetcher::new(&config).unwrap();
        assert!(matches!(fetcher.fetch(1).await, Err(ScrapeError::Http(_))));
    }
}

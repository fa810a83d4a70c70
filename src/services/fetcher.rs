//! 上游报表抓取
//!
//! `Fetcher::fetch` 对外从不失败：任何错误都会被记录并降级为空表。
//! 成功解析的表按 URL 写入缓存，TTL 内重复抓取不会再访问上游。

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use super::error::FetchError;
use super::transport::Transport;
use crate::data::TableCache;
use crate::models::{cell_text, Table};

/// 上游响应信封
#[derive(Debug, Deserialize)]
struct ReportEnvelope {
    #[serde(default)]
    result: Option<Vec<Vec<Value>>>,
}

/// 报表抓取器
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    cache: TableCache,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, cache: TableCache) -> Self {
        Self { transport, cache }
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    /// 抓取报表，失败时返回空表
    pub async fn fetch(&self, url: &str) -> Table {
        match self.try_fetch(url).await {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(
                    source = %redact_url(url),
                    error = %e,
                    reason = ?e,
                    "抓取报表失败，返回空表"
                );
                Table::empty()
            }
        }
    }

    /// 抓取报表并保留失败原因
    pub async fn try_fetch(&self, url: &str) -> Result<Table, FetchError> {
        let key = url.to_string();
        if let Some(table) = self.cache.get(&key) {
            tracing::debug!(source = %redact_url(url), rows = table.row_count(), "报表缓存命中");
            return Ok(table);
        }

        tracing::info!(source = %redact_url(url), "请求上游报表");
        let body = self.transport.get(url).await?;
        let table = parse_report(&body)?;

        tracing::info!(
            source = %redact_url(url),
            rows = table.row_count(),
            columns = table.columns().len(),
            "上游报表已缓存"
        );
        self.cache.put(key, table.clone());
        Ok(table)
    }
}

/// 解析上游响应：`result[0]` 为表头，其余为数据行
pub fn parse_report(body: &str) -> Result<Table, FetchError> {
    let envelope: ReportEnvelope = serde_json::from_str(body)?;
    let mut result = envelope.result.ok_or(FetchError::MissingResult)?;

    if result.len() < 2 {
        return Err(FetchError::TooFewRows { rows: result.len() });
    }

    let mut rows = result.split_off(1);
    let header: Vec<String> = result[0].iter().map(cell_text).collect();

    // 短行补 null，宽于表头的行无法对应列名
    for (idx, row) in rows.iter_mut().enumerate() {
        if row.len() > header.len() {
            return Err(FetchError::RaggedRow {
                row: idx + 1,
                expected: header.len(),
                found: row.len(),
            });
        }
        row.resize(header.len(), Value::Null);
    }

    Ok(Table::new(header, rows))
}

/// 日志中只保留 scheme + host，URL 路径里带有账户令牌
fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => format!("{}://{}/…", url.scheme(), url.host_str().unwrap_or("")),
        Err(_) => "<invalid url>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ManualClock, TtlCache};
    use crate::services::transport::testing::StubTransport;
    use serde_json::json;
    use std::time::Duration;

    const ADS_URL: &str = "https://reports.example.com/get_results/ads-token";

    fn make_fetcher(stub: Arc<StubTransport>) -> (Fetcher, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = TtlCache::with_clock(Duration::from_secs(600), clock.clone());
        (Fetcher::new(stub, cache), clock)
    }

    fn well_formed_body() -> String {
        json!({
            "result": [
                ["Account id", "Ad id", "Cost per New Conversation started"],
                ["act_1", "AD1", "20"],
                ["act_1", "AD2", 3.5],
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_fetch_well_formed_response() {
        let stub = Arc::new(StubTransport::with_body(ADS_URL, &well_formed_body()));
        let (fetcher, _) = make_fetcher(stub);

        let table = fetcher.fetch(ADS_URL).await;
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.columns(),
            &["Account id", "Ad id", "Cost per New Conversation started"]
        );
        assert_eq!(table.rows()[1][2], json!(3.5));
    }

    #[tokio::test]
    async fn test_missing_result_yields_empty_table() {
        let stub = Arc::new(StubTransport::with_body(ADS_URL, r#"{"status": "error"}"#));
        let (fetcher, _) = make_fetcher(stub);

        assert!(fetcher.fetch(ADS_URL).await.is_empty());
        assert!(matches!(
            fetcher.try_fetch(ADS_URL).await,
            Err(FetchError::MissingResult)
        ));
    }

    #[tokio::test]
    async fn test_zero_or_one_row_yields_empty_table() {
        for body in [r#"{"result": []}"#, r#"{"result": [["Ad id"]]}"#] {
            let stub = Arc::new(StubTransport::with_body(ADS_URL, body));
            let (fetcher, _) = make_fetcher(stub);
            assert!(fetcher.fetch(ADS_URL).await.is_empty());
            assert!(fetcher.cache().is_empty());
        }
    }

    #[tokio::test]
    async fn test_null_result_yields_empty_table() {
        let stub = Arc::new(StubTransport::with_body(ADS_URL, r#"{"result": null}"#));
        let (fetcher, _) = make_fetcher(stub);
        assert!(fetcher.fetch(ADS_URL).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_yields_empty_table() {
        let stub = Arc::new(StubTransport::with_body(ADS_URL, "<html>502</html>"));
        let (fetcher, _) = make_fetcher(stub);

        assert!(matches!(
            fetcher.try_fetch(ADS_URL).await,
            Err(FetchError::Decode(_))
        ));
        assert!(fetcher.fetch(ADS_URL).await.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_status_is_not_cached() {
        let stub = Arc::new(StubTransport::with_status(ADS_URL, 500));
        let (fetcher, _) = make_fetcher(stub.clone());

        assert!(fetcher.fetch(ADS_URL).await.is_empty());
        assert!(fetcher.fetch(ADS_URL).await.is_empty());
        assert_eq!(stub.calls(), 2);
        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_yields_empty_table() {
        let stub = Arc::new(StubTransport::new());
        let (fetcher, _) = make_fetcher(stub);
        assert!(matches!(
            fetcher.try_fetch(ADS_URL).await,
            Err(FetchError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_row_wider_than_header_is_rejected() {
        let body = json!({"result": [["a", "b"], ["1", "2"], ["3", "4", "5"]]}).to_string();
        let stub = Arc::new(StubTransport::with_body(ADS_URL, &body));
        let (fetcher, _) = make_fetcher(stub);

        match fetcher.try_fetch(ADS_URL).await {
            Err(FetchError::RaggedRow {
                row,
                expected,
                found,
            }) => {
                assert_eq!((row, expected, found), (2, 2, 3));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_short_row_padded_with_null() {
        let body = json!({"result": [
            ["Account id", "Account Currency", "Ad id", "Cost per New Conversation started", "Campaign id", "Ad status"],
            ["act_1", "USD", "AD1", "20", "C1", "ACTIVE"],
            ["act_1", "USD", "AD2", "20"],
        ]})
        .to_string();

        let table = parse_report(&body).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][5], json!("ACTIVE"));
        assert_eq!(
            table.rows()[1],
            vec![
                json!("act_1"),
                json!("USD"),
                json!("AD2"),
                json!("20"),
                Value::Null,
                Value::Null
            ]
        );
    }

    #[tokio::test]
    async fn test_second_fetch_within_ttl_served_from_cache() {
        let stub = Arc::new(StubTransport::with_body(ADS_URL, &well_formed_body()));
        let (fetcher, clock) = make_fetcher(stub.clone());

        let first = fetcher.fetch(ADS_URL).await;
        clock.advance(chrono::Duration::seconds(300));
        let second = fetcher.fetch(ADS_URL).await;

        assert_eq!(stub.calls(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_fetch_after_ttl_hits_upstream_again() {
        let stub = Arc::new(StubTransport::with_body(ADS_URL, &well_formed_body()));
        let (fetcher, clock) = make_fetcher(stub.clone());

        fetcher.fetch(ADS_URL).await;
        clock.advance(chrono::Duration::seconds(600));
        fetcher.fetch(ADS_URL).await;

        assert_eq!(stub.calls(), 2);
    }

    #[test]
    fn test_parse_report_stringifies_header_cells() {
        let table = parse_report(r#"{"result": [["Ad id", 7], ["AD1", 1]]}"#).unwrap();
        assert_eq!(table.columns(), &["Ad id", "7"]);
    }

    #[test]
    fn test_redact_url_hides_token() {
        let redacted = redact_url(ADS_URL);
        assert_eq!(redacted, "https://reports.example.com/…");
        assert!(!redacted.contains("ads-token"));
        assert_eq!(redact_url("not a url"), "<invalid url>");
    }
}

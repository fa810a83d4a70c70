// lib.rs - 暴露分析流水线给二进制和集成测试使用

pub mod core;
pub mod data;
pub mod models;
pub mod services;
pub mod utils;

pub use models::*;
pub use services::{
    filter_high_cost, AnalyzeError, AnalyzeResponse, AnalyzeServer, Analyzer, FetchError,
    Fetcher, HttpTransport, Transport,
};

pub use core::{build_http_client, init_logger, AppError, AppResult};
pub use data::{Clock, ManualClock, SystemClock, TableCache, TtlCache};

use std::sync::Arc;

/// 按配置组装分析服务：HTTP 客户端 → 缓存 → 抓取器 → 分析器 → 服务实例
pub fn build_server(config: &AppConfig) -> AppResult<AnalyzeServer> {
    let client = build_http_client(&config.upstream)?;
    let cache = TableCache::new(config.cache.ttl());
    let fetcher = Fetcher::new(Arc::new(HttpTransport::new(client)), cache);
    let analyzer = Analyzer::new(
        fetcher,
        config.upstream.ads_url.clone(),
        config.upstream.avg_url.clone(),
    );

    tracing::debug!(
        ttl_secs = config.cache.ttl_secs,
        host = %config.server.host,
        port = config.server.port,
        "分析服务组装完成"
    );

    Ok(AnalyzeServer::new(config.server.clone(), analyzer))
}

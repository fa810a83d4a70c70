use crate::core::error::{AppError, AppResult};
use crate::models::UpstreamConfig;
use reqwest::Client;

const USER_AGENT: &str = concat!("costwatch/", env!("CARGO_PKG_VERSION"));

/// 构建访问上游报表服务的 HTTP 客户端
///
/// # 参数
/// - `config`: 上游配置（代理、超时）
///
/// # 返回
/// - 配置好的 reqwest::Client
pub fn build_http_client(config: &UpstreamConfig) -> AppResult<Client> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10));

    // 默认不设超时，只有显式配置时才启用
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(std::time::Duration::from_secs(secs));
    }

    if let Some(proxy_url) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
            // 为 SOCKS5 提供更友好的错误说明
            if proxy_url.starts_with("socks5") {
                AppError::ProxyConfig {
                    reason: format!("SOCKS5 代理初始化失败: {e}，若需要远程 DNS 解析请使用 socks5h://"),
                }
            } else {
                AppError::ProxyConfig {
                    reason: format!("代理 URL 无效: {e}"),
                }
            }
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| AppError::Other(e.into()))
}

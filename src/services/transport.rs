//! 上游传输层
//!
//! `Fetcher` 只依赖 `Transport` trait：生产环境使用 reqwest 实现，
//! 测试中可以替换为返回固定响应的桩实现。

use async_trait::async_trait;
use reqwest::Client;

use super::error::FetchError;

/// 上游 GET 请求
#[async_trait]
pub trait Transport: Send + Sync {
    /// 发送 GET 请求并返回响应体
    ///
    /// # 返回
    /// - `Ok(String)`: 2xx 响应的响应体
    /// - `Err(FetchError::Transport)`: 网络错误
    /// - `Err(FetchError::Status)`: 非成功状态码
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// 基于 reqwest 的传输实现
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

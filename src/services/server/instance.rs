// 分析服务 HTTP 实例
//
// AnalyzeServer 封装 `/analyze` 端点的 HTTP 服务，负责：
// - HTTP 服务器的启动和停止
// - 请求路由
// - 把分析结果或错误转换为 JSON 响应

use anyhow::{Context, Result};
use futures_util::FutureExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::any::Any;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use super::responses::{self, AnalyzeResponse, ResponseBody};
use crate::models::ServerConfig;
use crate::services::analyzer::{filter_high_cost, Analyzer};

pub const ANALYZE_PATH: &str = "/analyze";

/// 分析服务实例
pub struct AnalyzeServer {
    config: ServerConfig,
    analyzer: Arc<Analyzer>,
    server_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
    local_addr: Arc<RwLock<Option<SocketAddr>>>,
}

impl AnalyzeServer {
    pub fn new(config: ServerConfig, analyzer: Analyzer) -> Self {
        Self {
            config,
            analyzer: Arc::new(analyzer),
            server_handle: Arc::new(RwLock::new(None)),
            local_addr: Arc::new(RwLock::new(None)),
        }
    }

    /// 启动服务，返回实际监听地址（端口 0 时由系统分配）
    pub async fn start(&self) -> Result<SocketAddr> {
        {
            let handle = self.server_handle.read().await;
            if handle.is_some() {
                anyhow::bail!("分析服务已在运行");
            }
        }

        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .with_context(|| {
                format!("绑定 {}:{} 失败", self.config.host, self.config.port)
            })?;
        let addr = listener.local_addr().context("读取监听地址失败")?;

        tracing::info!(%addr, "分析服务启动: http://{addr}{ANALYZE_PATH}");

        let analyzer = Arc::clone(&self.analyzer);
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let analyzer = Arc::clone(&analyzer);

                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let analyzer = Arc::clone(&analyzer);
                                async move { handle_request(req, analyzer).await }
                            });

                            if let Err(err) =
                                http1::Builder::new().serve_connection(io, service).await
                            {
                                tracing::warn!(%peer, error = ?err, "处理连接失败");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "接受连接失败");
                    }
                }
            }
        });

        *self.server_handle.write().await = Some(handle);
        *self.local_addr.write().await = Some(addr);

        Ok(addr)
    }

    /// 停止服务
    pub async fn stop(&self) {
        let handle = self.server_handle.write().await.take();
        self.local_addr.write().await.take();

        if let Some(handle) = handle {
            handle.abort();
            tracing::info!("分析服务已停止");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.server_handle.read().await.is_some()
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read().await
    }
}

/// 处理单个请求
async fn handle_request(
    req: Request<Incoming>,
    analyzer: Arc<Analyzer>,
) -> Result<Response<ResponseBody>, Infallible> {
    // 请求体不需要读取，只取方法和路径
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    drop(req);

    let response = match (&method, path.as_str()) {
        (&Method::GET, ANALYZE_PATH) => {
            let payload = analyze(&analyzer).await;
            responses::json_response(StatusCode::OK, &payload)
        }
        (method, ANALYZE_PATH) => responses::method_not_allowed(method),
        (_, path) => responses::not_found(path),
    };

    Ok(response)
}

/// 执行一次完整分析并生成 `/analyze` 响应体
///
/// 分析流程中的错误和 panic 都被转换为 `{"error", "trace"}`。
pub async fn analyze(analyzer: &Analyzer) -> AnalyzeResponse {
    let outcome = AssertUnwindSafe(analyzer.process()).catch_unwind().await;

    match outcome {
        Ok(Ok(records)) if records.is_empty() => {
            tracing::info!("分析完成：无数据");
            AnalyzeResponse::no_data()
        }
        Ok(Ok(records)) => {
            let total = records.len();
            let high_cost = filter_high_cost(records);
            tracing::info!(total, high_cost = high_cost.len(), "分析完成");
            AnalyzeResponse::high_cost(high_cost)
        }
        Ok(Err(e)) => {
            let err = anyhow::Error::new(e).context("分析失败");
            tracing::error!(error = ?err, "分析请求失败");
            AnalyzeResponse::error(err.root_cause().to_string(), format!("{err:?}"))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(error = %message, "分析过程中发生 panic");
            AnalyzeResponse::error(message.clone(), format!("panic while processing {ANALYZE_PATH}: {message}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TtlCache;
    use crate::services::fetcher::Fetcher;
    use crate::services::transport::testing::StubTransport;
    use serde_json::{json, Value};
    use std::time::Duration;

    const ADS_URL: &str = "https://reports.example.com/ads";
    const AVG_URL: &str = "https://reports.example.com/avg";

    fn make_analyzer(stub: StubTransport) -> Analyzer {
        let fetcher = Fetcher::new(Arc::new(stub), TtlCache::new(Duration::from_secs(600)));
        Analyzer::new(fetcher, ADS_URL, AVG_URL)
    }

    #[tokio::test]
    async fn test_analyze_no_data_when_upstream_fails() {
        let payload = analyze(&make_analyzer(StubTransport::new())).await;
        assert_eq!(
            serde_json::to_value(payload).unwrap(),
            json!({"data": [], "message": "No data found"})
        );
    }

    #[tokio::test]
    async fn test_analyze_reports_missing_column_as_error() {
        let ads = json!({"result": [["Campaign id"], ["C1"]]}).to_string();
        let avg = json!({"result": [["Campaign id"], ["C1"]]}).to_string();
        let stub = StubTransport::new().body(ADS_URL, &ads).body(AVG_URL, &avg);

        let value = serde_json::to_value(analyze(&make_analyzer(stub)).await).unwrap();
        assert_eq!(
            value["error"],
            Value::String("ads 表缺少列: cost_per_new_conversation_started".to_string())
        );
        assert!(value["trace"].as_str().unwrap().contains("分析失败"));
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn test_analyze_filters_high_cost() {
        let ads = json!({"result": [
            ["Account id", "Account Currency", "Ad id", "Cost per New Conversation started", "Campaign id"],
            ["act_1", "USD", "AD1", "20", "C1"],
            ["act_1", "USD", "AD2", "16", "C1"],
        ]})
        .to_string();
        let avg = json!({"result": [
            ["Campaign id", "Cost per New Conversation started", "Account Currency"],
            ["C1", "15", "USD"],
        ]})
        .to_string();
        let stub = StubTransport::new().body(ADS_URL, &ads).body(AVG_URL, &avg);

        let value = serde_json::to_value(analyze(&make_analyzer(stub)).await).unwrap();
        assert_eq!(value["message"], "1 high-cost ads found");
        assert_eq!(value["data"].as_array().unwrap().len(), 1);
        assert_eq!(value["data"][0]["ad_id"], "AD1");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_start_twice_fails_and_stop_resets() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let server = AnalyzeServer::new(config, make_analyzer(StubTransport::new()));

        let addr = server.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.is_running().await);
        assert_eq!(server.local_addr().await, Some(addr));
        assert!(server.start().await.is_err());

        server.stop().await;
        assert!(!server.is_running().await);
        assert_eq!(server.local_addr().await, None);
    }
}

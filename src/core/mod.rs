//! 核心基础设施层
//!
//! - `error`: 应用级错误类型
//! - `http`: 上游 HTTP 客户端构建
//! - `logger`: tracing 日志初始化

pub mod error;
pub mod http;
pub mod logger;

pub use error::{AppError, AppResult};
pub use http::build_http_client;
pub use logger::init_logger;

//! 应用级错误类型
//!
//! 启动阶段（配置加载、日志初始化、端口绑定）的错误统一收敛到 `AppError`。
//! 请求处理阶段的错误见 `services::error`。

use thiserror::Error;

/// 应用级错误
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置无效或缺失
    #[error("配置错误: {reason}")]
    Config { reason: String },

    /// 上游代理配置无效
    #[error("代理配置错误: {reason}")]
    ProxyConfig { reason: String },

    /// 日志系统初始化失败
    #[error("日志系统错误: {0}")]
    Logger(String),

    /// 文件 I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = AppError::config("ads_url 未设置");
        assert_eq!(err.to_string(), "配置错误: ads_url 未设置");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io_err.into();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_anyhow_passthrough() {
        let err: AppError = anyhow::anyhow!("bind failed").into();
        assert_eq!(err.to_string(), "bind failed");
    }
}

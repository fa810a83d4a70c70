//! 请求处理阶段的错误类型
//!
//! - `FetchError`: 抓取上游报表失败的具体原因。对外契约仍是“失败即空表”，
//!   这里的类型只用于日志和测试。
//! - `AnalyzeError`: 合并/阈值计算过程中无法继续的错误，会在 `/analyze`
//!   边界被转换为 `{"error", "trace"}` 响应。

use thiserror::Error;

/// 上游报表抓取失败原因
#[derive(Error, Debug)]
pub enum FetchError {
    /// 网络/传输层错误
    #[error("上游请求失败: {0}")]
    Transport(String),

    /// 非 2xx 状态码
    #[error("上游返回非成功状态码: {status}")]
    Status { status: u16 },

    /// 响应体不是合法 JSON，或 `result` 不是二维数组
    #[error("响应 JSON 解析失败: {0}")]
    Decode(#[from] serde_json::Error),

    /// 缺少 `result` 字段
    #[error("响应缺少 result 字段")]
    MissingResult,

    /// 行数不足（至少需要表头 + 1 行数据）
    #[error("result 行数不足: {rows}")]
    TooFewRows { rows: usize },

    /// 数据行列数多于表头
    #[error("第 {row} 行有 {found} 列，表头为 {expected} 列")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status {
                status: status.as_u16(),
            },
            None => FetchError::Transport(err.to_string()),
        }
    }
}

/// 报表所属的表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Ads,
    Averages,
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKind::Ads => write!(f, "ads"),
            TableKind::Averages => write!(f, "averages"),
        }
    }
}

/// 分析流程错误
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("{table} 表缺少列: {column}")]
    MissingColumn { table: TableKind, column: String },
}

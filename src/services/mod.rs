// 服务层模块
//
// - transport: 上游 GET 请求抽象
// - fetcher: 报表抓取 + 缓存
// - analyzer: 合并、阈值计算、高成本过滤
// - server: `/analyze` HTTP 服务
// - error: 抓取与分析错误类型

pub mod analyzer;
pub mod error;
pub mod fetcher;
pub mod server;
pub mod transport;

pub use analyzer::{filter_high_cost, Analyzer};
pub use error::{AnalyzeError, FetchError, TableKind};
pub use fetcher::Fetcher;
pub use server::{AnalyzeResponse, AnalyzeServer};
pub use transport::{HttpTransport, Transport};

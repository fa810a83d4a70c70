// 分析服务模块
//
// 对外暴露 `GET /analyze`

pub mod instance;
pub mod responses;

pub use instance::{analyze, AnalyzeServer, ANALYZE_PATH};
pub use responses::AnalyzeResponse;

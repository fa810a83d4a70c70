//! 数据层
//!
//! 目前只有缓存：报表抓取结果按 URL 缓存，过期后惰性失效。

pub mod cache;

pub use cache::{Clock, ManualClock, SystemClock, TableCache, TtlCache};

//! 缓存层实现
//!
//! - `clock`: 可注入的时间来源
//! - `ttl`: 无容量上限、惰性过期的 TTL 缓存

pub mod clock;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ttl::TtlCache;

use crate::models::Table;

/// 上游报表缓存：键为报表 URL
pub type TableCache = TtlCache<String, Table>;

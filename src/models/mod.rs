pub mod config;
pub mod record;
pub mod table;

pub use config::*;
pub use record::{AvgMatch, MergedRecord};
pub use table::{cell_text, Cell, Table};

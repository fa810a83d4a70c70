//! 报表表格数据模型
//!
//! 上游返回 `{"result": [[表头...], [行...], ...]}`，解码后得到 `Table`：
//! 有序的列名 + 有序的行，单元格保留原始 JSON 标量。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 单元格：上游给出的 JSON 标量（字符串、数字、布尔或 null）
pub type Cell = Value;

/// 命名列表格，保持行的插入顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// 创建表格
    ///
    /// 调用方需保证每一行的长度与列数一致。
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Self { columns, rows }
    }

    /// 空表
    pub fn empty() -> Self {
        Self::default()
    }

    /// 没有数据行或没有列即视为空表
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 查找列下标
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 按映射表重命名列，未出现在映射中的列保持原名
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) {
        for column in self.columns.iter_mut() {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| *from == column.as_str()) {
                *column = (*to).to_string();
            }
        }
    }
}

/// 把单元格渲染为文本：字符串原样输出，null 为空串，其他按 JSON 表示
pub fn cell_text(cell: &Cell) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

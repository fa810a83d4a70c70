//! 合并后的广告记录
//!
//! 每条广告行 left join 到对应 campaign 的平均成本后得到一条 `MergedRecord`，
//! 序列化为扁平 JSON 对象：广告列（按表格顺序）在前，随后依次是
//! `avg_cost`、`account_currency_avg`、`threshold`、`ad_link`。

use linked_hash_map::LinkedHashMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::table::Cell;

pub const ACCOUNT_ID: &str = "account_id";
pub const ACCOUNT_CURRENCY: &str = "account_currency";
pub const AD_ID: &str = "ad_id";
pub const CAMPAIGN_ID: &str = "campaign_id";
pub const COST_COLUMN: &str = "cost_per_new_conversation_started";

/// 追加在广告列之后的派生字段；广告表中的同名列会被覆盖
const DERIVED_KEYS: [&str; 4] = ["avg_cost", "account_currency_avg", "threshold", "ad_link"];

/// join 到的平均成本
#[derive(Debug, Clone, PartialEq)]
pub enum AvgMatch {
    /// 找到同 campaign_id 的平均成本行；`cost` 为 None 表示该行成本无法解析
    Matched { cost: Option<f64>, currency: Cell },
    /// 平均成本表中没有该 campaign_id
    Unmatched,
}

impl AvgMatch {
    /// 平均成本，未匹配或缺失时为 0
    pub fn avg_cost(&self) -> f64 {
        match self {
            AvgMatch::Matched {
                cost: Some(cost), ..
            } => *cost,
            _ => 0.0,
        }
    }

    /// 平均成本表一侧的币种（join 进来但不参与阈值计算）
    pub fn currency(&self) -> Option<&Cell> {
        match self {
            AvgMatch::Matched { currency, .. } => Some(currency),
            AvgMatch::Unmatched => None,
        }
    }
}

/// 合并后的广告记录
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    /// 广告表的全部列（重命名后），保持列顺序
    pub fields: LinkedHashMap<String, Cell>,
    /// 数值化后的实际成本；None 表示原值无法解析
    pub cost: Option<f64>,
    pub avg: AvgMatch,
    pub threshold: f64,
    pub ad_link: String,
}

impl MergedRecord {
    pub fn field(&self, name: &str) -> Option<&Cell> {
        self.fields.get(name)
    }

    pub fn campaign_id(&self) -> Option<&Cell> {
        self.field(CAMPAIGN_ID)
    }

    pub fn avg_cost(&self) -> f64 {
        self.avg.avg_cost()
    }

    /// 实际成本严格高于阈值
    pub fn is_high_cost(&self) -> bool {
        matches!(self.cost, Some(cost) if cost > self.threshold)
    }
}

impl Serialize for MergedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields: Vec<(&String, &Cell)> = self
            .fields
            .iter()
            .filter(|(name, _)| !DERIVED_KEYS.contains(&name.as_str()))
            .collect();

        let mut map = serializer.serialize_map(Some(fields.len() + DERIVED_KEYS.len()))?;
        for (name, cell) in fields {
            if name == COST_COLUMN {
                map.serialize_entry(name, &self.cost)?;
            } else {
                map.serialize_entry(name, cell)?;
            }
        }
        map.serialize_entry("avg_cost", &self.avg_cost())?;
        map.serialize_entry("account_currency_avg", &self.avg.currency())?;
        map.serialize_entry("threshold", &self.threshold)?;
        map.serialize_entry("ad_link", &self.ad_link)?;
        map.end()
    }
}

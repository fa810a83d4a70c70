//! 高成本广告分析
//!
//! 流程：抓取广告表与平均成本表 → 列名规范化 → 成本数值化 →
//! 按 campaign_id left join → 计算阈值与广告链接。
//! 最终过滤（实际成本严格高于阈值）由 `filter_high_cost` 完成。

use linked_hash_map::LinkedHashMap;
use serde_json::Value;
use std::collections::HashMap;

use super::error::{AnalyzeError, TableKind};
use super::fetcher::Fetcher;
use crate::models::record::{ACCOUNT_CURRENCY, ACCOUNT_ID, AD_ID, CAMPAIGN_ID, COST_COLUMN};
use crate::models::{cell_text, AvgMatch, Cell, MergedRecord, Table};

/// 广告表列名映射
pub const ADS_COLUMNS: &[(&str, &str)] = &[
    ("Account id", "account_id"),
    ("Account name", "account_name"),
    ("Account Currency", "account_currency"),
    ("Ad id", "ad_id"),
    ("Ad name", "ad_name"),
    ("AdSet id", "adset_id"),
    ("AdSet name", "adset_name"),
    ("AdSet status", "adset_status"),
    ("AdSet start date", "adset_start_date"),
    ("Thumbnail url", "thumbnail_url"),
    ("Thumbnail Image", "thumbnail_image"),
    ("Link to promoted post", "link_to_promoted_post"),
    ("Cost per New Conversation started", "cost_per_new_conversation_started"),
    ("Ad status", "ad_status"),
    ("Campaign id", "campaign_id"),
    ("Campaign name", "campaign_name"),
    ("Campaign status", "campaign_status"),
];

/// 平均成本表列名映射
pub const AVG_COLUMNS: &[(&str, &str)] = &[
    ("Account id", "account_id"),
    ("Account name", "account_name"),
    ("Account Currency", "account_currency"),
    ("Campaign id", "campaign_id"),
    ("Campaign name", "campaign_name"),
    ("Campaign status", "campaign_status"),
    ("Cost per New Conversation started", "cost_per_new_conversation_started"),
];

/// 阈值加价
const MARKUP: f64 = 1.3;
/// 以色列新谢克尔计价时的加价倍数
const ILS_MULTIPLIER: f64 = 3.5;
const ILS_CURRENCIES: [&str; 3] = ["ILS", "SHEKEL", "₪"];

/// 高成本广告分析器
#[derive(Clone)]
pub struct Analyzer {
    fetcher: Fetcher,
    ads_url: String,
    avg_url: String,
}

impl Analyzer {
    pub fn new(fetcher: Fetcher, ads_url: impl Into<String>, avg_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            ads_url: ads_url.into(),
            avg_url: avg_url.into(),
        }
    }

    /// 抓取并合并两张报表，返回全部广告行（未过滤）
    ///
    /// 任一报表为空时返回空结果。
    pub async fn process(&self) -> Result<Vec<MergedRecord>, AnalyzeError> {
        let mut ads = self.fetcher.fetch(&self.ads_url).await;
        let mut avg = self.fetcher.fetch(&self.avg_url).await;

        if ads.is_empty() || avg.is_empty() {
            tracing::info!(
                ads_rows = ads.row_count(),
                avg_rows = avg.row_count(),
                "报表为空，跳过分析"
            );
            return Ok(Vec::new());
        }

        ads.rename_columns(ADS_COLUMNS);
        avg.rename_columns(AVG_COLUMNS);

        merge(&ads, &avg)
    }
}

/// 以 campaign_id left join 广告表与平均成本表
///
/// 每条广告行恰好产出一条记录；平均成本表中同一 campaign_id 出现多次时取第一行。
pub fn merge(ads: &Table, avg: &Table) -> Result<Vec<MergedRecord>, AnalyzeError> {
    let ads_campaign = require_column(ads, TableKind::Ads, CAMPAIGN_ID)?;
    let ads_cost = require_column(ads, TableKind::Ads, COST_COLUMN)?;
    let ads_account = require_column(ads, TableKind::Ads, ACCOUNT_ID)?;
    let ads_ad = require_column(ads, TableKind::Ads, AD_ID)?;
    let ads_currency = ads.column_index(ACCOUNT_CURRENCY);

    let avg_campaign = require_column(avg, TableKind::Averages, CAMPAIGN_ID)?;
    let avg_cost = require_column(avg, TableKind::Averages, COST_COLUMN)?;
    let avg_currency = require_column(avg, TableKind::Averages, ACCOUNT_CURRENCY)?;

    let mut averages: HashMap<String, AvgMatch> = HashMap::new();
    for row in avg.rows() {
        averages
            .entry(join_key(&row[avg_campaign]))
            .or_insert_with(|| AvgMatch::Matched {
                cost: parse_numeric(&row[avg_cost]),
                currency: row[avg_currency].clone(),
            });
    }

    let records: Vec<MergedRecord> = ads
        .rows()
        .iter()
        .map(|row| {
            let fields: LinkedHashMap<String, Cell> = ads
                .columns()
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect();

            let avg = averages
                .get(&join_key(&row[ads_campaign]))
                .cloned()
                .unwrap_or(AvgMatch::Unmatched);
            let threshold = compute_threshold(avg.avg_cost(), ads_currency.map(|idx| &row[idx]));

            MergedRecord {
                fields,
                cost: parse_numeric(&row[ads_cost]),
                avg,
                threshold,
                ad_link: build_ad_link(&row[ads_account], &row[ads_ad]),
            }
        })
        .collect();

    let matched = records
        .iter()
        .filter(|r| matches!(r.avg, AvgMatch::Matched { .. }))
        .count();
    tracing::debug!(
        rows = records.len(),
        matched,
        unmatched = records.len() - matched,
        "报表合并完成"
    );

    Ok(records)
}

/// 只保留实际成本严格高于阈值的记录
pub fn filter_high_cost(records: Vec<MergedRecord>) -> Vec<MergedRecord> {
    records.into_iter().filter(MergedRecord::is_high_cost).collect()
}

/// 单元格数值化：数字原样返回，数字字符串解析，其余一律视为缺失
pub fn parse_numeric(cell: &Cell) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
        _ => None,
    }
}

/// 计算阈值：ILS 计价加价 1.3 × 3.5，其余币种加价 1.3
///
/// 使用广告行自身的币种。
pub fn compute_threshold(avg_cost: f64, currency: Option<&Cell>) -> f64 {
    let currency = currency.map(cell_text).unwrap_or_default().to_uppercase();
    if ILS_CURRENCIES.contains(&currency.as_str()) {
        avg_cost + MARKUP * ILS_MULTIPLIER
    } else {
        avg_cost + MARKUP
    }
}

/// 生成 Ads Manager 中定位该广告的链接
pub fn build_ad_link(account_id: &Cell, ad_id: &Cell) -> String {
    let account_id = cell_text(account_id);
    let ad_id = cell_text(ad_id);
    format!(
        "https://adsmanager.facebook.com/adsmanager/manage/ads?act={account_id}\
         &filter_set=SEARCH_BY_AD_ID-STRING%1EEQUAL%1E%22{ad_id}%22\
         &selected_ad_ids={ad_id}&sort=delivery_info~1"
    )
}

fn require_column(table: &Table, kind: TableKind, column: &str) -> Result<usize, AnalyzeError> {
    table
        .column_index(column)
        .ok_or_else(|| AnalyzeError::MissingColumn {
            table: kind,
            column: column.to_string(),
        })
}

/// join 键：单元格的 JSON 表示，字符串 "1" 与数字 1 不相等
fn join_key(cell: &Cell) -> String {
    cell.to_string()
}

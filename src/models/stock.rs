//! 股票数据模型
//!
//! 定义市值排行页面每一行对应的数据结构

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 目标表的列顺序，CSV 与 COPY 均按此顺序输出
pub const COLUMN_NAMES: [&str; 14] = [
    "name",
    "stock_code",
    "price",
    "change_status",
    "price_change_value",
    "change_rate_text",
    "par_value",
    "market_cap",
    "listed_shares",
    "foreign_ratio",
    "volume",
    "per",
    "roe",
    "scraped_at",
];

/// 返回目标表的列名（含 scraped_at）
pub fn get_column_names() -> &'static [&'static str] {
    &COLUMN_NAMES
}

/// 涨跌状态
///
/// 序列化为页面上显示的标签，写入 CSV 和数据库的也是这些标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeStatus {
    #[serde(rename = "상승")]
    Risen,
    #[serde(rename = "하락")]
    Fallen,
    #[serde(rename = "보합")]
    Unchanged,
}

impl ChangeStatus {
    /// 解析页面上的状态标签，涨停/跌停归入上涨/下跌
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "상승" | "상한가" => Some(Self::Risen),
            "하락" | "하한가" => Some(Self::Fallen),
            "보합" => Some(Self::Unchanged),
            _ => None,
        }
    }
}

/// 单只股票的行情快照
///
/// 字段顺序即 CSV 列顺序。`scraped_at` 只在加载时打上，
/// 未打时间戳时 CSV 中不输出该列。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    /// 股票名称
    pub name: String,
    /// 交易所代码（6 位）
    pub stock_code: String,
    /// 当前价格
    pub price: i64,
    /// 涨跌状态
    pub change_status: ChangeStatus,
    /// 涨跌额（绝对值）
    pub price_change_value: i64,
    /// 涨跌幅，保持页面原样，如 "+1.23%"
    pub change_rate_text: String,
    /// 面值
    pub par_value: i64,
    /// 市值（单位：亿韩元）
    pub market_cap: i64,
    /// 上市股数
    pub listed_shares: i64,
    /// 外资持股比例（%）
    pub foreign_ratio: f64,
    /// 成交量
    pub volume: i64,
    pub per: f64,
    pub roe: f64,
    /// 抓取日期
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<NaiveDate>,
}

/// 看板筛选参数
#[derive(Debug, Default, Deserialize)]
pub struct StockFilter {
    /// 最小 PER（默认 5）
    pub per_min: Option<f64>,
    /// 最大 PER（默认 30）
    pub per_max: Option<f64>,
    /// 最小市值（亿），默认取数据集最小值
    pub cap_min: Option<i64>,
    /// 最大市值（亿），默认取数据集最大值
    pub cap_max: Option<i64>,
    /// 排序字段
    pub sort: Option<SortField>,
    /// 排序方向
    pub order: Option<SortOrder>,
    /// 返回数量限制
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Price,
    PriceChangeValue,
    MarketCap,
    ListedShares,
    ForeignRatio,
    Volume,
    Per,
    Roe,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// 看板返回的行：原始记录加上韩文单位的展示字段
#[derive(Debug, Serialize)]
pub struct StockView {
    #[serde(flatten)]
    pub record: StockRecord,
    /// 如 "123만 4,500원"
    pub price_display: String,
    pub price_change_display: String,
    /// 如 "45조 9,960억원"
    pub market_cap_display: String,
    pub volume_display: String,
}

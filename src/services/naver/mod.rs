//! 네이버 금융 市值排行页面抓取
//!
//! 数据来源: https://finance.naver.com/sise/sise_market_sum.naver
//!
//! ## 流程
//! - `fetcher`: 每页一次 GET，返回解码后的 HTML
//! - `extractor`: 解析 `table.type_2` 的行为 [`StockRecord`](crate::models::StockRecord)

pub mod extractor;
pub mod fetcher;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Asia::Seoul;
use chrono_tz::Tz;
use reqwest::StatusCode;

pub use extractor::extract;
pub use fetcher::ListingFetcher;

/// 抓取失败的种类
///
/// `Http` / `HttpStatus` 表示站点不可达，`NoRows` 表示页面正常返回但没有解析出任何行
/// （通常是页面结构变了）。两者都意味着没有数据集，但日志中可以区分。
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}")]
    HttpStatus { status: StatusCode },
    #[error("invalid listing url: {0}")]
    Url(#[from] url::ParseError),
    #[error("no rows parsed from {pages} page(s)")]
    NoRows { pages: u32 },
}

/// 获取韩国时间（UTC+9）
pub fn kst_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&Seoul)
}

/// 韩国时间的今天，作为抓取日期和分区日期
pub fn kst_today() -> NaiveDate {
    kst_now().date_naive()
}

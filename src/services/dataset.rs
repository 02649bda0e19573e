//! 数据集构建
//!
//! 把多页抓取结果合并为一个有序的数据集

use std::collections::HashSet;

use crate::models::StockRecord;
use crate::services::naver::{self, ListingFetcher, ScrapeError};

/// 一次抓取得到的全部记录，保持页面顺序
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<StockRecord>,
}

impl Dataset {
    /// 合并记录；同一批次内重复的代码只保留第一次出现的行。
    /// 没有任何记录时返回 `None`
    pub fn build(records: Vec<StockRecord>) -> Option<Self> {
        let mut seen = HashSet::new();
        let records: Vec<StockRecord> = records
            .into_iter()
            .filter(|r| {
                let fresh = seen.insert(r.stock_code.clone());
                if !fresh {
                    log::debug!("重复的股票代码 {}，忽略", r.stock_code);
                }
                fresh
            })
            .collect();

        if records.is_empty() {
            return None;
        }
        Some(Self { records })
    }

    pub fn records(&self) -> &[StockRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, stock_code: &str) -> Option<&StockRecord> {
        self.records.iter().find(|r| r.stock_code == stock_code)
    }
}

/// 依次抓取 1..=pages 页并构建数据集
///
/// 任意一页请求失败即中止；请求都成功但解析不出任何行时返回 `NoRows`
pub async fn scrape(fetcher: &ListingFetcher, pages: u32) -> Result<Dataset, ScrapeError> {
    let mut records = Vec::new();

    for page in 1..=pages.max(1) {
        let html = fetcher.fetch(page).await?;
        let rows = naver::extract(&html);
        log::info!("第 {} 页解析到 {} 条记录", page, rows.len());
        records.extend(rows);
    }

    Dataset::build(records).ok_or(ScrapeError::NoRows { pages: pages.max(1) })
}

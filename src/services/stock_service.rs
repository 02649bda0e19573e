//! 看板数据服务
//!
//! 抓取结果在进程内缓存 `cache_ttl_secs` 秒，之后的请求重新抓取

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::models::{SortField, SortOrder, StockFilter, StockRecord, StockView};
use crate::services::dataset::{self, Dataset};
use crate::services::display::{format_korean_units, format_market_cap_korean, format_price_korean};
use crate::services::naver::{ListingFetcher, ScrapeError};

/// 默认 PER 下限
pub const DEFAULT_PER_MIN: f64 = 5.0;
/// 默认 PER 上限
pub const DEFAULT_PER_MAX: f64 = 30.0;

struct CachedDataset {
    fetched_at: Instant,
    dataset: Arc<Dataset>,
}

pub struct StockService {
    fetcher: ListingFetcher,
    pages: u32,
    ttl: Duration,
    cache: RwLock<Option<CachedDataset>>,
}

impl StockService {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: ListingFetcher::new(&config.scrape)?,
            pages: config.scrape.pages,
            ttl: Duration::from_secs(config.server.cache_ttl_secs),
            cache: RwLock::new(None),
        })
    }

    fn fresh(&self, cached: &Option<CachedDataset>) -> Option<Arc<Dataset>> {
        cached
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.dataset.clone())
    }

    /// 获取最新数据集，缓存过期时重新抓取
    pub async fn dataset(&self) -> Result<Arc<Dataset>, ScrapeError> {
        if let Some(dataset) = self.fresh(&*self.cache.read().await) {
            return Ok(dataset);
        }

        let mut guard = self.cache.write().await;
        // 等锁期间可能已被其他请求刷新
        if let Some(dataset) = self.fresh(&guard) {
            return Ok(dataset);
        }

        let dataset = Arc::new(dataset::scrape(&self.fetcher, self.pages).await?);
        log::info!("行情缓存已刷新，共 {} 条", dataset.len());
        *guard = Some(CachedDataset {
            fetched_at: Instant::now(),
            dataset: dataset.clone(),
        });
        Ok(dataset)
    }

    /// 按条件筛选股票列表
    pub async fn list_stocks(&self, filter: &StockFilter) -> anyhow::Result<Vec<StockView>> {
        let dataset = self.dataset().await?;
        Ok(filter_stocks(&dataset, filter).into_iter().map(to_view).collect())
    }

    /// 按代码查询单只股票
    pub async fn get_stock(&self, stock_code: &str) -> anyhow::Result<Option<StockView>> {
        let dataset = self.dataset().await?;
        Ok(dataset.find(stock_code).map(to_view))
    }
}

/// 筛选：`per_min ≤ PER ≤ per_max` 且 PER ≠ 0，`cap_min ≤ 市值 ≤ cap_max`；
/// 未给出市值范围时取数据集的最小/最大值。未指定排序时保持页面顺序
pub fn filter_stocks<'a>(dataset: &'a Dataset, filter: &StockFilter) -> Vec<&'a StockRecord> {
    let records = dataset.records();
    let per_min = filter.per_min.unwrap_or(DEFAULT_PER_MIN);
    let per_max = filter.per_max.unwrap_or(DEFAULT_PER_MAX);
    let cap_min = filter
        .cap_min
        .unwrap_or_else(|| records.iter().map(|r| r.market_cap).min().unwrap_or(0));
    let cap_max = filter
        .cap_max
        .unwrap_or_else(|| records.iter().map(|r| r.market_cap).max().unwrap_or(i64::MAX));

    let mut matched: Vec<&StockRecord> = records
        .iter()
        .filter(|r| r.per != 0.0 && r.per >= per_min && r.per <= per_max)
        .filter(|r| r.market_cap >= cap_min && r.market_cap <= cap_max)
        .collect();

    if let Some(field) = filter.sort {
        let order = filter.order.unwrap_or_default();
        matched.sort_by(|a, b| {
            let ord = sort_key(a, field)
                .partial_cmp(&sort_key(b, field))
                .unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }

    if let Some(limit) = filter.limit {
        matched.truncate(limit);
    }
    matched
}

fn sort_key(record: &StockRecord, field: SortField) -> f64 {
    match field {
        SortField::Price => record.price as f64,
        SortField::PriceChangeValue => record.price_change_value as f64,
        SortField::MarketCap => record.market_cap as f64,
        SortField::ListedShares => record.listed_shares as f64,
        SortField::ForeignRatio => record.foreign_ratio,
        SortField::Volume => record.volume as f64,
        SortField::Per => record.per,
        SortField::Roe => record.roe,
    }
}

pub fn to_view(record: &StockRecord) -> StockView {
    StockView {
        price_display: format_price_korean(record.price),
        price_change_display: format_price_korean(record.price_change_value),
        market_cap_display: format_market_cap_korean(record.market_cap),
        volume_display: format_korean_units(record.volume),
        record: record.clone(),
    }
}

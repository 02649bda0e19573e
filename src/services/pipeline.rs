//! 抓取 → 落盘 → 入库 主流程
//!
//! 顺序执行，不重试。抓取失败时不会触碰数据库

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;

use crate::config::AppConfig;
use crate::services::csv_store::{self, CsvStore};
use crate::services::dataset::{self, Dataset};
use crate::services::db::{Database, DbError};
use crate::services::naver::{ListingFetcher, ScrapeError};

/// 数据集写入目标
#[allow(async_fn_in_trait)]
pub trait DatasetLoader {
    async fn load_dataset(&self, dataset: &Dataset, date: NaiveDate) -> Result<u64, DbError>;
}

impl DatasetLoader for Database {
    async fn load_dataset(&self, dataset: &Dataset, date: NaiveDate) -> Result<u64, DbError> {
        self.load(dataset, date).await
    }
}

/// 一次完整运行的结果
#[derive(Debug)]
pub struct PipelineReport {
    pub rows_scraped: usize,
    pub csv_path: PathBuf,
    pub rows_loaded: u64,
}

pub struct Pipeline<L> {
    fetcher: ListingFetcher,
    pages: u32,
    store: CsvStore,
    loader: L,
}

impl Pipeline<Database> {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            ListingFetcher::new(&config.scrape)?,
            config.scrape.pages,
            CsvStore::new(config.output.data_dir.clone()),
            Database::new(&config.database),
        ))
    }
}

impl<L: DatasetLoader> Pipeline<L> {
    pub fn new(fetcher: ListingFetcher, pages: u32, store: CsvStore, loader: L) -> Self {
        Self { fetcher, pages, store, loader }
    }

    /// 抓取并保存 CSV
    pub async fn scrape_and_save(&self, date: NaiveDate) -> anyhow::Result<(Dataset, PathBuf)> {
        let dataset = match dataset::scrape(&self.fetcher, self.pages).await {
            Ok(dataset) => dataset,
            Err(e) => {
                match &e {
                    ScrapeError::NoRows { .. } => {
                        log::error!("页面已返回但未解析出任何数据，页面结构可能已变化: {}", e)
                    }
                    _ => log::error!("抓取失败: {}", e),
                }
                return Err(e.into());
            }
        };
        log::info!("네이버 금융 抓取成功，共 {} 条", dataset.len());

        let path = self
            .store
            .save(&dataset, date)
            .context("CSV 文件保存失败")?;
        Ok((dataset, path))
    }

    /// 完整流程：抓取 → 保存 → 入库
    pub async fn run(&self, date: NaiveDate) -> anyhow::Result<PipelineReport> {
        let (dataset, csv_path) = self.scrape_and_save(date).await?;
        let rows_loaded = self.load(&dataset, date).await?;

        Ok(PipelineReport {
            rows_scraped: dataset.len(),
            csv_path,
            rows_loaded,
        })
    }

    /// 加载之前保存的 CSV，分区日期取自文件名
    pub async fn load_file(&self, path: &Path) -> anyhow::Result<u64> {
        let loaded = csv_store::date_from_path(path)
            .and_then(|date| CsvStore::read(path).map(|dataset| (dataset, date)));

        let (dataset, date) = match loaded {
            Ok(v) => v,
            Err(e) => {
                log::error!("读取数据文件 {} 失败: {}", path.display(), e);
                return Err(e.into());
            }
        };

        log::info!("'{}' 读取到 {} 条记录，日期 {}", path.display(), dataset.len(), date);
        self.load(&dataset, date).await
    }

    async fn load(&self, dataset: &Dataset, date: NaiveDate) -> anyhow::Result<u64> {
        match self.loader.load_dataset(dataset, date).await {
            Ok(rows) => {
                log::info!("数据入库成功: {} 行", rows);
                Ok(rows)
            }
            Err(e) => {
                log::error!("数据库错误: {}", e);
                Err(e.into())
            }
        }
    }
}

//! CSV 存取
//!
//! - 落盘文件: `<data_dir>/kospi_stocks_<YYYYMMDD>.csv`，UTF-8 带 BOM，有表头，不含 scraped_at
//! - COPY 数据流: 无表头，末尾追加 scraped_at，列顺序与目标表一致

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use regex::Regex;

use crate::models::StockRecord;
use crate::services::dataset::Dataset;

const BOM: &str = "\u{feff}";
const FILE_PREFIX: &str = "kospi_stocks";

#[derive(thiserror::Error, Debug)]
pub enum CsvError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data file name: {0}")]
    InvalidFileName(String),
    #[error("data file {0} contains no rows")]
    Empty(PathBuf),
}

/// 负责 CSV 文件的命名、写入与读取
pub struct CsvStore {
    data_dir: PathBuf,
}

impl CsvStore {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self { data_dir: data_dir.into() }
    }

    /// 某日对应的文件路径
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(file_name_for(date))
    }

    /// 写出数据集，目录不存在时自动创建
    pub fn save(&self, dataset: &Dataset, date: NaiveDate) -> Result<PathBuf, CsvError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.path_for(date);

        let mut file = fs::File::create(&path)?;
        file.write_all(BOM.as_bytes())?;
        let mut writer = csv::Writer::from_writer(file);
        for record in dataset.records() {
            writer.serialize(record)?;
        }
        writer.flush()?;

        log::info!("数据已保存到 {}（{} 条）", path.display(), dataset.len());
        Ok(path)
    }

    /// 读取之前保存的文件
    pub fn read(path: &Path) -> Result<Dataset, CsvError> {
        let content = fs::read_to_string(path)?;
        let records = parse_records(content.strip_prefix(BOM).unwrap_or(&content), true)?;
        Dataset::build(records).ok_or_else(|| CsvError::Empty(path.to_path_buf()))
    }
}

/// `kospi_stocks_20250919.csv`
pub fn file_name_for(date: NaiveDate) -> String {
    format!("{}_{}.csv", FILE_PREFIX, date.format("%Y%m%d"))
}

/// 从文件名中取出日期：文件名（去扩展名）最后一个 `_` 之后的 8 位数字
pub fn date_from_path(path: &Path) -> Result<NaiveDate, CsvError> {
    let invalid = || CsvError::InvalidFileName(path.display().to_string());

    let date_re = Regex::new(r"_(\d{8})$").expect("static regex");
    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    let token = date_re
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .ok_or_else(invalid)?;
    NaiveDate::parse_from_str(token.as_str(), "%Y%m%d").map_err(|_| invalid())
}

/// 生成 COPY 数据流：每条记录打上 `scraped_at`，无表头
pub fn to_copy_payload(dataset: &Dataset, scraped_at: NaiveDate) -> Result<Vec<u8>, CsvError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    for record in dataset.records() {
        let stamped = StockRecord {
            scraped_at: Some(scraped_at),
            ..record.clone()
        };
        writer.serialize(&stamped)?;
    }

    writer
        .into_inner()
        .map_err(|e| CsvError::Io(e.into_error()))
}

/// 解析 CSV 文本；无表头时按列位置对应字段
pub fn parse_records(text: &str, has_headers: bool) -> Result<Vec<StockRecord>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

//! PostgreSQL 加载
//!
//! 目标父表 `<schema>.daily_kospi_data` 需事先按 scraped_at 建好范围分区；
//! 本模块按天创建子分区并用 COPY 批量写入。
//!
//! 一次运行只建立一个连接、一个事务：分区创建（如需）+ COPY + 提交。
//! 连接随 [`Connection`] 一起释放，出错路径同样会关闭。

pub mod ident;
pub mod loader;
pub mod partition;

use std::time::Duration;

use bytes::Bytes;
use chrono::NaiveDate;
use futures::SinkExt;
use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Transaction};

use crate::config::DatabaseConfig;
use crate::services::csv_store::CsvError;
use crate::services::dataset::Dataset;

pub use partition::{PartitionManager, PartitionRef};

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    /// 建表时对象已存在（并发创建同一分区时出现）
    #[error("object already exists: {0}")]
    Duplicate(String),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] CsvError),
    #[error("date {0} has no following day")]
    DateOutOfRange(NaiveDate),
    #[error("database load timed out after {0:?}")]
    Timeout(Duration),
}

/// DDL 的错误分类：对象已存在归为 `Duplicate`
///
/// 并发 `CREATE TABLE` 时 Postgres 可能在 pg_type 上报 unique_violation，
/// 所以这里也算作已存在。其他语句不做此分类
fn classify_ddl_error(e: tokio_postgres::Error) -> DbError {
    let duplicate = matches!(
        e.code(),
        Some(code) if *code == SqlState::DUPLICATE_TABLE
            || *code == SqlState::DUPLICATE_OBJECT
            || *code == SqlState::UNIQUE_VIOLATION
    );
    if duplicate {
        DbError::Duplicate(e.to_string())
    } else {
        DbError::Postgres(e)
    }
}

/// 分区管理器与批量加载器所需的最小数据库操作
#[allow(async_fn_in_trait)]
pub trait PgSession {
    /// 查询系统目录中表是否存在
    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool, DbError>;
    /// 执行不带参数的语句
    async fn execute_batch(&self, sql: &str) -> Result<(), DbError>;
    /// 执行建表语句，对象已存在时返回 [`DbError::Duplicate`]
    async fn execute_ddl(&self, sql: &str) -> Result<(), DbError>;
    /// `COPY ... FROM STDIN`，返回写入行数
    async fn copy_in(&self, sql: &str, payload: Bytes) -> Result<u64, DbError>;
}

impl PgSession for Transaction<'_> {
    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool, DbError> {
        let row = self
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM pg_tables WHERE schemaname = $1 AND tablename = $2)",
                &[&schema, &table],
            )
            .await?;
        Ok(row.try_get::<_, bool>(0)?)
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        self.batch_execute(sql).await?;
        Ok(())
    }

    async fn execute_ddl(&self, sql: &str) -> Result<(), DbError> {
        self.batch_execute(sql).await.map_err(classify_ddl_error)
    }

    async fn copy_in(&self, sql: &str, payload: Bytes) -> Result<u64, DbError> {
        let sink = Transaction::copy_in::<str, Bytes>(self, sql).await?;
        futures::pin_mut!(sink);
        sink.send(payload).await?;
        let rows = sink.finish().await?;
        Ok(rows)
    }
}

/// 单次运行持有的连接；drop 时关闭
pub struct Connection {
    client: Client,
    driver: JoinHandle<()>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.driver.abort();
        log::debug!("数据库连接已关闭");
    }
}

/// 数据库加载入口，配置在构造时传入
pub struct Database {
    config: DatabaseConfig,
    partitions: PartitionManager,
}

impl Database {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            config: config.clone(),
            partitions: PartitionManager::new(&config.schema, &config.base_table),
        }
    }

    async fn connect(&self) -> Result<Connection, DbError> {
        let c = &self.config;
        let mut pg = tokio_postgres::Config::new();
        pg.host(&c.host)
            .port(c.port)
            .dbname(&c.dbname)
            .user(&c.user)
            .password(&c.password)
            .connect_timeout(Duration::from_secs(c.connect_timeout_secs));

        let (client, connection) = pg.connect(NoTls).await?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("数据库连接错误: {}", e);
            }
        });
        log::debug!("已连接数据库 {}:{}/{}", c.host, c.port, c.dbname);

        Ok(Connection { client, driver })
    }

    /// 把数据集写入 `date` 对应的分区，返回写入行数
    pub async fn load(&self, dataset: &Dataset, date: NaiveDate) -> Result<u64, DbError> {
        let limit = Duration::from_secs(self.config.load_timeout_secs);
        match tokio::time::timeout(limit, self.load_once(dataset, date)).await {
            Ok(result) => result,
            Err(_) => Err(DbError::Timeout(limit)),
        }
    }

    async fn load_once(&self, dataset: &Dataset, date: NaiveDate) -> Result<u64, DbError> {
        let mut conn = self.connect().await?;
        let tx = conn.client.transaction().await?;
        let rows = load_in_session(&self.partitions, &tx, dataset, date).await?;
        tx.commit().await?;
        Ok(rows)
    }
}

/// 在一个会话内完成：确保分区存在 → COPY
pub async fn load_in_session<S: PgSession>(
    partitions: &PartitionManager,
    session: &S,
    dataset: &Dataset,
    date: NaiveDate,
) -> Result<u64, DbError> {
    let partition = partitions.ensure_partition(session, date).await?;
    log::info!("正在向 {} 写入 {} 条记录", partition.name, dataset.len());
    let rows = loader::load(session, dataset, &partition, date).await?;
    log::info!("写入完成: {} 行", rows);
    Ok(rows)
}


#[cfg(test)]
mod tests {
    use super::fake::FakeSession;
    use super::*;
    use crate::services::naver::{self, extractor::fixtures};

    fn dataset() -> Dataset {
        Dataset::build(naver::extract(&fixtures::listing_page())).unwrap()
    }

    #[tokio::test]
    async fn test_load_creates_partition_then_copies() {
        let session = FakeSession::default();
        let partitions = PartitionManager::new("kospi", "daily_kospi_data");
        let date = NaiveDate::from_ymd_opt(2025, 9, 19).unwrap();

        let rows = load_in_session(&partitions, &session, &dataset(), date).await.unwrap();
        assert_eq!(rows, 3);

        let statements = session.statements();
        let create = statements.iter().position(|s| s.starts_with("CREATE TABLE")).unwrap();
        let copy = statements.iter().position(|s| s.starts_with("COPY")).unwrap();
        assert!(create < copy);
    }

    #[tokio::test]
    async fn test_load_failure_surfaces() {
        let session = FakeSession { fail_copy: true, ..FakeSession::default() };
        let partitions = PartitionManager::new("kospi", "daily_kospi_data");
        let date = NaiveDate::from_ymd_opt(2025, 9, 19).unwrap();

        assert!(load_in_session(&partitions, &session, &dataset(), date).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_during_copy_is_not_swallowed() {
        let session = FakeSession {
            race_on_create: true,
            duplicate_on_copy: true,
            ..FakeSession::default()
        };
        let partitions = PartitionManager::new("kospi", "daily_kospi_data");
        let date = NaiveDate::from_ymd_opt(2025, 9, 19).unwrap();

        // 建分区时的“已存在”被容忍，COPY 时的同类错误照常返回
        let err = load_in_session(&partitions, &session, &dataset(), date).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));
        assert_eq!(session.count_starting_with("ROLLBACK TO SAVEPOINT"), 1);
        assert_eq!(session.count_starting_with("COPY"), 1);
    }

    #[tokio::test]
    async fn test_unreachable_database_fails_fast() {
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_secs: 1,
            load_timeout_secs: 5,
            ..DatabaseConfig::default()
        };
        let db = Database::new(&config);
        let date = NaiveDate::from_ymd_opt(2025, 9, 19).unwrap();
        assert!(db.load(&dataset(), date).await.is_err());
    }
}

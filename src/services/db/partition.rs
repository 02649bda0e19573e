//! 按天分区管理
//!
//! 分区名 = 父表名 + `_YYYYMMDD`，范围 `[date, date + 1)`。
//! 先查目录再创建；并发创建时由 `IF NOT EXISTS` 和保存点兜底，
//! 撞上“已存在”错误时回滚到保存点继续执行。

use chrono::NaiveDate;

use super::ident::{qualified, quote_literal};
use super::{DbError, PgSession};

const SAVEPOINT: &str = "ensure_partition";

/// 已确认存在的分区
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRef {
    pub schema: String,
    pub name: String,
    /// 下界（含）
    pub from: NaiveDate,
    /// 上界（不含）
    pub to: NaiveDate,
}

impl PartitionRef {
    /// `"schema"."daily_kospi_data_20250919"`
    pub fn qualified_name(&self) -> String {
        qualified(&self.schema, &self.name)
    }
}

/// `daily_kospi_data_20250919`
pub fn partition_name(base_table: &str, date: NaiveDate) -> String {
    format!("{}_{}", base_table, date.format("%Y%m%d"))
}

/// 分区范围 `[date, date + 1)`
pub fn partition_bounds(date: NaiveDate) -> Result<(NaiveDate, NaiveDate), DbError> {
    let next = date.succ_opt().ok_or(DbError::DateOutOfRange(date))?;
    Ok((date, next))
}

pub struct PartitionManager {
    schema: String,
    base_table: String,
}

impl PartitionManager {
    pub fn new(schema: &str, base_table: &str) -> Self {
        Self {
            schema: schema.to_string(),
            base_table: base_table.to_string(),
        }
    }

    /// 计算某日的分区，不访问数据库
    pub fn partition_for(&self, date: NaiveDate) -> Result<PartitionRef, DbError> {
        let (from, to) = partition_bounds(date)?;
        Ok(PartitionRef {
            schema: self.schema.clone(),
            name: partition_name(&self.base_table, date),
            from,
            to,
        })
    }

    pub fn create_statement(&self, partition: &PartitionRef) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} PARTITION OF {} FOR VALUES FROM ({}) TO ({})",
            partition.qualified_name(),
            qualified(&self.schema, &self.base_table),
            quote_literal(&partition.from.format("%Y-%m-%d").to_string()),
            quote_literal(&partition.to.format("%Y-%m-%d").to_string()),
        )
    }

    /// 确保 `date` 的分区存在，返回供加载器使用的引用
    pub async fn ensure_partition<S: PgSession>(
        &self,
        session: &S,
        date: NaiveDate,
    ) -> Result<PartitionRef, DbError> {
        let partition = self.partition_for(date)?;

        if session.table_exists(&partition.schema, &partition.name).await? {
            log::debug!("分区 {} 已存在", partition.name);
            return Ok(partition);
        }

        log::info!("分区 {} 不存在，开始创建", partition.name);
        self.create(session, &partition).await?;
        Ok(partition)
    }

    async fn create<S: PgSession>(&self, session: &S, partition: &PartitionRef) -> Result<(), DbError> {
        session.execute_batch(&format!("SAVEPOINT {}", SAVEPOINT)).await?;

        match session.execute_ddl(&self.create_statement(partition)).await {
            Ok(()) => {
                session.execute_batch(&format!("RELEASE SAVEPOINT {}", SAVEPOINT)).await?;
                log::info!("分区 {} 创建成功", partition.qualified_name());
                Ok(())
            }
            Err(DbError::Duplicate(msg)) => {
                log::warn!("分区 {} 已由其他进程创建: {}", partition.name, msg);
                session.execute_batch(&format!("ROLLBACK TO SAVEPOINT {}", SAVEPOINT)).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fake::FakeSession;
    use super::*;
    use std::sync::atomic::Ordering;

    fn sept_19() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 19).unwrap()
    }

    #[test]
    fn test_name_and_bounds() {
        assert_eq!(partition_name("daily_kospi_data", sept_19()), "daily_kospi_data_20250919");

        let (from, to) = partition_bounds(sept_19()).unwrap();
        assert_eq!(from.to_string(), "2025-09-19");
        assert_eq!(to.to_string(), "2025-09-20");

        let (_, next_year) = partition_bounds(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()).unwrap();
        assert_eq!(next_year.to_string(), "2025-01-01");
        assert!(partition_bounds(NaiveDate::MAX).is_err());
    }

    #[test]
    fn test_create_statement() {
        let manager = PartitionManager::new("kospi", "daily_kospi_data");
        let partition = manager.partition_for(sept_19()).unwrap();
        assert_eq!(
            manager.create_statement(&partition),
            "CREATE TABLE IF NOT EXISTS \"kospi\".\"daily_kospi_data_20250919\" \
             PARTITION OF \"kospi\".\"daily_kospi_data\" \
             FOR VALUES FROM ('2025-09-19') TO ('2025-09-20')"
        );
    }

    #[test]
    fn test_schema_is_quoted() {
        let manager = PartitionManager::new("ko\"spi", "daily_kospi_data");
        let partition = manager.partition_for(sept_19()).unwrap();
        assert!(manager.create_statement(&partition).contains("\"ko\"\"spi\".\"daily_kospi_data_20250919\""));
    }

    #[tokio::test]
    async fn test_ensure_partition_is_idempotent() {
        let session = FakeSession::default();
        let manager = PartitionManager::new("kospi", "daily_kospi_data");

        let first = manager.ensure_partition(&session, sept_19()).await.unwrap();
        let second = manager.ensure_partition(&session, sept_19()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.name, "daily_kospi_data_20250919");
        assert_eq!(session.count_starting_with("CREATE TABLE"), 1);
        assert_eq!(session.count_starting_with("RELEASE SAVEPOINT"), 1);
    }

    #[tokio::test]
    async fn test_existing_partition_is_not_created() {
        let session = FakeSession::default();
        session.exists.store(true, Ordering::SeqCst);
        let manager = PartitionManager::new("kospi", "daily_kospi_data");

        manager.ensure_partition(&session, sept_19()).await.unwrap();
        assert!(session.statements().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_creation_is_tolerated() {
        let session = FakeSession { race_on_create: true, ..FakeSession::default() };
        let manager = PartitionManager::new("kospi", "daily_kospi_data");

        let partition = manager.ensure_partition(&session, sept_19()).await.unwrap();
        assert_eq!(partition.name, "daily_kospi_data_20250919");
        assert_eq!(
            session.statements().last().map(String::as_str),
            Some("ROLLBACK TO SAVEPOINT ensure_partition")
        );
    }
}

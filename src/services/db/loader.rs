//! COPY 批量写入

use bytes::Bytes;
use chrono::NaiveDate;

use super::ident::column_list;
use super::{DbError, PartitionRef, PgSession};
use crate::models::get_column_names;
use crate::services::csv_store;
use crate::services::dataset::Dataset;

pub fn copy_statement(partition: &PartitionRef) -> String {
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, DELIMITER ',', NULL '', ENCODING 'UTF8')",
        partition.qualified_name(),
        column_list(get_column_names()),
    )
}

/// 每条记录打上 `scraped_at = date` 后整体 COPY 进分区，返回写入行数
pub async fn load<S: PgSession>(
    session: &S,
    dataset: &Dataset,
    partition: &PartitionRef,
    date: NaiveDate,
) -> Result<u64, DbError> {
    let payload = csv_store::to_copy_payload(dataset, date)?;
    session.copy_in(&copy_statement(partition), Bytes::from(payload)).await
}

//! SQL 标识符与字面量转义
//!
//! 所有拼进 SQL 的表名、列名都必须经过 [`quote_ident`]

/// 双引号包裹，内部双引号加倍：`kospi` → `"kospi"`，`a"b` → `"a""b"`
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// 单引号字面量，内部单引号加倍
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// 逗号分隔的列名列表
pub fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

//! 业务逻辑服务模块
//!
//! 抓取、落盘、入库与看板查询

pub mod csv_store;     // CSV 存取
pub mod dataset;       // 数据集构建
pub mod db;            // PostgreSQL 分区与 COPY
pub mod display;       // 韩文单位格式化
pub mod naver;         // 네이버 금융页面抓取
pub mod pipeline;      // 主流程
pub mod stock_service; // 看板数据服务

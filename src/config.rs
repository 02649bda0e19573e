//! 配置模块
//!
//! 启动时加载一次：默认值 → JSON 文件 → .env / 环境变量覆盖，
//! 之后以引用形式传入抓取器、分区管理器和批量加载器

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// 看板服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
    /// 行情缓存有效期（秒）
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

/// 抓取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// 市值排行页面地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 市场代码（sosok=0 为 KOSPI）
    #[serde(default)]
    pub market: u8,
    /// 抓取页数
    #[serde(default = "default_pages")]
    pub pages: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// PostgreSQL 配置
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_name")]
    pub dbname: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// 目标 schema
    #[serde(default = "default_schema")]
    pub schema: String,
    /// 按日期范围分区的父表
    #[serde(default = "default_base_table")]
    pub base_table: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// 分区创建 + COPY + 提交的总时限（秒）
    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: u64,
}

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV 输出目录
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_cache_ttl() -> u64 { 3600 }
fn default_base_url() -> String { "https://finance.naver.com/sise/sise_market_sum.naver".to_string() }
fn default_pages() -> u32 { 1 }
fn default_user_agent() -> String { "Mozilla/5.0".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_load_timeout() -> u64 { 120 }
fn default_db_host() -> String { "localhost".to_string() }
fn default_db_port() -> u16 { 5432 }
fn default_db_name() -> String { "postgres".to_string() }
fn default_db_user() -> String { "postgres".to_string() }
fn default_schema() -> String { "kospi".to_string() }
fn default_base_table() -> String { "daily_kospi_data".to_string() }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            market: 0,
            pages: default_pages(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            dbname: default_db_name(),
            user: default_db_user(),
            password: String::new(),
            schema: default_schema(),
            base_table: default_base_table(),
            connect_timeout_secs: default_connect_timeout(),
            load_timeout_secs: default_load_timeout(),
        }
    }
}

// 密码不进日志
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"***")
            .field("schema", &self.schema)
            .field("base_table", &self.base_table)
            .finish()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置
    ///
    /// 显式指定的文件必须能读取；否则依次尝试默认路径，都不存在时使用默认值。
    /// 最后用 `.env` 与进程环境变量覆盖数据库连接参数。
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::load_default_paths(),
        };

        // .env 不存在不算错误
        let _ = dotenvy::dotenv();
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    fn load_default_paths() -> Self {
        let config_paths = ["config.json", "config/config.json"];

        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        log::info!("从 {} 加载配置成功", path);
                        return config;
                    }
                    Err(e) => {
                        log::warn!("加载配置文件 {} 失败: {}", path, e);
                    }
                }
            }
        }

        log::info!("使用默认配置");
        Self::default()
    }

    /// 用环境变量覆盖配置；`lookup` 便于测试时注入
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;
        if let Some(v) = lookup("DB_HOST") { db.host = v; }
        if let Some(v) = lookup("DB_PORT") {
            match v.parse() {
                Ok(port) => db.port = port,
                Err(_) => log::warn!("DB_PORT 不是有效端口: {}", v),
            }
        }
        if let Some(v) = lookup("DB_NAME") { db.dbname = v; }
        if let Some(v) = lookup("DB_USER") { db.user = v; }
        if let Some(v) = lookup("DB_PASSWORD") { db.password = v; }
        if let Some(v) = lookup("DB_SCHEMA") { db.schema = v; }
        if let Some(v) = lookup("KOSPI_DATA_DIR") { self.output.data_dir = PathBuf::from(v); }
        if let Some(v) = lookup("KOSPI_BIND") {
            if let Some((host, port)) = v.rsplit_once(':') {
                if let Ok(port) = port.parse() {
                    self.server.host = host.to_string();
                    self.server.port = port;
                }
            }
        }
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

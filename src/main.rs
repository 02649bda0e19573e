//! KOSPI 行情采集服务
//!
//! 抓取네이버 금융市值排行 → 保存 CSV → 写入 PostgreSQL 当日分区，
//! 另提供只读的行情看板 API

mod config;     // 配置
mod handlers;   // HTTP 请求处理器
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use std::path::PathBuf;

use actix_web::{web, App, HttpServer, middleware::Logger};
use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::config::AppConfig;
use crate::services::naver::kst_today;
use crate::services::pipeline::Pipeline;
use crate::services::stock_service::StockService;

#[derive(Parser, Debug)]
#[command(name = "kospi-collector", version, about = "KOSPI 시가총액 데이터 수집기")]
struct Cli {
    /// 配置文件路径（JSON）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 抓取、保存并入库（默认）
    Run,
    /// 只抓取并保存 CSV
    Scrape,
    /// 将已保存的 CSV 写入数据库，日期取自文件名
    Load {
        path: PathBuf,
    },
    /// 启动行情看板 API
    Serve,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));
    log::debug!("配置: {:?}", config);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let today = kst_today();
            log::info!("开始采集 {} 的 KOSPI 数据", today);
            let report = Pipeline::from_config(&config)?.run(today).await?;
            log::info!(
                "采集完成: 抓取 {} 条, 文件 {}, 入库 {} 行",
                report.rows_scraped,
                report.csv_path.display(),
                report.rows_loaded
            );
        }
        Command::Scrape => {
            let (dataset, path) = Pipeline::from_config(&config)?
                .scrape_and_save(kst_today())
                .await?;
            log::info!("已保存 {} 条记录到 {}", dataset.len(), path.display());
        }
        Command::Load { path } => {
            let rows = Pipeline::from_config(&config)?.load_file(&path).await?;
            log::info!("{} 入库完成: {} 行", path.display(), rows);
        }
        Command::Serve => serve(&config).await?,
    }

    Ok(())
}

async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    let service = web::Data::new(StockService::new(config)?);
    let bind_addr = config.bind_addr();

    log::info!("启动 KOSPI 看板服务: http://{}", bind_addr);

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())  // 请求日志
            .app_data(service.clone())
            .configure(handlers::config)  // 配置路由
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(&bind_addr)?.run().await?;
    Ok(())
}

//! Standalone collector CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use macrodash_collector::{modules, CollectorConfig};
use macrodash_core::{init_logging, Exchange, IndicatorCatalog, LogConfig, ScreeningCriteria};
use macrodash_data::{DataManager, RefreshMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "macrodash-collector")]
#[command(about = "MacroDash Standalone Collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (TOML). 없으면 MACRODASH_CONFIG 환경 변수 사용
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 매크로 지표 1회 갱신
    Refresh {
        /// 유효 기간을 무시하고 전체 조회
        #[arg(long)]
        force: bool,

        /// 스냅샷을 JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 데몬 모드: 주기적으로 지표 갱신 (Enter = 즉시 전체 갱신)
    Daemon,

    /// 베트남 거래소 종목 스캔 후 저장
    Scan {
        /// 대상 거래소 (HOSE, HNX, UPCOM, VN30). 없으면 설정값
        #[arg(long)]
        exchange: Option<Exchange>,

        /// 특정 종목만 스캔 (쉼표로 구분, 예: "VNM,FPT")
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 저장된 스크리닝 결과 조회
    Show {
        /// 대상 거래소
        #[arg(long, default_value = "HOSE")]
        exchange: Exchange,

        /// 기본 스크리닝 조건으로 필터링
        #[arg(long)]
        screen: bool,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 지표 카탈로그 출력
    Indicators,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 설정 로드 (.env 포함)
    let config = match cli.config {
        Some(path) => CollectorConfig::load(Some(path)),
        None => CollectorConfig::from_env(),
    }
    .context("설정 로드 실패")?;

    // 로깅 초기화
    let mut log_config = LogConfig::from_settings(&config.app.logging);
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("MacroDash Collector 시작");
    tracing::debug!(config = ?config.app, "설정 로드 완료");

    match cli.command {
        Commands::Indicators => {
            let catalog = IndicatorCatalog::builtin()?;
            print!("{}", modules::render_catalog(&catalog));
        }
        command => {
            let manager = DataManager::new(config.app.clone())
                .await
                .context("데이터 매니저 초기화 실패")?;
            execute(command, &manager, &config).await?;
        }
    }

    tracing::info!("MacroDash Collector 종료");
    Ok(())
}

/// 데이터 매니저가 필요한 명령 실행
async fn execute(command: Commands, manager: &DataManager, config: &CollectorConfig) -> anyhow::Result<()> {
    match command {
        Commands::Refresh { force, json } => {
            let mode = if force { RefreshMode::Force } else { RefreshMode::IfStale };
            let (snapshot, stats) = modules::run_refresh(manager, mode).await;
            stats.log_summary("지표 갱신");

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", modules::render_snapshot(&snapshot));
            }
        }
        Commands::Daemon => {
            modules::run_daemon(manager, config.auto_refresh_interval()).await?;
        }
        Commands::Scan { exchange, symbols } => {
            let exchanges = match exchange {
                Some(exchange) => vec![exchange],
                None => config.app.scan.exchanges.clone(),
            };
            let symbols = modules::parse_symbols(symbols.as_deref());

            let results = modules::scan_exchanges(manager, &exchanges, &symbols).await?;
            for (exchange, stats) in results {
                println!(
                    "{}: {} scanned, {} saved, {} failed ({:.1}s)",
                    exchange,
                    stats.total,
                    stats.success,
                    stats.errors,
                    stats.elapsed.as_secs_f64()
                );
            }
        }
        Commands::Show { exchange, screen, json } => {
            let criteria = screen.then(ScreeningCriteria::default);
            let rows = modules::load_screening(manager, exchange, criteria.as_ref()).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", modules::render_rows(&rows));
            }
        }
        Commands::Indicators => {}
    }

    Ok(())
}

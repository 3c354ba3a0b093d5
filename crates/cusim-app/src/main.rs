//! # cusim-app
//!
//! CUSIM 바이너리 진입점. DI 컨테이너 역할 — 설정 로드, 어댑터
//! 와이어링, 포커스 핸드셰이크, 스케줄러 루프 실행.
//!
//! 종료 코드: 0 정상, 1 시작 단계 치명 실패 (트리거 테이블 경로 읽기
//! 불가, 출력 트리 생성 실패 등).

mod scheduler;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cusim_automation::{create_input_driver, AltTabFocusBroker, InputDispatcher};
use cusim_core::config_manager::ConfigManager;
use cusim_report::{generate_run_id, DefectReporter, ErrorInbox, SimulationEventLog};
use cusim_trigger::{Classifier, EffectivenessVerifier, TriggerTable};
use cusim_vision::{ScreenCapture, TextReader};

use crate::scheduler::{Scheduler, SchedulerConfig};

/// CUSIM — 화면 구동 CLI 사용자 시뮬레이터
///
/// 외부 콘솔 프로그램(ExtP)의 화면을 관찰해 프롬프트에 키 입력으로
/// 응답하고, 기대와 다른 동작은 결함 리포트로 남긴다.
#[derive(Parser, Debug)]
#[command(name = "cusim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// ExtP 프로젝트 루트 (설정 오버라이드)
    #[arg(long)]
    extp_root: Option<PathBuf>,

    /// 트리거 테이블 JSON 경로 (설정 오버라이드)
    #[arg(long)]
    trigger_table: Option<PathBuf>,

    /// 폴링 간격 (초, 설정 오버라이드)
    #[arg(long)]
    poll_interval: Option<u64>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 포커스 핸드셰이크 생략 (무인/CI 실행용)
    #[arg(long)]
    skip_handshake: bool,
}

/// 배너 출력
fn print_banner() {
    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║   CUSIM — CLI User Simulator                             ║");
    println!("║   화면 관찰 → 프롬프트 응답 → 효과 검증 → 결함 리포트    ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // tracing 초기화
    let lvl = &args.log_level;
    let log_filter = format!(
        "cusim_app={lvl},cusim_core={lvl},cusim_vision={lvl},cusim_trigger={lvl},cusim_automation={lvl},cusim_report={lvl}"
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    print_banner();

    // 설정 로드 + CLI 오버라이드
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("설정 로드 실패")?;

    let mut config = manager.get();
    if let Some(root) = args.extp_root {
        config.paths.extp_root = root;
    }
    if let Some(table) = args.trigger_table {
        config.paths.trigger_table = Some(table);
    }
    if let Some(poll) = args.poll_interval {
        config.simulator.poll_interval_s = poll;
    }

    // 어댑터 와이어링 — 시작 단계 실패는 모두 치명적 (종료 코드 1)
    let table = TriggerTable::load(config.paths.trigger_table_path())
        .context("트리거 테이블 로드 실패, 시작 중단")?;

    let sampler = ScreenCapture::new(
        config.paths.screenshot_dir_path(),
        config.vision.screen_region,
        config.vision.max_screenshots,
    )
    .context("스크린샷 저장소 초기화 실패")?;

    let extractor = TextReader::new(config.vision.tessdata_path.clone());

    let classifier = Classifier::new(config.simulator.tail_window_chars, config.repeat_window());
    let verifier = EffectivenessVerifier::new(config.simulator.repeat_threshold);

    // 디스패처와 포커스 브로커는 드라이버(백엔드 체인)를 공유한다
    let driver = Arc::new(Mutex::new(create_input_driver()));
    let dispatcher = InputDispatcher::new(Arc::clone(&driver));
    let mut focus = AltTabFocusBroker::new(
        driver,
        Duration::from_millis(config.simulator.pre_action_settle_ms),
    );

    let run_id = generate_run_id();
    let reporter = DefectReporter::new(
        config.paths.defect_dir_path(),
        run_id.clone(),
        config.report.annotate_screenshots,
    )
    .context("결함 출력 트리 초기화 실패")?;

    let event_log = SimulationEventLog::new(config.paths.event_log_path())
        .context("이벤트 로그 초기화 실패")?;
    let inbox =
        ErrorInbox::new(config.paths.error_inbox_path()).context("에러 인박스 초기화 실패")?;

    info!("실행 ID: {run_id}");
    info!("ExtP 루트: {}", config.paths.extp_root.display());
    info!(
        "트리거 테이블: {} ({}개 규칙)",
        config.paths.trigger_table_path().display(),
        table.len()
    );

    // 시작 핸드셰이크 — ExtP를 MRU 창으로 고정
    if args.skip_handshake {
        warn!("포커스 핸드셰이크 생략 — 키 입력이 엉뚱한 창에 갈 수 있음");
    } else {
        focus
            .startup_handshake()
            .await
            .context("포커스 핸드셰이크 실패")?;
    }

    let mut scheduler = Scheduler::new(
        SchedulerConfig::from_app_config(&config),
        Box::new(sampler),
        Box::new(extractor),
        table,
        classifier,
        verifier,
        Box::new(focus),
        Box::new(dispatcher),
        reporter,
        event_log,
        inbox,
    );

    scheduler.run().await;

    info!("정상 종료");
    Ok(())
}

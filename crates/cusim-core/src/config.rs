//! 애플리케이션 설정 구조체.
//!
//! 폴링 주기, 트리거 테이블 경로, 스크린샷 보존 정책, 리포트 출력 경로 등
//! 런타임 설정을 정의한다. JSON 파일에서 로드하며 CLI 인자로 오버라이드.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::frame::ScreenRegion;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 시뮬레이터 루프 설정
    #[serde(default)]
    pub simulator: SimulatorConfig,
    /// 비전(캡처/OCR) 설정
    #[serde(default)]
    pub vision: VisionConfig,
    /// 경로 설정 (ExtP 루트 및 파생 경로)
    #[serde(default)]
    pub paths: PathsConfig,
    /// 결함 리포트 설정
    #[serde(default)]
    pub report: ReportConfig,
}

// ============================================================
// 시뮬레이터 루프 설정
// ============================================================

/// 시뮬레이터 루프 설정 — 폴링/리로드 주기, 분류기/검증기 임계값
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// 캡처 간 폴링 간격 (초)
    #[serde(default = "default_poll_interval_s")]
    pub poll_interval_s: u64,
    /// 트리거 테이블 리로드 주기 (초)
    #[serde(default = "default_reload_interval_s")]
    pub reload_interval_s: u64,
    /// 에러 인박스에 새 파일 등장 시 냉각 시간 (초)
    #[serde(default = "default_error_pause_s")]
    pub error_pause_s: u64,
    /// 분류기 테일 윈도우 크기 (문자 수)
    #[serde(default = "default_tail_window_chars")]
    pub tail_window_chars: usize,
    /// 동일 규칙 연속 발화 에스컬레이션 임계값
    #[serde(default = "default_repeat_threshold")]
    pub repeat_threshold: u32,
    /// 연속 발화 판정 윈도우 (초)
    #[serde(default = "default_repeat_window_s")]
    pub repeat_window_s: u64,
    /// 액션 전 포커스 안정화 대기 (밀리초)
    #[serde(default = "default_pre_action_settle_ms")]
    pub pre_action_settle_ms: u64,
    /// 액션 후 검증 전 대기 (밀리초)
    #[serde(default = "default_post_action_settle_ms")]
    pub post_action_settle_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_s: default_poll_interval_s(),
            reload_interval_s: default_reload_interval_s(),
            error_pause_s: default_error_pause_s(),
            tail_window_chars: default_tail_window_chars(),
            repeat_threshold: default_repeat_threshold(),
            repeat_window_s: default_repeat_window_s(),
            pre_action_settle_ms: default_pre_action_settle_ms(),
            post_action_settle_ms: default_post_action_settle_ms(),
        }
    }
}

// ============================================================
// 비전 설정
// ============================================================

/// 비전(캡처/OCR) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// 캡처 영역 (None이면 전체 화면)
    #[serde(default)]
    pub screen_region: Option<ScreenRegion>,
    /// 스크린샷 보존 상한 (개수, 0이면 무제한)
    #[serde(default = "default_max_screenshots")]
    pub max_screenshots: usize,
    /// Tesseract 데이터 경로 (None이면 시스템 기본값)
    #[serde(default)]
    pub tessdata_path: Option<PathBuf>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            screen_region: None,
            max_screenshots: default_max_screenshots(),
            tessdata_path: None,
        }
    }
}

// ============================================================
// 경로 설정
// ============================================================

/// 경로 설정 — ExtP 프로젝트 루트와 그 아래 파생 경로들.
///
/// 명시하지 않은 경로는 `<extp_root>/UserSimulator/` 아래 기본 위치로
/// 해석된다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// ExtP 프로젝트 루트 (결함 출력 트리의 기준 경로)
    #[serde(default = "default_extp_root")]
    pub extp_root: PathBuf,
    /// 트리거 테이블 JSON 파일 경로
    #[serde(default)]
    pub trigger_table: Option<PathBuf>,
    /// 에러 인박스 디렉토리 (새 파일명만 감시, 읽거나 지우지 않음)
    #[serde(default)]
    pub error_inbox: Option<PathBuf>,
    /// 시뮬레이션 이벤트 로그 디렉토리
    #[serde(default)]
    pub event_log: Option<PathBuf>,
    /// 스크린샷 저장 디렉토리
    #[serde(default)]
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            extp_root: default_extp_root(),
            trigger_table: None,
            error_inbox: None,
            event_log: None,
            screenshot_dir: None,
        }
    }
}

impl PathsConfig {
    /// `<extp_root>/UserSimulator` 기준 디렉토리
    pub fn simulator_root(&self) -> PathBuf {
        self.extp_root.join("UserSimulator")
    }

    /// 트리거 테이블 파일 경로 (기본: `UserSimulator/trigger_dictionary.json`)
    pub fn trigger_table_path(&self) -> PathBuf {
        self.trigger_table
            .clone()
            .unwrap_or_else(|| self.simulator_root().join("trigger_dictionary.json"))
    }

    /// 에러 인박스 경로 (기본: `UserSimulator/NewErrors`)
    pub fn error_inbox_path(&self) -> PathBuf {
        self.error_inbox
            .clone()
            .unwrap_or_else(|| self.simulator_root().join("NewErrors"))
    }

    /// 이벤트 로그 경로 (기본: `UserSimulator/SimulationEvents`)
    pub fn event_log_path(&self) -> PathBuf {
        self.event_log
            .clone()
            .unwrap_or_else(|| self.simulator_root().join("SimulationEvents"))
    }

    /// 스크린샷 저장 경로 (기본: `UserSimulator/Screenshots`)
    pub fn screenshot_dir_path(&self) -> PathBuf {
        self.screenshot_dir
            .clone()
            .unwrap_or_else(|| self.simulator_root().join("Screenshots"))
    }

    /// 결함 리포트 출력 트리 (기본: `UserSimulator/DefectPrompts`)
    pub fn defect_dir_path(&self) -> PathBuf {
        self.simulator_root().join("DefectPrompts")
    }
}

// ============================================================
// 리포트 설정
// ============================================================

/// 결함 리포트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// 좌표가 제공된 경우 스크린샷에 영역 오버레이를 그릴지 여부
    #[serde(default = "default_true")]
    pub annotate_screenshots: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            annotate_screenshots: true,
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            simulator: SimulatorConfig::default(),
            vision: VisionConfig {
                screen_region: None,
                max_screenshots: default_max_screenshots(),
                tessdata_path: None,
            },
            paths: PathsConfig::default(),
            report: ReportConfig::default(),
        }
    }

    /// 폴링 간격을 Duration으로 반환
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.simulator.poll_interval_s)
    }

    /// 트리거 테이블 리로드 주기를 Duration으로 반환
    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.simulator.reload_interval_s)
    }

    /// 에러 인박스 냉각 시간을 Duration으로 반환
    pub fn error_pause(&self) -> Duration {
        Duration::from_secs(self.simulator.error_pause_s)
    }

    /// 연속 발화 판정 윈도우를 Duration으로 반환
    pub fn repeat_window(&self) -> Duration {
        Duration::from_secs(self.simulator.repeat_window_s)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_poll_interval_s() -> u64 {
    3
}
fn default_reload_interval_s() -> u64 {
    300
}
fn default_error_pause_s() -> u64 {
    10
}
fn default_tail_window_chars() -> usize {
    5_000
}
fn default_repeat_threshold() -> u32 {
    3
}
fn default_repeat_window_s() -> u64 {
    30
}
fn default_pre_action_settle_ms() -> u64 {
    500
}
fn default_post_action_settle_ms() -> u64 {
    1_000
}
fn default_max_screenshots() -> usize {
    500
}
fn default_extp_root() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = AppConfig::default_config();
        assert_eq!(config.simulator.poll_interval_s, 3);
        assert_eq!(config.simulator.reload_interval_s, 300);
        assert_eq!(config.simulator.error_pause_s, 10);
        assert_eq!(config.simulator.tail_window_chars, 5_000);
        assert_eq!(config.simulator.repeat_threshold, 3);
        assert_eq!(config.simulator.repeat_window_s, 30);
        assert_eq!(config.vision.max_screenshots, 500);
        assert!(config.vision.screen_region.is_none());
        assert!(config.report.annotate_screenshots);
    }

    #[test]
    fn derived_paths_follow_extp_root() {
        let mut paths = PathsConfig::default();
        paths.extp_root = PathBuf::from("/tmp/extp");

        assert_eq!(
            paths.trigger_table_path(),
            PathBuf::from("/tmp/extp/UserSimulator/trigger_dictionary.json")
        );
        assert_eq!(
            paths.error_inbox_path(),
            PathBuf::from("/tmp/extp/UserSimulator/NewErrors")
        );
        assert_eq!(
            paths.defect_dir_path(),
            PathBuf::from("/tmp/extp/UserSimulator/DefectPrompts")
        );
    }

    #[test]
    fn explicit_paths_override_defaults() {
        let mut paths = PathsConfig::default();
        paths.trigger_table = Some(PathBuf::from("/etc/cusim/table.json"));
        assert_eq!(
            paths.trigger_table_path(),
            PathBuf::from("/etc/cusim/table.json")
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"simulator": {"poll_interval_s": 1}}"#).unwrap();
        assert_eq!(config.simulator.poll_interval_s, 1);
        assert_eq!(config.simulator.reload_interval_s, 300);
        assert_eq!(config.vision.max_screenshots, 500);
    }

    #[test]
    fn duration_accessors() {
        let config = AppConfig::default_config();
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.repeat_window(), Duration::from_secs(30));
    }
}

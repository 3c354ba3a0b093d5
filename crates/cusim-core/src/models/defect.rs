//! 결함 리포트 모델.
//!
//! 분류된 실패를 스크린샷, OCR 텍스트, 테스트 컨텍스트, 심각도와 함께
//! 묶어 AI 보조 분류(triage)로 넘길 수 있는 구조로 정의한다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::frame::ScreenRegion;

/// 결함 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// 리포트 표기용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        }
    }
}

/// 실패 종류 — 시스템이 구분하는 결함 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// ExtP 부재 추정 (예약됨 — 코어는 직접 발생시키지 않음)
    ExternalProgramCrash,
    /// 에러 마커 감지
    ExternalProgramError,
    /// 동일 규칙 3회 연속 비효과
    ActionEffectivenessFailure,
    /// 포커스 전환 실패 후 비효과 지속
    WindowFocusFailure,
    /// 모든 주입 백엔드 실패
    InjectionAllBackendsFailed,
    /// 단일 비효과 액션
    IneffectiveAction,
    /// 기대/실제 텍스트 불일치
    OcrMismatch,
    /// 타임아웃
    Timeout,
}

impl FailureKind {
    /// 고정 심각도 매핑
    pub fn severity(&self) -> Severity {
        match self {
            FailureKind::ExternalProgramCrash => Severity::Critical,
            FailureKind::ExternalProgramError => Severity::Error,
            FailureKind::ActionEffectivenessFailure => Severity::Error,
            FailureKind::WindowFocusFailure => Severity::Error,
            FailureKind::InjectionAllBackendsFailed => Severity::Error,
            FailureKind::IneffectiveAction => Severity::Warning,
            FailureKind::OcrMismatch => Severity::Warning,
            FailureKind::Timeout => Severity::Warning,
        }
    }

    /// snake_case 이름 (파일/메타데이터 표기)
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ExternalProgramCrash => "external_program_crash",
            FailureKind::ExternalProgramError => "external_program_error",
            FailureKind::ActionEffectivenessFailure => "action_effectiveness_failure",
            FailureKind::WindowFocusFailure => "window_focus_failure",
            FailureKind::InjectionAllBackendsFailed => "injection_all_backends_failed",
            FailureKind::IneffectiveAction => "ineffective_action",
            FailureKind::OcrMismatch => "ocr_mismatch",
            FailureKind::Timeout => "timeout",
        }
    }
}

/// 리포트에 첨부되는 스크린샷의 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotRole {
    /// 실패 시점 화면
    Failure,
    /// 액션 직전
    Before,
    /// 액션 직후
    After,
    /// 영역 오버레이가 그려진 사본
    Annotated,
}

impl ScreenshotRole {
    /// 파일명에 들어가는 역할 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenshotRole::Failure => "failure",
            ScreenshotRole::Before => "before",
            ScreenshotRole::After => "after",
            ScreenshotRole::Annotated => "annotated",
        }
    }
}

/// 리포트가 참조하는 스크린샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotRef {
    /// 결함 디렉토리 내 복사본 경로
    pub path: PathBuf,
    /// 역할
    pub role: ScreenshotRole,
}

/// 오버레이 영역의 의미
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    ExpectedRegion,
    ActualRegion,
    ErrorLocation,
}

/// 호출자가 좌표를 제공한 경우의 오버레이 영역
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRegion {
    pub kind: AnnotationKind,
    pub region: ScreenRegion,
}

/// 결함 발생 시점의 테스트 컨텍스트
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectContext {
    /// 테스트 케이스/시나리오 이름
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    /// 기대 동작 서술
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// 실제 동작 서술
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    /// 순서 있는 재현 절차
    #[serde(default)]
    pub reproduction_steps: Vec<String>,
    /// 실패한 단계 인덱스 (0 기반)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failing_step: Option<usize>,
    /// 호출자가 제공한 문서 참조
    #[serde(default)]
    pub doc_refs: Vec<String>,
    /// 오버레이 영역들
    #[serde(default)]
    pub annotations: Vec<AnnotationRegion>,
    /// 원시 에러 상세 (리포트의 JSON 블록으로 들어감)
    #[serde(default)]
    pub details: serde_json::Value,
}

/// 결함 발생 시점의 시스템 컨텍스트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemContext {
    /// 운영체제
    pub os: String,
    /// 프로세스 작업 디렉토리
    pub cwd: PathBuf,
}

impl SystemContext {
    /// 현재 프로세스 기준으로 수집
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// 완성된 결함 리포트 — Markdown + JSON 사이드카로 영속화된다
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectReport {
    /// 결함 ID (`CUS_ISSUE_<YYYYmmdd_HHMMSS>_<8-hex>`)
    pub issue_id: String,
    /// 실행 ID (`TESTRUN_<YYYYmmdd_HHMMSS>_<8-hex>`, 프로세스당 하나)
    pub run_id: String,
    /// 결함 생성 시각
    pub taken_at: DateTime<Utc>,
    /// 심각도
    pub severity: Severity,
    /// 실패 종류
    pub failure_kind: FailureKind,
    /// 테스트 컨텍스트
    pub test_context: DefectContext,
    /// 첨부 스크린샷 (결함 디렉토리 내 사본)
    pub screenshots: Vec<ScreenshotRef>,
    /// 결함 시점 OCR 텍스트
    pub ocr_text: String,
    /// 시스템 컨텍스트
    pub system_context: SystemContext,
    /// 결함 시점의 트리거 테이블 버전
    pub trigger_table_version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_mapping_is_fixed() {
        assert_eq!(
            FailureKind::ExternalProgramCrash.severity(),
            Severity::Critical
        );
        assert_eq!(FailureKind::ExternalProgramError.severity(), Severity::Error);
        assert_eq!(
            FailureKind::ActionEffectivenessFailure.severity(),
            Severity::Error
        );
        assert_eq!(FailureKind::WindowFocusFailure.severity(), Severity::Error);
        assert_eq!(FailureKind::IneffectiveAction.severity(), Severity::Warning);
        assert_eq!(FailureKind::OcrMismatch.severity(), Severity::Warning);
        assert_eq!(FailureKind::Timeout.severity(), Severity::Warning);
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(
            FailureKind::ActionEffectivenessFailure.as_str(),
            "action_effectiveness_failure"
        );
        assert_eq!(FailureKind::IneffectiveAction.as_str(), "ineffective_action");
    }

    #[test]
    fn report_json_roundtrip() {
        let report = DefectReport {
            issue_id: "CUS_ISSUE_20260807_120000_deadbeef".to_string(),
            run_id: "TESTRUN_20260807_115900_cafebabe".to_string(),
            taken_at: Utc::now(),
            severity: Severity::Error,
            failure_kind: FailureKind::ExternalProgramError,
            test_context: DefectContext {
                expected: Some("프롬프트 진행".to_string()),
                actual: Some("traceback 출력".to_string()),
                reproduction_steps: vec!["ExtP 실행".to_string(), "메뉴 선택".to_string()],
                failing_step: Some(1),
                ..Default::default()
            },
            screenshots: vec![ScreenshotRef {
                path: PathBuf::from("screenshots/x_failure.png"),
                role: ScreenshotRole::Failure,
            }],
            ocr_text: "Traceback (most recent call last):".to_string(),
            system_context: SystemContext {
                os: "linux".to_string(),
                cwd: PathBuf::from("/tmp"),
            },
            trigger_table_version: 3,
        };

        let json = serde_json::to_string_pretty(&report).unwrap();
        let back: DefectReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}

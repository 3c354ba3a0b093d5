//! 결함 리포트 생성기.
//!
//! 분류된 실패를 Markdown 서사 + JSON 사이드카 한 쌍으로 조립해
//! `<extp_root>/UserSimulator/DefectPrompts/` 아래에 영속화한다.
//! 두 산출물 모두 원자적으로 쓴다 (임시 파일 + rename).
//!
//! Markdown이 닫히는 시점에 리포트가 참조하는 모든 스크린샷이
//! 디스크에 존재한다 — 사본 복사가 서사 작성보다 먼저다.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use cusim_core::error::CoreError;
use cusim_core::models::defect::{
    DefectContext, DefectReport, FailureKind, ScreenshotRef, ScreenshotRole, Severity,
    SystemContext,
};
use cusim_vision::annotate::annotate_regions;

/// 결함 리포트 입력 — 리포터가 ID/심각도/경로를 채워 완성한다
pub struct DefectDraft {
    /// 실패 종류
    pub kind: FailureKind,
    /// 결함 시점 OCR 텍스트
    pub ocr_text: String,
    /// 첨부할 원본 스크린샷 (프레임 경로 + 역할)
    pub screenshots: Vec<(PathBuf, ScreenshotRole)>,
    /// 테스트 컨텍스트
    pub context: DefectContext,
    /// 결함 시점 트리거 테이블 버전
    pub trigger_table_version: u64,
}

/// 결함 리포터 — `DefectPrompts/` 출력 트리 관리
pub struct DefectReporter {
    /// `DefectPrompts` 디렉토리
    defect_dir: PathBuf,
    /// 프로세스당 한 번 생성되는 실행 ID
    run_id: String,
    /// 좌표 제공 시 오버레이를 그릴지 여부
    annotate: bool,
}

impl DefectReporter {
    /// 새 리포터 생성 — 출력 트리를 만든다
    ///
    /// 트리: `DefectPrompts/{,screenshots,metadata,archives}`
    /// (`archives`는 예약 — 코어는 사용하지 않는다)
    pub fn new(defect_dir: PathBuf, run_id: String, annotate: bool) -> Result<Self, CoreError> {
        for sub in ["", "screenshots", "metadata", "archives"] {
            let dir = if sub.is_empty() {
                defect_dir.clone()
            } else {
                defect_dir.join(sub)
            };
            fs::create_dir_all(&dir).map_err(|e| {
                CoreError::Report(format!("결함 디렉토리 생성 실패: {}: {}", dir.display(), e))
            })?;
        }
        info!("결함 출력 트리 준비: {}", defect_dir.display());
        Ok(Self {
            defect_dir,
            run_id,
            annotate,
        })
    }

    /// 실행 ID
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// 결함 디렉토리
    pub fn defect_dir(&self) -> &Path {
        &self.defect_dir
    }

    /// 결함 리포트를 조립해 영속화한다.
    ///
    /// 쓰기 순서: 스크린샷 사본 → 주석 사본 → JSON 사이드카 → Markdown.
    /// Markdown이 마지막이므로 서사가 닫히는 시점에 참조 대상이 모두
    /// 존재한다.
    pub fn emit(&self, draft: DefectDraft) -> Result<DefectReport, CoreError> {
        let taken_at = Utc::now();
        let issue_id = generate_issue_id(taken_at);
        let severity = draft.kind.severity();

        // 1. 스크린샷 복사
        let mut screenshots = Vec::new();
        for (src, role) in &draft.screenshots {
            let file_name = format!("{issue_id}_{}.png", role.as_str());
            let dst = self.defect_dir.join("screenshots").join(&file_name);
            match fs::copy(src, &dst) {
                Ok(_) => screenshots.push(ScreenshotRef {
                    path: PathBuf::from("screenshots").join(file_name),
                    role: *role,
                }),
                Err(e) => {
                    // 원본 프레임 유실 — 리포트 자체는 계속 작성한다
                    warn!("스크린샷 복사 실패: {}: {}", src.display(), e);
                }
            }
        }

        // 2. 좌표가 제공된 경우 주석 사본
        if self.annotate && !draft.context.annotations.is_empty() {
            if let Some((src, _)) = draft.screenshots.first() {
                let file_name = format!("{issue_id}_{}.png", ScreenshotRole::Annotated.as_str());
                let dst = self.defect_dir.join("screenshots").join(&file_name);
                match annotate_regions(src, &dst, &draft.context.annotations) {
                    Ok(()) => screenshots.push(ScreenshotRef {
                        path: PathBuf::from("screenshots").join(file_name),
                        role: ScreenshotRole::Annotated,
                    }),
                    Err(e) => warn!("스크린샷 주석 실패: {e}"),
                }
            }
        }

        let report = DefectReport {
            issue_id: issue_id.clone(),
            run_id: self.run_id.clone(),
            taken_at,
            severity,
            failure_kind: draft.kind,
            test_context: draft.context,
            screenshots,
            ocr_text: draft.ocr_text,
            system_context: SystemContext::collect(),
            trigger_table_version: draft.trigger_table_version,
        };

        // 3. JSON 사이드카
        let metadata_path = self
            .defect_dir
            .join("metadata")
            .join(format!("{issue_id}_metadata.json"));
        let json = serde_json::to_string_pretty(&report)?;
        write_atomic(&metadata_path, json.as_bytes())?;

        // 4. Markdown 서사 (마지막)
        let md_path = self.defect_dir.join(format!("{issue_id}.md"));
        let markdown = render_markdown(&report);
        write_atomic(&md_path, markdown.as_bytes())?;

        info!(
            "결함 리포트 작성: {} ({}, {})",
            issue_id,
            report.failure_kind.as_str(),
            severity.as_str()
        );
        Ok(report)
    }
}

// ============================================================
// 식별자 생성
// ============================================================

/// 8자리 hex 접미사
fn short_hex() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// 결함 ID 생성 (`CUS_ISSUE_<YYYYmmdd_HHMMSS>_<8-hex>`)
fn generate_issue_id(at: DateTime<Utc>) -> String {
    format!("CUS_ISSUE_{}_{}", at.format("%Y%m%d_%H%M%S"), short_hex())
}

/// 실행 ID 생성 (`TESTRUN_<YYYYmmdd_HHMMSS>_<8-hex>`) — 프로세스당 1회
pub fn generate_run_id() -> String {
    format!(
        "TESTRUN_{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        short_hex()
    )
}

// ============================================================
// 원자적 쓰기
// ============================================================

/// 같은 디렉토리의 임시 파일에 쓴 뒤 rename으로 교체
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| CoreError::Report(format!("잘못된 리포트 경로: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    fs::write(&tmp, bytes)
        .map_err(|e| CoreError::Report(format!("임시 파일 쓰기 실패: {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path)
        .map_err(|e| CoreError::Report(format!("rename 실패: {}: {}", path.display(), e)))?;
    debug!("원자적 쓰기 완료: {}", path.display());
    Ok(())
}

// ============================================================
// Markdown 서사
// ============================================================

/// 리포트 Markdown 렌더링.
///
/// 다운스트림 AI 분류기가 소비하는 산출물이므로 섹션/본문은 영어다.
fn render_markdown(report: &DefectReport) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Defect Report: {}\n\n", report.issue_id));

    md.push_str("## Identification\n\n");
    md.push_str(&format!("- **Issue ID**: {}\n", report.issue_id));
    md.push_str(&format!("- **Run ID**: {}\n", report.run_id));
    md.push_str(&format!(
        "- **Generated at**: {}\n",
        report.taken_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!("- **Severity**: {}\n", report.severity.as_str()));
    md.push_str(&format!(
        "- **Failure kind**: {}\n",
        report.failure_kind.as_str()
    ));
    md.push_str(&format!(
        "- **Trigger table version**: {}\n",
        report.trigger_table_version
    ));
    if let Some(test_name) = &report.test_context.test_name {
        md.push_str(&format!("- **Test case**: {test_name}\n"));
    }
    md.push('\n');

    md.push_str("## Expected vs Actual Behavior\n\n");
    md.push_str(&format!(
        "- **Expected**: {}\n",
        report
            .test_context
            .expected
            .as_deref()
            .unwrap_or("(not provided)")
    ));
    md.push_str(&format!(
        "- **Actual**: {}\n\n",
        report
            .test_context
            .actual
            .as_deref()
            .unwrap_or("(not provided)")
    ));

    if !report.test_context.reproduction_steps.is_empty() {
        md.push_str("## Reproduction Steps\n\n");
        for (i, step) in report.test_context.reproduction_steps.iter().enumerate() {
            if report.test_context.failing_step == Some(i) {
                md.push_str(&format!("{}. {step}  **<- FAILING STEP**\n", i + 1));
            } else {
                md.push_str(&format!("{}. {step}\n", i + 1));
            }
        }
        md.push('\n');
    }

    if !report.screenshots.is_empty() {
        md.push_str("## Attached Screenshots\n\n");
        for screenshot in &report.screenshots {
            md.push_str(&format!(
                "- `{}` ({})\n",
                screenshot.path.display(),
                screenshot.role.as_str()
            ));
        }
        md.push('\n');
    }

    if !report.test_context.doc_refs.is_empty() {
        md.push_str("## Documentation References\n\n");
        for doc in &report.test_context.doc_refs {
            md.push_str(&format!("- {doc}\n"));
        }
        md.push('\n');
    }

    md.push_str("## Error Details\n\n");
    md.push_str("```json\n");
    md.push_str(
        &serde_json::to_string_pretty(&report.test_context.details)
            .unwrap_or_else(|_| "null".to_string()),
    );
    md.push_str("\n```\n\n");

    if !report.ocr_text.is_empty() {
        md.push_str("## OCR Text at Failure\n\n");
        md.push_str("```text\n");
        md.push_str(&report.ocr_text);
        md.push_str("\n```\n\n");
    }

    md.push_str("## AI Assistance Request\n\n");
    md.push_str(&ai_assistance_paragraph(
        report.failure_kind,
        report.severity,
    ));
    md.push('\n');

    md
}

/// 심각도/종류에 따라 문구가 달라지는 마무리 단락
fn ai_assistance_paragraph(kind: FailureKind, severity: Severity) -> String {
    let opening = match severity {
        Severity::Critical => {
            "URGENT: the external program appears to have crashed or become unreachable."
        }
        Severity::Error => "The simulator hit a hard failure that blocked the current scenario.",
        Severity::Warning => {
            "The simulator observed a suspicious condition that did not block the run."
        }
        Severity::Info => "This report is informational.",
    };

    let ask = match kind {
        FailureKind::ExternalProgramCrash => {
            "Please analyze the attached context for the most likely crash cause and suggest \
             a minimal reproduction plus a fix location in the external program."
        }
        FailureKind::ExternalProgramError => {
            "Please read the OCR text and error excerpt, identify the root cause in the \
             external program, and propose a concrete fix."
        }
        FailureKind::ActionEffectivenessFailure => {
            "The same prompt survived repeated responses. Please judge whether the configured \
             trigger response is wrong, or whether the external program stopped consuming input."
        }
        FailureKind::WindowFocusFailure => {
            "Keystrokes likely landed in the wrong window. Please review the reproduction \
             steps and advise whether the focus handshake needs to be repeated."
        }
        FailureKind::InjectionAllBackendsFailed => {
            "Every input backend failed to deliver keystrokes. Please check the system \
             context for missing permissions or display-server constraints."
        }
        FailureKind::IneffectiveAction => {
            "A single response did not clear its prompt. Please check whether the trigger \
             text also appears in the post-action screen by design."
        }
        FailureKind::OcrMismatch => {
            "Expected and observed text disagree. Please judge whether this is an OCR \
             artifact or a real behavior change in the external program."
        }
        FailureKind::Timeout => {
            "An expected screen change did not arrive in time. Please estimate whether the \
             external program is slow or stuck."
        }
    };

    format!("{opening} {ask}\n")
}

//! 시뮬레이터 루프 스케줄러.
//!
//! 단일 스레드 협력 루프 하나가 전부다: 폴링 간격만큼 잠들고, 트리거
//! 테이블 리로드 주기와 에러 인박스 감시를 타임스탬프 체크로 접어
//! 넣는다. 캡처 스레드/분류 스레드/주입 스레드로 나누지 않는다 —
//! 데스크톱은 하나뿐인 공유 자원이라 병렬화로 얻는 처리량이 없다.
//!
//! 한 번의 트리거 발화에 대해 `포커스 → 주입 → 정착 → 검증 → (필요시
//! 리포트)` 순서는 엄격하며 끼어들 수 없다. 두 액션이 동시에 진행되는
//! 일은 없다.

use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use cusim_core::config::AppConfig;
use cusim_core::models::decision::ClassifierDecision;
use cusim_core::models::defect::{DefectContext, FailureKind, ScreenshotRole};
use cusim_core::models::frame::Frame;
use cusim_core::models::trigger::TriggerRule;
use cusim_core::ports::input::{ActionDispatcher, FocusBroker};
use cusim_core::ports::vision::{ScreenSampler, TextExtractor};
use cusim_report::{DefectDraft, DefectReporter, ErrorInbox, SimulationEventLog};
use cusim_trigger::{Classifier, EffectivenessVerifier, TriggerTable};

/// 스케줄러 설정
pub struct SchedulerConfig {
    /// 폴링 간격
    pub poll_interval: Duration,
    /// 트리거 테이블 리로드 주기
    pub reload_interval: Duration,
    /// 에러 인박스 냉각 시간
    pub error_pause: Duration,
    /// 액션 후 검증 전 정착 대기
    pub post_action_settle: Duration,
}

impl SchedulerConfig {
    /// 앱 설정에서 스케줄러 설정 구성
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            reload_interval: config.reload_interval(),
            error_pause: config.error_pause(),
            post_action_settle: Duration::from_millis(config.simulator.post_action_settle_ms),
        }
    }
}

/// 시뮬레이터 루프 스케줄러 — C1→C2→C4→(C5,C6)→C7→C8 오케스트레이션
pub struct Scheduler {
    config: SchedulerConfig,
    sampler: Box<dyn ScreenSampler>,
    extractor: Box<dyn TextExtractor>,
    table: TriggerTable,
    classifier: Classifier,
    verifier: EffectivenessVerifier,
    focus: Box<dyn FocusBroker>,
    dispatcher: Box<dyn ActionDispatcher>,
    reporter: DefectReporter,
    event_log: SimulationEventLog,
    inbox: ErrorInbox,
    /// 직전 틱의 OCR 텍스트 (변화 감지 기준)
    previous_text: String,
    /// 마지막 테이블 리로드 시각
    last_reload: Instant,
}

impl Scheduler {
    /// 새 스케줄러 생성
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SchedulerConfig,
        sampler: Box<dyn ScreenSampler>,
        extractor: Box<dyn TextExtractor>,
        table: TriggerTable,
        classifier: Classifier,
        verifier: EffectivenessVerifier,
        focus: Box<dyn FocusBroker>,
        dispatcher: Box<dyn ActionDispatcher>,
        reporter: DefectReporter,
        event_log: SimulationEventLog,
        inbox: ErrorInbox,
    ) -> Self {
        Self {
            config,
            sampler,
            extractor,
            table,
            classifier,
            verifier,
            focus,
            dispatcher,
            reporter,
            event_log,
            inbox,
            previous_text: String::new(),
            last_reload: Instant::now(),
        }
    }

    /// 메인 루프 — 오퍼레이터 인터럽트까지 반복
    pub async fn run(&mut self) {
        info!(
            "시뮬레이터 루프 시작 (폴링 {:?}, 테이블 리로드 {:?})",
            self.config.poll_interval, self.config.reload_interval
        );
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("오퍼레이터 인터럽트 수신, 루프 종료");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    self.tick().await;
                }
            }
        }
    }

    /// 한 번의 루프 반복.
    ///
    /// 어떤 실패도 루프 밖으로 새지 않는다 — 컴포넌트가 잡아서
    /// 분류하거나 결함으로 변환한다.
    pub async fn tick(&mut self) {
        // 테이블 리로드 주기 체크
        if self.last_reload.elapsed() >= self.config.reload_interval {
            self.table.reload();
            self.last_reload = Instant::now();
        }

        // 에러 인박스에 새 파일이 등장하면 냉각
        let fresh_errors = self.inbox.poll_new();
        if fresh_errors > 0 {
            info!(
                "에러 인박스에 새 파일 {fresh_errors}개, {:?} 냉각",
                self.config.error_pause
            );
            tokio::time::sleep(self.config.error_pause).await;
        }

        // 캡처 — 실패 시 이번 틱을 건너뛴다 (제자리 재시도 없음)
        let frame = match self.sampler.capture().await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("캡처 실패, 이번 틱 건너뜀: {e}");
                return;
            }
        };

        let text = self.extractor.extract(&frame).await;
        let decision = self.classifier.classify(
            Utc::now(),
            &text,
            &self.previous_text,
            &self.table.snapshot(),
        );

        match decision {
            ClassifierDecision::NoChange | ClassifierDecision::Idle => {
                self.previous_text = text;
            }
            ClassifierDecision::Trigger { rule, repeat_count } => {
                self.handle_trigger(rule, repeat_count, &frame, &text).await;
                // 액션이 화면을 바꿨을 것으로 기대한다 — 변화 감지
                // 기준을 비워 다음 틱이 같은 화면을 다시 분류하게 한다
                self.previous_text.clear();
            }
            ClassifierDecision::Error { marker, excerpt } => {
                self.handle_error_marker(&marker, &excerpt, &frame, &text);
                self.previous_text = text;
            }
        }
    }

    /// 트리거 발화 처리: 포커스 → 주입 → 이벤트 로그 → 정착 → 검증
    async fn handle_trigger(
        &mut self,
        rule: TriggerRule,
        repeat_count: u32,
        pre_frame: &Frame,
        pre_text: &str,
    ) {
        info!(
            "트리거 처리: '{}' → {} (연속 {}회)",
            rule.trigger,
            rule.action.string_form(),
            repeat_count
        );

        let focus_degraded = match self.focus.focus().await {
            Ok(()) => false,
            Err(e) => {
                // MRU가 흐트러졌을 수 있다 — 경고만 남기고 진행한다.
                // 비효과가 지속되면 window_focus_failure 결함으로 이어진다.
                warn!("포커스 실패, 액션 계속 진행: {e}");
                true
            }
        };

        let backend = match self.dispatcher.dispatch(&rule.action).await {
            Ok(backend) => backend,
            Err(e) => {
                warn!("모든 주입 백엔드 실패: {e}");
                self.emit_defect(
                    FailureKind::InjectionAllBackendsFailed,
                    pre_text.to_string(),
                    vec![(pre_frame.image_path.clone(), ScreenshotRole::Failure)],
                    DefectContext {
                        expected: Some(format!(
                            "response '{}' delivered to ExtP",
                            rule.action.string_form()
                        )),
                        actual: Some("every input backend returned an error".to_string()),
                        reproduction_steps: trigger_steps(&rule),
                        failing_step: Some(2),
                        details: serde_json::json!({ "error": e.to_string() }),
                        ..Default::default()
                    },
                );
                // 검증은 계속한다 — 일부 키가 전달됐을 수도 있다
                "none".to_string()
            }
        };

        if let Err(e) = self.event_log.record(&rule.trigger, &rule.action) {
            warn!("시뮬레이션 이벤트 기록 실패: {e}");
        }

        // wait_random은 효과 검증 면제
        if !rule.action.is_verifiable() {
            debug!("검증 면제 액션: {}", rule.action.string_form());
            return;
        }

        tokio::time::sleep(self.config.post_action_settle).await;

        let (post_text, post_frame) = match self.sampler.capture().await {
            Ok(frame) => {
                let text = self.extractor.extract(&frame).await;
                (text, Some(frame))
            }
            Err(e) => {
                warn!("사후 캡처 실패: {e}");
                (String::new(), None)
            }
        };

        let verification =
            self.verifier
                .verify(&rule, &backend, pre_text, &post_text, repeat_count);

        if verification.reset_repeats {
            self.classifier.reset_repeats(&rule.trigger);
        }

        if let Some(kind) = verification.defect {
            // 이번 사이클의 포커스 시도가 모두 실패한 채 비효과라면
            // 원인은 키 입력이 엉뚱한 창에 간 쪽이다
            let kind = if focus_degraded {
                FailureKind::WindowFocusFailure
            } else {
                kind
            };

            let mut screenshots = vec![(pre_frame.image_path.clone(), ScreenshotRole::Before)];
            if let Some(post) = &post_frame {
                screenshots.push((post.image_path.clone(), ScreenshotRole::After));
            }

            let outcome_json =
                serde_json::to_value(&verification.outcome).unwrap_or(serde_json::Value::Null);
            self.emit_defect(
                kind,
                post_text.clone(),
                screenshots,
                DefectContext {
                    expected: Some(format!(
                        "trigger text '{}' no longer on screen after response",
                        rule.trigger
                    )),
                    actual: Some(format!(
                        "trigger text still present after {} consecutive response(s)",
                        repeat_count
                    )),
                    reproduction_steps: trigger_steps(&rule),
                    failing_step: Some(3),
                    details: outcome_json,
                    ..Default::default()
                },
            );
        } else {
            debug!(
                "액션 효과 확인: '{}' (백엔드 '{}', effective={})",
                rule.trigger, backend, verification.outcome.effective
            );
        }
    }

    /// 에러 마커 감지 처리 — 결함 리포트 직행
    fn handle_error_marker(&mut self, marker: &str, excerpt: &str, frame: &Frame, text: &str) {
        warn!("에러 마커 감지: '{marker}'");
        self.emit_defect(
            FailureKind::ExternalProgramError,
            text.to_string(),
            vec![(frame.image_path.clone(), ScreenshotRole::Failure)],
            DefectContext {
                expected: Some("no error markers in the visible screen text".to_string()),
                actual: Some(format!("error marker '{marker}' detected")),
                reproduction_steps: vec![
                    "Start ExtP and the simulator loop".to_string(),
                    "Capture the screen and extract its text".to_string(),
                    "Scan the tail window for error markers".to_string(),
                ],
                failing_step: Some(2),
                details: serde_json::json!({ "marker": marker, "excerpt": excerpt }),
                ..Default::default()
            },
        );
    }

    /// 결함 리포트 발행 — 실패해도 루프는 계속된다
    fn emit_defect(
        &self,
        kind: FailureKind,
        ocr_text: String,
        screenshots: Vec<(std::path::PathBuf, ScreenshotRole)>,
        context: DefectContext,
    ) {
        let draft = DefectDraft {
            kind,
            ocr_text,
            screenshots,
            context,
            trigger_table_version: self.table.version(),
        };
        match self.reporter.emit(draft) {
            Ok(report) => info!("결함 리포트 발행: {}", report.issue_id),
            Err(e) => tracing::error!("결함 리포트 작성 실패: {e}"),
        }
    }
}

/// 트리거 발화 경로의 표준 재현 절차
fn trigger_steps(rule: &TriggerRule) -> Vec<String> {
    vec![
        "Start ExtP and the simulator loop".to_string(),
        format!("Wait for the prompt containing '{}'", rule.trigger),
        format!("Inject the response '{}'", rule.action.string_form()),
        "Re-capture the screen and verify the prompt cleared".to_string(),
    ]
}

// ============================================================
// 시나리오 테스트 — 스크립트된 가짜 포트로 루프 구동
// ============================================================

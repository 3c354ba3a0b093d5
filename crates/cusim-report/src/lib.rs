//! # cusim-report
//!
//! 보고 계층 — 결함 리포트 생성(Markdown + JSON 사이드카), 트리거
//! 발화 이벤트 로그, 에러 인박스 감시.
//!
//! 결함 리포트는 이 시스템이 사람(그리고 다운스트림 AI 분류기)에게
//! 말을 거는 주 채널이다. 일상적 실패는 로그에만 남는다.

pub mod defect;
pub mod error_inbox;
pub mod event_log;

pub use defect::{generate_run_id, DefectDraft, DefectReporter};
pub use error_inbox::ErrorInbox;
pub use event_log::SimulationEventLog;

//! # cusim-trigger
//!
//! 결정 계층 — 트리거 테이블(핫 리로드), 분류기(테일 윈도우 + 트리거
//! 우선 규칙), 효과 검증기(트리거 부재 = 효과).

pub mod classifier;
pub mod table;
pub mod verifier;

pub use classifier::Classifier;
pub use table::TriggerTable;
pub use verifier::{EffectivenessVerifier, Verification};

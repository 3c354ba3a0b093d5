//! 분류기 결정 모델.

use serde::{Deserialize, Serialize};

use super::trigger::TriggerRule;

/// 루프 반복당 정확히 하나 생성되는 분류 결정.
///
/// 트리거가 에러 마커보다 우선한다: 테이블이 현재 화면에 응답하는 법을
/// 알고 있다면 그 화면은 정의상 프롬프트이지 장애가 아니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision")]
pub enum ClassifierDecision {
    /// 이전 텍스트와 동일 — 아무것도 하지 않음
    NoChange,
    /// 트리거 발화 — 테이블 순서상 첫 매치 규칙
    Trigger {
        /// 매치된 규칙
        rule: TriggerRule,
        /// 동일 규칙 연속 발화 횟수 (이번 발화 포함)
        repeat_count: u32,
    },
    /// 에러 마커 감지 (어떤 트리거도 매치하지 않은 경우에만)
    Error {
        /// 감지된 마커
        marker: String,
        /// 마커 주변 발췌 (약 200자)
        excerpt: String,
    },
    /// 변화는 있으나 매치 없음
    Idle,
}

//! 트리거 규칙 모델.

use serde::{Deserialize, Serialize};

use super::action::ActionDescriptor;

/// 트리거 규칙 — 리터럴 부분 문자열과 그에 대응하는 액션.
///
/// 매칭은 OCR 텍스트 테일 윈도우에 대한 대소문자 무시 부분 문자열 검색.
/// 테이블의 삽입 순서가 우선순위를 정의하며 첫 매치가 이긴다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    /// 트리거 리터럴
    pub trigger: String,
    /// 대응 액션
    pub action: ActionDescriptor,
}

impl TriggerRule {
    /// 새 규칙 생성
    pub fn new(trigger: impl Into<String>, action: ActionDescriptor) -> Self {
        Self {
            trigger: trigger.into(),
            action,
        }
    }
}

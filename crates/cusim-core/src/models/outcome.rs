//! 액션 결과 모델.

use serde::{Deserialize, Serialize};

use super::trigger::TriggerRule;

/// 액션 실행 + 효과 검증 결과.
///
/// `effective`는 트리거 리터럴이 사후 텍스트에서 사라졌는지로 판정한다.
/// 의도적으로 거친 신호다 — 오판의 결과는 Warning 결함일 뿐 액션 루프가
/// 아니므로 루프는 자연히 안정화된다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// 실행된 규칙
    pub rule: TriggerRule,
    /// 주입에 성공한 백엔드 이름
    pub backend_used: String,
    /// 액션 직전 OCR 텍스트
    pub pre_text: String,
    /// 액션 이후 OCR 텍스트
    pub post_text: String,
    /// 트리거 리터럴이 사후 텍스트에서 사라졌는가 (대소문자 무시)
    pub effective: bool,
    /// 동일 규칙 연속 발화 횟수
    pub repeat_count: u32,
}

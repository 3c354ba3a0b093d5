//! 효과 검증기.
//!
//! 액션 이후 새 프레임의 텍스트에서 트리거 리터럴이 사라졌는지로
//! 효과를 판정한다. 거친 신호지만 오판의 결과는 Warning 결함일 뿐
//! 액션 루프가 아니다 — 다음 반복이 재분류하고 필요하면 재발화한다.

use tracing::debug;

use cusim_core::models::defect::FailureKind;
use cusim_core::models::outcome::ActionOutcome;
use cusim_core::models::trigger::TriggerRule;

/// 검증 결과 — 결과 레코드 + 에스컬레이션 판정
pub struct Verification {
    /// 액션 결과 레코드
    pub outcome: ActionOutcome,
    /// 생성할 결함 종류 (None이면 결함 없음)
    pub defect: Option<FailureKind>,
    /// 해당 규칙의 연속 발화 상태를 리셋해야 하는가
    pub reset_repeats: bool,
}

/// 효과 검증기
pub struct EffectivenessVerifier {
    /// 동일 규칙 연속 비효과 에스컬레이션 임계값
    repeat_threshold: u32,
}

impl EffectivenessVerifier {
    /// 새 검증기 생성
    pub fn new(repeat_threshold: u32) -> Self {
        Self { repeat_threshold }
    }

    /// 사전/사후 텍스트로 효과를 판정한다.
    ///
    /// - 효과 있음 → 결함 없음, 연속 상태 리셋
    /// - 첫 비효과 → Warning `ineffective_action`, 재시도는 하지 않는다
    /// - 임계값 도달 → Error `action_effectiveness_failure` + 리셋
    ///   (리포트 플러딩 방지)
    /// - 사후 OCR이 빈 문자열이면 기록만 하고 비효과로 계수하지 않는다
    pub fn verify(
        &self,
        rule: &TriggerRule,
        backend_used: &str,
        pre_text: &str,
        post_text: &str,
        repeat_count: u32,
    ) -> Verification {
        if post_text.is_empty() {
            debug!(
                "사후 OCR 빈 텍스트 (트리거 '{}') — 비효과로 계수하지 않음",
                rule.trigger
            );
            return Verification {
                outcome: self.outcome(rule, backend_used, pre_text, post_text, true, repeat_count),
                defect: None,
                reset_repeats: true,
            };
        }

        let effective = !post_text
            .to_lowercase()
            .contains(&rule.trigger.to_lowercase());

        if effective {
            return Verification {
                outcome: self.outcome(rule, backend_used, pre_text, post_text, true, repeat_count),
                defect: None,
                reset_repeats: true,
            };
        }

        let escalate = repeat_count >= self.repeat_threshold;
        debug!(
            "비효과 액션: '{}' (연속 {}회{})",
            rule.trigger,
            repeat_count,
            if escalate { ", 에스컬레이션" } else { "" }
        );

        // 첫 비효과만 Warning, 임계값 도달 시 Error — 중간 발화는 기록만.
        // 리포트 디렉토리 플러딩을 막는 규칙이다.
        let defect = if escalate {
            Some(FailureKind::ActionEffectivenessFailure)
        } else if repeat_count == 1 {
            Some(FailureKind::IneffectiveAction)
        } else {
            None
        };

        Verification {
            outcome: self.outcome(rule, backend_used, pre_text, post_text, false, repeat_count),
            defect,
            reset_repeats: escalate,
        }
    }

    fn outcome(
        &self,
        rule: &TriggerRule,
        backend_used: &str,
        pre_text: &str,
        post_text: &str,
        effective: bool,
        repeat_count: u32,
    ) -> ActionOutcome {
        ActionOutcome {
            rule: rule.clone(),
            backend_used: backend_used.to_string(),
            pre_text: pre_text.to_string(),
            post_text: post_text.to_string(),
            effective,
            repeat_count,
        }
    }
}

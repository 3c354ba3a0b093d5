//! 트리거 분류기.
//!
//! OCR 텍스트의 테일 윈도우(스크롤 터미널의 "지금 화면에 있는 것")를
//! 보고 반복당 정확히 하나의 결정을 내린다:
//! 동일 텍스트 → `NoChange`, 테이블 순서상 첫 트리거 매치 → `Trigger`,
//! 에러 마커 → `Error`, 그 외 → `Idle`.
//!
//! 트리거가 에러 마커보다 우선한다. ExtP의 도움말, 메뉴 레이블, 문서가
//! "error"라는 단어를 자주 포함하기 때문이다 — 테이블이 현재 화면에
//! 응답하는 법을 안다면 그 화면은 프롬프트이지 장애가 아니다.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use cusim_core::models::decision::ClassifierDecision;
use cusim_core::models::trigger::TriggerRule;

/// 에러 마커 — 테일 윈도우에서 대소문자 무시로 검색되는 고정 집합
const ERROR_MARKERS: &[&str] = &[
    "error:",
    "exception:",
    "failed to",
    "traceback",
    "fatal error",
    "timeout occurred",
    "access denied",
    "permission denied",
    "not found",
    "panicked at",
    "segmentation fault",
];

/// 마커 주변 발췌 반경 (문자)
const EXCERPT_RADIUS: usize = 100;

/// 규칙별 연속 발화 상태
struct RepeatState {
    last_fire: DateTime<Utc>,
    count: u32,
}

/// 트리거 분류기
///
/// 규칙별 `(마지막 발화 시각, 연속 발화 횟수)`를 유지한다.
/// 횟수는 다른 규칙이 발화하거나 `repeat_window`가 지나면 리셋된다.
pub struct Classifier {
    /// 테일 윈도우 크기 (문자 수)
    tail_window_chars: usize,
    /// 연속 발화 판정 윈도우
    repeat_window: Duration,
    /// 규칙별 연속 발화 상태 (트리거 리터럴이 키)
    repeats: HashMap<String, RepeatState>,
}

impl Classifier {
    /// 새 분류기 생성
    pub fn new(tail_window_chars: usize, repeat_window: std::time::Duration) -> Self {
        Self {
            tail_window_chars,
            repeat_window: Duration::from_std(repeat_window)
                .unwrap_or_else(|_| Duration::seconds(30)),
            repeats: HashMap::new(),
        }
    }

    /// 한 번의 분류 — 반복당 정확히 하나의 결정
    pub fn classify(
        &mut self,
        now: DateTime<Utc>,
        current_text: &str,
        previous_text: &str,
        rules: &[TriggerRule],
    ) -> ClassifierDecision {
        // 1. 변화 없음
        if current_text == previous_text {
            return ClassifierDecision::NoChange;
        }

        let tail = Self::tail_window(current_text, self.tail_window_chars);
        let tail_lower = tail.to_lowercase();

        // 2. 트리거 매치 — 테이블 순서, 첫 매치 승리
        for rule in rules {
            if tail_lower.contains(&rule.trigger.to_lowercase()) {
                let repeat_count = self.record_fire(&rule.trigger, now);
                debug!(
                    "트리거 발화: '{}' (연속 {}회)",
                    rule.trigger, repeat_count
                );
                return ClassifierDecision::Trigger {
                    rule: rule.clone(),
                    repeat_count,
                };
            }
        }

        // 3. 에러 마커 — 트리거가 하나도 매치하지 않은 경우에만
        for marker in ERROR_MARKERS {
            if let Some(pos) = tail_lower.find(marker) {
                let excerpt = Self::excerpt_around(tail, &tail_lower, pos);
                return ClassifierDecision::Error {
                    marker: (*marker).to_string(),
                    excerpt,
                };
            }
        }

        // 4. 변화는 있으나 매치 없음
        ClassifierDecision::Idle
    }

    /// 효과 확인된 규칙의 연속 발화 상태 리셋
    pub fn reset_repeats(&mut self, trigger: &str) {
        self.repeats.remove(trigger);
    }

    /// 발화 기록 + 연속 횟수 계산.
    ///
    /// 다른 규칙의 상태는 버린다 — 연속 횟수는 "같은 규칙이 연달아"
    /// 발화했을 때만 의미가 있다.
    fn record_fire(&mut self, trigger: &str, now: DateTime<Utc>) -> u32 {
        let count = match self.repeats.get(trigger) {
            Some(state) if now - state.last_fire <= self.repeat_window => state.count + 1,
            _ => 1,
        };
        self.repeats.clear();
        self.repeats.insert(
            trigger.to_string(),
            RepeatState {
                last_fire: now,
                count,
            },
        );
        count
    }

    /// 마지막 `max_chars` 문자 (문자 경계 안전)
    fn tail_window(text: &str, max_chars: usize) -> &str {
        let total = text.chars().count();
        if total <= max_chars {
            return text;
        }
        let skip = total - max_chars;
        match text.char_indices().nth(skip) {
            Some((idx, _)) => &text[idx..],
            None => text,
        }
    }

    /// 마커 주변 약 200자 발췌 (앞뒤 `EXCERPT_RADIUS`자)
    fn excerpt_around(tail: &str, tail_lower: &str, byte_pos: usize) -> String {
        let char_pos = tail_lower[..byte_pos].chars().count();
        let chars: Vec<char> = tail.chars().collect();
        let char_pos = char_pos.min(chars.len());
        let start = char_pos.saturating_sub(EXCERPT_RADIUS);
        let end = (char_pos + EXCERPT_RADIUS).min(chars.len());
        chars[start..end].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use cusim_core::models::action::ActionDescriptor;

    fn rules(entries: &[(&str, &str)]) -> Vec<TriggerRule> {
        entries
            .iter()
            .map(|(t, a)| TriggerRule::new(*t, ActionDescriptor::parse(a)))
            .collect()
    }

    fn classifier() -> Classifier {
        Classifier::new(5_000, std::time::Duration::from_secs(30))
    }

    #[test]
    fn identical_text_is_no_change() {
        let mut c = classifier();
        let table = rules(&[("Continue?", "press_enter")]);
        let decision = c.classify(Utc::now(), "Continue?", "Continue?", &table);
        assert_matches!(decision, ClassifierDecision::NoChange);
    }

    #[test]
    fn empty_to_empty_is_no_change() {
        let mut c = classifier();
        assert_matches!(
            c.classify(Utc::now(), "", "", &[]),
            ClassifierDecision::NoChange
        );
    }

    #[test]
    fn empty_after_text_is_idle() {
        let mut c = classifier();
        let table = rules(&[("Continue?", "press_enter")]);
        assert_matches!(
            c.classify(Utc::now(), "", "Continue?", &table),
            ClassifierDecision::Idle
        );
    }

    #[test]
    fn first_matching_rule_wins_in_table_order() {
        let mut c = classifier();
        let table = rules(&[("option", "type_1"), ("Select an option:", "type_2")]);
        let decision = c.classify(Utc::now(), "...Select an option:\n", "", &table);
        assert_matches!(
            decision,
            ClassifierDecision::Trigger { rule, .. } if rule.trigger == "option"
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut c = classifier();
        let table = rules(&[("SELECT AN OPTION:", "type_1")]);
        let decision = c.classify(Utc::now(), "select an option:", "", &table);
        assert_matches!(decision, ClassifierDecision::Trigger { .. });
    }

    #[test]
    fn trigger_takes_precedence_over_error_marker() {
        // 메뉴 제목에 "Error"가 있어도 트리거가 이긴다
        let mut c = classifier();
        let table = rules(&[("Select an option:", "type_1")]);
        let decision = c.classify(
            Utc::now(),
            "Error handling menu\nSelect an option:\n",
            "",
            &table,
        );
        assert_matches!(
            decision,
            ClassifierDecision::Trigger { rule, .. } if rule.trigger == "Select an option:"
        );
    }

    #[test]
    fn error_marker_detected_without_triggers() {
        // 빈 테이블 + traceback → Error
        let mut c = classifier();
        let decision = c.classify(
            Utc::now(),
            "Traceback (most recent call last):\n  File ...\nValueError: bad input",
            "",
            &[],
        );
        // "ValueError:"가 마커 목록의 "error:"에 먼저 걸린다
        match decision {
            ClassifierDecision::Error { marker, excerpt } => {
                assert_eq!(marker, "error:");
                assert!(excerpt.contains("ValueError"));
            }
            other => panic!("Error여야 함: {other:?}"),
        }
    }

    #[test]
    fn traceback_alone_is_detected() {
        let mut c = classifier();
        let decision = c.classify(
            Utc::now(),
            "Traceback (most recent call last):\n  File main.py line 3",
            "",
            &[],
        );
        assert_matches!(
            decision,
            ClassifierDecision::Error { marker, .. } if marker == "traceback"
        );
    }

    #[test]
    fn error_excerpt_contains_context() {
        let mut c = classifier();
        let decision = c.classify(Utc::now(), "before text fatal error: boom after", "", &[]);
        match decision {
            ClassifierDecision::Error { marker, excerpt } => {
                assert_eq!(marker, "fatal error");
                assert!(excerpt.contains("boom"));
                assert!(excerpt.contains("before text"));
            }
            other => panic!("Error여야 함: {other:?}"),
        }
    }

    #[test]
    fn empty_table_never_emits_trigger() {
        let mut c = classifier();
        let decision = c.classify(Utc::now(), "Select an option:", "", &[]);
        assert_matches!(decision, ClassifierDecision::Idle);
    }

    #[test]
    fn rule_outside_tail_window_does_not_fire() {
        let mut c = Classifier::new(10, std::time::Duration::from_secs(30));
        let table = rules(&[("HEAD", "press_enter")]);
        // "HEAD"는 마지막 10자 밖에 있다
        let text = format!("HEAD{}", "x".repeat(50));
        assert_matches!(
            c.classify(Utc::now(), &text, "", &table),
            ClassifierDecision::Idle
        );
    }

    #[test]
    fn rule_inside_tail_window_fires() {
        let mut c = Classifier::new(20, std::time::Duration::from_secs(30));
        let table = rules(&[("TAIL", "press_enter")]);
        let text = format!("{}TAIL", "x".repeat(50));
        assert_matches!(
            c.classify(Utc::now(), &text, "", &table),
            ClassifierDecision::Trigger { .. }
        );
    }

    #[test]
    fn repeat_count_increments_within_window() {
        let mut c = classifier();
        let table = rules(&[("Continue?", "press_enter")]);
        let t0 = Utc::now();

        for (i, offset) in [0i64, 2, 4].iter().enumerate() {
            let now = t0 + Duration::seconds(*offset);
            // 텍스트를 조금씩 바꿔 NoChange를 피한다
            let text = format!("Continue? [{offset}]");
            let decision = c.classify(now, &text, "prev", &table);
            assert_matches!(
                decision,
                ClassifierDecision::Trigger { repeat_count, .. }
                    if repeat_count == (i as u32) + 1
            );
        }
    }

    #[test]
    fn repeat_count_resets_after_window_elapses() {
        let mut c = classifier();
        let table = rules(&[("Continue?", "press_enter")]);
        let t0 = Utc::now();

        c.classify(t0, "Continue? a", "", &table);
        let decision = c.classify(t0 + Duration::seconds(31), "Continue? b", "", &table);
        assert_matches!(
            decision,
            ClassifierDecision::Trigger { repeat_count: 1, .. }
        );
    }

    #[test]
    fn different_rule_resets_repeat_count() {
        let mut c = classifier();
        let table = rules(&[("Alpha", "press_enter"), ("Beta", "press_space")]);
        let t0 = Utc::now();

        c.classify(t0, "Alpha 1", "", &table);
        c.classify(t0 + Duration::seconds(1), "Alpha 2", "x", &table);
        // 다른 규칙 발화 → Alpha의 연속 상태 소멸
        c.classify(t0 + Duration::seconds(2), "Beta", "y", &table);
        let decision = c.classify(t0 + Duration::seconds(3), "Alpha 3", "z", &table);
        assert_matches!(
            decision,
            ClassifierDecision::Trigger { repeat_count: 1, .. }
        );
    }

    #[test]
    fn reset_repeats_clears_rule_state() {
        let mut c = classifier();
        let table = rules(&[("Continue?", "press_enter")]);
        let t0 = Utc::now();

        c.classify(t0, "Continue? a", "", &table);
        c.reset_repeats("Continue?");
        let decision = c.classify(t0 + Duration::seconds(1), "Continue? b", "x", &table);
        assert_matches!(
            decision,
            ClassifierDecision::Trigger { repeat_count: 1, .. }
        );
    }

    #[test]
    fn tail_window_is_char_safe() {
        // 멀티바이트 문자 경계에서 패닉하지 않아야 한다
        let mut c = Classifier::new(5, std::time::Duration::from_secs(30));
        let decision = c.classify(Utc::now(), "한글과 English 혼합 텍스트", "", &[]);
        assert_matches!(decision, ClassifierDecision::Idle);
    }
}

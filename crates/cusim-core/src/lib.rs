//! # cusim-core
//!
//! CUSIM 도메인 모델, 포트(trait) 정의, 에러 타입, 설정.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`] — 도메인 데이터 구조체 (serde Serialize/Deserialize)
//! - [`ports`] — 포트 인터페이스 (async_trait)
//! - [`error`] — 핵심 에러 타입 (thiserror)
//! - [`config`] — 애플리케이션 설정 구조체
//! - [`config_manager`] — 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;

#[cfg(test)]
mod tests {
    use crate::models::action::{ActionDescriptor, SimKey};
    use crate::models::decision::ClassifierDecision;
    use crate::models::trigger::TriggerRule;

    #[test]
    fn decision_carries_parsed_action() {
        let rule = TriggerRule::new("Select an option:", ActionDescriptor::parse("type_1"));
        let decision = ClassifierDecision::Trigger {
            rule,
            repeat_count: 1,
        };

        match decision {
            ClassifierDecision::Trigger { rule, .. } => {
                assert_eq!(rule.action, ActionDescriptor::TypeThenEnter("1".to_string()));
            }
            _ => panic!("Trigger 변형이어야 함"),
        }
    }

    #[test]
    fn press_key_round_trips_through_string_form() {
        let action = ActionDescriptor::PressKey(SimKey::Escape);
        assert_eq!(
            ActionDescriptor::parse(&action.string_form()),
            action
        );
    }
}

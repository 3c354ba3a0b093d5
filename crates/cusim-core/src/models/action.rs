//! 액션 디스크립터 모델.
//!
//! 디스크의 `type_<text>` 문자열 형태는 직렬화 편의일 뿐이며,
//! 메모리에서는 항상 태그된 합 타입이다. 문자열 파싱은 테이블 로드 시
//! 정확히 한 번 수행한다 — 디스패처 내부에서 재파싱하지 않는다.

use serde::{Deserialize, Serialize};

/// 시뮬레이터가 보낼 수 있는 단일 키
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimKey {
    Enter,
    Space,
    Escape,
}

impl SimKey {
    /// 로그/리포트용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            SimKey::Enter => "enter",
            SimKey::Space => "space",
            SimKey::Escape => "escape",
        }
    }
}

/// 트리거에 연결된 액션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ActionDescriptor {
    /// 단일 키 누름
    PressKey(SimKey),
    /// 텍스트 입력 후 Enter (빈 텍스트면 Enter만 보낸다)
    TypeThenEnter(String),
    /// 균등 난수 대기 (초 구간) — 실제 입력은 아니지만 동일 경로로 디스패치
    WaitRandom(u64, u64),
    /// 인식하지 못한 문자열 형태 — 디스패치 시 경고 로그 후 no-op
    Unknown(String),
}

/// `wait_random`의 기본 대기 구간 (초)
const WAIT_RANDOM_RANGE_S: (u64, u64) = (1, 5);

impl ActionDescriptor {
    /// 디스크 문자열 형태를 파싱한다. 테이블 로드 시 한 번만 호출된다.
    ///
    /// 인식 형태: `press_enter` | `press_space` | `press_escape` |
    /// `type_<text>` | `wait_random`. 그 외는 `Unknown`으로 남는다 —
    /// 해당 트리거의 매칭 우선권은 유지되어야 하기 때문이다.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "press_enter" => ActionDescriptor::PressKey(SimKey::Enter),
            "press_space" => ActionDescriptor::PressKey(SimKey::Space),
            "press_escape" => ActionDescriptor::PressKey(SimKey::Escape),
            "wait_random" => {
                ActionDescriptor::WaitRandom(WAIT_RANDOM_RANGE_S.0, WAIT_RANDOM_RANGE_S.1)
            }
            _ => match raw.strip_prefix("type_") {
                Some(text) => ActionDescriptor::TypeThenEnter(text.to_string()),
                None => ActionDescriptor::Unknown(raw.to_string()),
            },
        }
    }

    /// 디스크/이벤트 로그 문자열 형태로 되돌린다
    pub fn string_form(&self) -> String {
        match self {
            ActionDescriptor::PressKey(SimKey::Enter) => "press_enter".to_string(),
            ActionDescriptor::PressKey(SimKey::Space) => "press_space".to_string(),
            ActionDescriptor::PressKey(SimKey::Escape) => "press_escape".to_string(),
            ActionDescriptor::TypeThenEnter(text) => format!("type_{text}"),
            ActionDescriptor::WaitRandom(_, _) => "wait_random".to_string(),
            ActionDescriptor::Unknown(raw) => raw.clone(),
        }
    }

    /// 효과 검증 대상 여부 (`wait_random`은 면제)
    pub fn is_verifiable(&self) -> bool {
        !matches!(self, ActionDescriptor::WaitRandom(_, _))
    }
}

//! 입력(포커스/주입) 포트.
//!
//! 구현: `cusim-automation` crate (enigo, arboard, 플랫폼 네이티브)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::action::ActionDescriptor;

/// 액션 디스패처 — 백엔드 체인을 통한 키/텍스트 주입 (C6)
#[async_trait]
pub trait ActionDispatcher: Send {
    /// 액션을 디스패치하고 성공한 백엔드 이름을 반환한다.
    ///
    /// `WaitRandom`은 대기 후 `"wait"`, `Unknown`은 경고 로그 후
    /// `"noop"`을 반환한다. 모든 백엔드 실패 시
    /// `CoreError::Injection`.
    async fn dispatch(&mut self, action: &ActionDescriptor) -> Result<String, CoreError>;
}

/// 포커스 브로커 — 액션 전 ExtP 창 포커스 (C5)
///
/// 내부 상태는 불투명하다. 창을 제목/핸들/PID로 식별하지 않으며
/// 시작 핸드셰이크가 고정한 MRU 순서만 신뢰한다.
#[async_trait]
pub trait FocusBroker: Send {
    /// Alt-Tab을 재발행해 ExtP로 포커스를 되돌린다.
    ///
    /// 내부 재시도(3회) 소진 시 에러를 반환하지만, 호출자는 경고만
    /// 남기고 액션을 계속 진행해야 한다.
    async fn focus(&mut self) -> Result<(), CoreError>;
}

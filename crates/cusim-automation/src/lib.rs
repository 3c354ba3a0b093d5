//! # cusim-automation
//!
//! 행동 계층 — 입력 주입 백엔드 체인(enigo / 플랫폼 네이티브 /
//! 클립보드), 액션 디스패처, Alt-Tab 포커스 브로커.
//!
//! 실제 입력은 `input` feature flag 뒤에 있으며, 비활성화 빌드는
//! NoOp 백엔드로 폴백한다.

pub mod dispatcher;
pub mod focus;
pub mod input_driver;

pub use dispatcher::InputDispatcher;
pub use focus::AltTabFocusBroker;
pub use input_driver::{create_input_driver, InputBackend, InputDriver, NoOpBackend};

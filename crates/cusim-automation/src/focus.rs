//! Alt-Tab 포커스 브로커.
//!
//! 키 입력이 ExtP에 전달되도록 시작 시 1회 오퍼레이터 보조 핸드셰이크를
//! 수행하고, 이후 모든 액션 직전에 Alt-Tab을 재발행한다.
//!
//! 창을 제목/핸들/PID로 식별하지 않는다 — 창 제목 휴리스틱은 데스크톱
//! 구성에 따라 불안정했고, 핸드셰이크가 고정한 MRU 순서가 계약이다.
//! 대상 창 정체성은 시작 시 한 번 수립되고 다시 식별되지 않는다.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use cusim_core::error::CoreError;
use cusim_core::ports::input::FocusBroker;

use crate::input_driver::InputDriver;

/// 액션 사이클당 Alt-Tab 최대 시도 횟수
const MAX_FOCUS_ATTEMPTS: u32 = 3;

/// Alt-Tab 포커스 브로커 — `FocusBroker` 포트 구현
pub struct AltTabFocusBroker {
    /// 디스패처와 공유하는 드라이버
    driver: Arc<Mutex<InputDriver>>,
    /// Alt-Tab 후 데스크톱 안정화 대기
    settle: Duration,
}

impl AltTabFocusBroker {
    /// 새 포커스 브로커 생성
    pub fn new(driver: Arc<Mutex<InputDriver>>, settle: Duration) -> Self {
        Self { driver, settle }
    }

    /// 시작 핸드셰이크 — 루프 시작 전 1회.
    ///
    /// 오퍼레이터에게 ExtP 창 클릭을 안내하고, 컨트롤러 콘솔에서
    /// `Y` + Enter를 기다린 뒤 Alt-Tab으로 MRU 순서를 고정한다.
    pub async fn startup_handshake(&mut self) -> Result<(), CoreError> {
        println!();
        println!("┌─────────────────────────────────────────────────────────────┐");
        println!("│ 포커스 핸드셰이크                                            │");
        println!("├─────────────────────────────────────────────────────────────┤");
        println!("│ 1. ExtP 콘솔 창을 마우스로 클릭해 포커스를 주세요.           │");
        println!("│ 2. 이 콘솔로 돌아와 'Y' 입력 후 Enter를 누르세요.            │");
        println!("│    (Alt-Tab이 ExtP를 MRU 창으로 고정합니다)                  │");
        println!("└─────────────────────────────────────────────────────────────┘");
        println!();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().eq_ignore_ascii_case("y") => break,
                Ok(Some(_)) => {
                    println!("ExtP 창이 포커스된 상태였다면 'Y'를 입력하세요.");
                }
                Ok(None) | Err(_) => {
                    return Err(CoreError::Focus(
                        "핸드셰이크 입력 스트림이 닫힘".to_string(),
                    ));
                }
            }
        }

        info!("핸드셰이크 승인, Alt-Tab으로 ExtP 복귀");
        self.focus().await
    }
}

#[async_trait]
impl FocusBroker for AltTabFocusBroker {
    async fn focus(&mut self) -> Result<(), CoreError> {
        let mut last_err = None;
        for attempt in 1..=MAX_FOCUS_ATTEMPTS {
            match self.driver.lock().await.send_alt_tab() {
                Ok(backend) => {
                    debug!("Alt-Tab 전송 완료 (백엔드 '{backend}', 시도 {attempt})");
                    tokio::time::sleep(self.settle).await;
                    return Ok(());
                }
                Err(e) => {
                    warn!("Alt-Tab 시도 {attempt}/{MAX_FOCUS_ATTEMPTS} 실패: {e}");
                    last_err = Some(e);
                }
            }
        }
        // 호출자는 경고만 남기고 액션을 계속 진행한다. 비효과가 지속되면
        // window_focus_failure 결함으로 이어진다.
        Err(CoreError::Focus(format!(
            "{MAX_FOCUS_ATTEMPTS}회 시도 후 포커스 실패: {}",
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "원인 불명".to_string())
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_driver::{InputBackend, NoOpBackend};
    use cusim_core::models::action::SimKey;

    struct AlwaysFailBackend;

    impl InputBackend for AlwaysFailBackend {
        fn name(&self) -> &'static str {
            "always-fail"
        }

        fn send_key(&mut self, _key: SimKey) -> Result<(), CoreError> {
            Err(CoreError::Injection("고장".to_string()))
        }

        fn send_text(&mut self, _text: &str) -> Result<(), CoreError> {
            Err(CoreError::Injection("고장".to_string()))
        }

        fn send_alt_tab(&mut self) -> Result<(), CoreError> {
            Err(CoreError::Injection("고장".to_string()))
        }
    }

    fn broker_with(backend: Box<dyn InputBackend>) -> AltTabFocusBroker {
        let driver = Arc::new(Mutex::new(InputDriver::new(vec![backend])));
        AltTabFocusBroker::new(driver, Duration::from_millis(0))
    }

    #[tokio::test]
    async fn focus_succeeds_with_working_backend() {
        let mut broker = broker_with(Box::new(NoOpBackend));
        assert!(broker.focus().await.is_ok());
    }

    #[tokio::test]
    async fn focus_fails_after_exhausting_attempts() {
        let mut broker = broker_with(Box::new(AlwaysFailBackend));
        let err = broker.focus().await.unwrap_err();
        assert!(matches!(err, CoreError::Focus(_)));
    }
}

//! 액션 디스패처.
//!
//! 태그된 `ActionDescriptor`를 백엔드 체인으로 실행한다. 디스크 문자열
//! 형태는 테이블 로드 시 이미 파싱되었으므로 여기서 문자열을 다시
//! 해석하지 않는다.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use cusim_core::error::CoreError;
use cusim_core::models::action::{ActionDescriptor, SimKey};
use cusim_core::ports::input::ActionDispatcher;

use crate::input_driver::InputDriver;

/// 텍스트 입력과 Enter 사이 간격
const TYPE_ENTER_GAP: Duration = Duration::from_millis(500);

/// 입력 디스패처 — 공유 드라이버 위의 `ActionDispatcher` 구현
pub struct InputDispatcher {
    /// 포커스 브로커와 공유하는 드라이버
    driver: Arc<Mutex<InputDriver>>,
}

impl InputDispatcher {
    /// 새 디스패처 생성
    pub fn new(driver: Arc<Mutex<InputDriver>>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl ActionDispatcher for InputDispatcher {
    async fn dispatch(&mut self, action: &ActionDescriptor) -> Result<String, CoreError> {
        match action {
            ActionDescriptor::PressKey(key) => {
                let mut driver = self.driver.lock().await;
                driver.send_key(*key)
            }
            ActionDescriptor::TypeThenEnter(text) => {
                let mut driver = self.driver.lock().await;
                if text.is_empty() {
                    // 빈 텍스트는 Enter만 보낸다
                    return driver.send_key(SimKey::Enter);
                }
                let backend = driver.send_text(text)?;
                tokio::time::sleep(TYPE_ENTER_GAP).await;
                driver.send_key(SimKey::Enter)?;
                Ok(backend)
            }
            ActionDescriptor::WaitRandom(min_s, max_s) => {
                let (lo, hi) = (*min_s.min(max_s), *min_s.max(max_s));
                let millis = rand::rng().random_range(lo * 1_000..=hi * 1_000);
                debug!("wait_random: {millis}ms 대기");
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok("wait".to_string())
            }
            ActionDescriptor::Unknown(raw) => {
                warn!("알 수 없는 액션 '{raw}', no-op 처리");
                Ok("noop".to_string())
            }
        }
    }
}

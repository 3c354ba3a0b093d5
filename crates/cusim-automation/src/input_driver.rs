//! 입력 주입 백엔드 체인.
//!
//! 각 백엔드는 균일한 try-send 인터페이스를 노출하고, 드라이버는
//! 우선순위 순서로 시도해 첫 성공에서 멈춘다. 성공 후 다른 백엔드를
//! 추가로 호출하지 않는다 — 중복 키 입력은 ExtP 상태를 망가뜨린다.
//!
//! 우선순위: enigo(문자 단위 고수준 키 이벤트) → 플랫폼 네이티브 가상
//! 키코드 → 클립보드 설정 + 붙여넣기 키 입력(텍스트 전용).
//! `input` feature 비활성화 빌드는 NoOp 백엔드로 폴백한다.

use std::time::Duration;
use tracing::{debug, warn};

use cusim_core::error::CoreError;
use cusim_core::models::action::SimKey;

/// 문자 단위 타이핑 사이 간격
#[cfg_attr(not(feature = "input"), allow(dead_code))]
const INTER_KEY_DELAY: Duration = Duration::from_millis(50);

/// 입력 백엔드 — 균일한 try-send 인터페이스
pub trait InputBackend: Send {
    /// 백엔드 이름 (ActionOutcome에 기록됨)
    fn name(&self) -> &'static str;

    /// 텍스트 입력 지원 여부
    fn supports_text(&self) -> bool {
        true
    }

    /// 키 입력 지원 여부
    fn supports_key(&self) -> bool {
        true
    }

    /// 단일 키 전송
    fn send_key(&mut self, key: SimKey) -> Result<(), CoreError>;

    /// 텍스트 전송
    fn send_text(&mut self, text: &str) -> Result<(), CoreError>;

    /// Alt-Tab 전송 (포커스 브로커 전용)
    fn send_alt_tab(&mut self) -> Result<(), CoreError>;
}

// ============================================================
// NoOpBackend — 테스트/feature 비활성화 빌드용
// ============================================================

/// No-Op 백엔드 — 모든 입력을 로깅만 하고 성공 처리
pub struct NoOpBackend;

impl InputBackend for NoOpBackend {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn send_key(&mut self, key: SimKey) -> Result<(), CoreError> {
        debug!("[NoOp] 키 전송: {}", key.as_str());
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> Result<(), CoreError> {
        debug!(text_len = text.len(), "[NoOp] 텍스트 전송");
        Ok(())
    }

    fn send_alt_tab(&mut self) -> Result<(), CoreError> {
        debug!("[NoOp] Alt-Tab 전송");
        Ok(())
    }
}

// ============================================================
// EnigoBackend — 고수준 키보드 이벤트 (우선 백엔드)
// ============================================================

/// enigo 기반 백엔드 — 문자 단위 유니코드 키 이벤트.
///
/// macOS: Accessibility 권한 필요
/// Windows: UIAccess 또는 관리자 권한 필요
/// Linux: X11 또는 Wayland + uinput 권한 필요
#[cfg(feature = "input")]
pub struct EnigoBackend {
    enigo: enigo::Enigo,
}

#[cfg(feature = "input")]
impl EnigoBackend {
    /// 새 EnigoBackend 생성
    pub fn new() -> Result<Self, CoreError> {
        let settings = enigo::Settings::default();
        let enigo = enigo::Enigo::new(&settings)
            .map_err(|e| CoreError::Injection(format!("enigo 초기화 실패: {e}")))?;
        Ok(Self { enigo })
    }

    /// SimKey → enigo 키 매핑
    fn to_enigo_key(key: SimKey) -> enigo::Key {
        match key {
            SimKey::Enter => enigo::Key::Return,
            SimKey::Space => enigo::Key::Space,
            SimKey::Escape => enigo::Key::Escape,
        }
    }
}

#[cfg(feature = "input")]
impl InputBackend for EnigoBackend {
    fn name(&self) -> &'static str {
        "enigo"
    }

    fn send_key(&mut self, key: SimKey) -> Result<(), CoreError> {
        use enigo::Keyboard;
        debug!("[Enigo] 키 전송: {}", key.as_str());
        self.enigo
            .key(Self::to_enigo_key(key), enigo::Direction::Click)
            .map_err(|e| CoreError::Injection(format!("키 전송 실패: {e}")))
    }

    fn send_text(&mut self, text: &str) -> Result<(), CoreError> {
        use enigo::Keyboard;
        debug!(text_len = text.len(), "[Enigo] 텍스트 전송 (문자 단위)");
        for ch in text.chars() {
            self.enigo
                .key(enigo::Key::Unicode(ch), enigo::Direction::Click)
                .map_err(|e| CoreError::Injection(format!("문자 '{ch}' 전송 실패: {e}")))?;
            std::thread::sleep(INTER_KEY_DELAY);
        }
        Ok(())
    }

    fn send_alt_tab(&mut self) -> Result<(), CoreError> {
        use enigo::Keyboard;

        // MRU 창 전환: macOS는 Cmd-Tab, 그 외 Alt-Tab
        #[cfg(target_os = "macos")]
        let modifier = enigo::Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = enigo::Key::Alt;

        debug!("[Enigo] Alt-Tab 전송");
        self.enigo
            .key(modifier, enigo::Direction::Press)
            .map_err(|e| CoreError::Injection(format!("modifier Press 실패: {e}")))?;
        let tab = self
            .enigo
            .key(enigo::Key::Tab, enigo::Direction::Click)
            .map_err(|e| CoreError::Injection(format!("Tab Click 실패: {e}")));
        // Tab이 실패해도 modifier는 반드시 놓는다
        let release = self
            .enigo
            .key(modifier, enigo::Direction::Release)
            .map_err(|e| CoreError::Injection(format!("modifier Release 실패: {e}")));
        tab.and(release)
    }
}

// ============================================================
// PlatformKeyBackend — OS 네이티브 가상 키코드
// ============================================================

/// Windows 네이티브 백엔드 — SendInput 가상 키코드 이벤트
#[cfg(target_os = "windows")]
pub struct PlatformKeyBackend;

#[cfg(target_os = "windows")]
impl PlatformKeyBackend {
    /// 새 네이티브 백엔드 생성
    pub fn new() -> Self {
        Self
    }

    fn virtual_key(key: SimKey) -> u16 {
        use windows_sys::Win32::UI::Input::KeyboardAndMouse::{VK_ESCAPE, VK_RETURN, VK_SPACE};
        match key {
            SimKey::Enter => VK_RETURN,
            SimKey::Space => VK_SPACE,
            SimKey::Escape => VK_ESCAPE,
        }
    }

    fn send_vk(vk: u16, key_up: bool) -> Result<(), CoreError> {
        use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
            SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP,
        };

        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    wScan: 0,
                    dwFlags: if key_up { KEYEVENTF_KEYUP } else { 0 },
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };

        let sent = unsafe { SendInput(1, &input, std::mem::size_of::<INPUT>() as i32) };
        if sent == 1 {
            Ok(())
        } else {
            Err(CoreError::Injection(format!(
                "SendInput 실패 (vk={vk:#x})"
            )))
        }
    }

    fn press_vk(vk: u16) -> Result<(), CoreError> {
        Self::send_vk(vk, false)?;
        Self::send_vk(vk, true)
    }
}

#[cfg(target_os = "windows")]
impl InputBackend for PlatformKeyBackend {
    fn name(&self) -> &'static str {
        "win32"
    }

    fn supports_text(&self) -> bool {
        false
    }

    fn send_key(&mut self, key: SimKey) -> Result<(), CoreError> {
        debug!("[Win32] 키 전송: {}", key.as_str());
        Self::press_vk(Self::virtual_key(key))
    }

    fn send_text(&mut self, _text: &str) -> Result<(), CoreError> {
        Err(CoreError::Injection(
            "win32 백엔드는 텍스트를 지원하지 않음".to_string(),
        ))
    }

    fn send_alt_tab(&mut self) -> Result<(), CoreError> {
        use windows_sys::Win32::UI::Input::KeyboardAndMouse::{VK_MENU, VK_TAB};
        debug!("[Win32] Alt-Tab 전송");
        Self::send_vk(VK_MENU, false)?;
        let tab = Self::press_vk(VK_TAB);
        let release = Self::send_vk(VK_MENU, true);
        tab.and(release)
    }
}

/// macOS 네이티브 백엔드 — CGEvent 키 이벤트
#[cfg(target_os = "macos")]
pub struct PlatformKeyBackend;

#[cfg(target_os = "macos")]
impl PlatformKeyBackend {
    /// 새 네이티브 백엔드 생성
    pub fn new() -> Self {
        Self
    }

    fn key_code(key: SimKey) -> u16 {
        match key {
            SimKey::Enter => 36,
            SimKey::Space => 49,
            SimKey::Escape => 53,
        }
    }

    fn post_key(code: u16, down: bool) -> Result<(), CoreError> {
        use core_graphics::event::{CGEvent, CGEventTapLocation};
        use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| CoreError::Injection("CGEventSource 생성 실패".to_string()))?;
        let event = CGEvent::new_keyboard_event(source, code, down)
            .map_err(|_| CoreError::Injection(format!("CGEvent 생성 실패 (code={code})")))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn press_key(code: u16) -> Result<(), CoreError> {
        Self::post_key(code, true)?;
        Self::post_key(code, false)
    }
}

#[cfg(target_os = "macos")]
impl InputBackend for PlatformKeyBackend {
    fn name(&self) -> &'static str {
        "cgevent"
    }

    fn supports_text(&self) -> bool {
        false
    }

    fn send_key(&mut self, key: SimKey) -> Result<(), CoreError> {
        debug!("[CGEvent] 키 전송: {}", key.as_str());
        Self::press_key(Self::key_code(key))
    }

    fn send_text(&mut self, _text: &str) -> Result<(), CoreError> {
        Err(CoreError::Injection(
            "cgevent 백엔드는 텍스트를 지원하지 않음".to_string(),
        ))
    }

    fn send_alt_tab(&mut self) -> Result<(), CoreError> {
        // macOS의 MRU 전환은 Cmd-Tab (keycode 55 = Command, 48 = Tab)
        debug!("[CGEvent] Cmd-Tab 전송");
        Self::post_key(55, true)?;
        let tab = Self::press_key(48);
        let release = Self::post_key(55, false);
        tab.and(release)
    }
}

// ============================================================
// ClipboardBackend — 클립보드 설정 + 붙여넣기 (텍스트 전용)
// ============================================================

/// 클립보드 백엔드 — 텍스트를 클립보드에 넣고 붙여넣기 키 입력.
///
/// 사용자가 복사해 둔 내용을 덮어쓴다 — 문서화된 동작이며 완화하지
/// 않는다.
#[cfg(feature = "input")]
pub struct ClipboardBackend {
    enigo: enigo::Enigo,
}

#[cfg(feature = "input")]
impl ClipboardBackend {
    /// 새 클립보드 백엔드 생성
    pub fn new() -> Result<Self, CoreError> {
        let settings = enigo::Settings::default();
        let enigo = enigo::Enigo::new(&settings)
            .map_err(|e| CoreError::Injection(format!("붙여넣기용 enigo 초기화 실패: {e}")))?;
        Ok(Self { enigo })
    }
}

#[cfg(feature = "input")]
impl InputBackend for ClipboardBackend {
    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn supports_key(&self) -> bool {
        false
    }

    fn send_key(&mut self, _key: SimKey) -> Result<(), CoreError> {
        Err(CoreError::Injection(
            "clipboard 백엔드는 키를 지원하지 않음".to_string(),
        ))
    }

    fn send_text(&mut self, text: &str) -> Result<(), CoreError> {
        use enigo::Keyboard;

        debug!(text_len = text.len(), "[Clipboard] 텍스트 전송");
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| CoreError::Injection(format!("클립보드 열기 실패: {e}")))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| CoreError::Injection(format!("클립보드 설정 실패: {e}")))?;

        // 붙여넣기 단축키 (macOS는 Cmd-V, 그 외 Ctrl-V)
        #[cfg(target_os = "macos")]
        let modifier = enigo::Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = enigo::Key::Control;

        self.enigo
            .key(modifier, enigo::Direction::Press)
            .map_err(|e| CoreError::Injection(format!("붙여넣기 modifier Press 실패: {e}")))?;
        let v = self
            .enigo
            .key(enigo::Key::Unicode('v'), enigo::Direction::Click)
            .map_err(|e| CoreError::Injection(format!("붙여넣기 V 실패: {e}")));
        let release = self
            .enigo
            .key(modifier, enigo::Direction::Release)
            .map_err(|e| CoreError::Injection(format!("붙여넣기 modifier Release 실패: {e}")));
        v.and(release)
    }

    fn send_alt_tab(&mut self) -> Result<(), CoreError> {
        Err(CoreError::Injection(
            "clipboard 백엔드는 Alt-Tab을 지원하지 않음".to_string(),
        ))
    }
}

// ============================================================
// InputDriver — 우선순위 체인
// ============================================================

/// 입력 드라이버 — 백엔드 체인을 우선순위 순서로 시도
pub struct InputDriver {
    backends: Vec<Box<dyn InputBackend>>,
}

impl InputDriver {
    /// 지정된 백엔드 체인으로 드라이버 생성
    pub fn new(backends: Vec<Box<dyn InputBackend>>) -> Self {
        Self { backends }
    }

    /// 키 전송 — 첫 성공 백엔드 이름 반환
    pub fn send_key(&mut self, key: SimKey) -> Result<String, CoreError> {
        let mut errors = Vec::new();
        for backend in self.backends.iter_mut().filter(|b| b.supports_key()) {
            match backend.send_key(key) {
                Ok(()) => return Ok(backend.name().to_string()),
                Err(e) => {
                    warn!("백엔드 '{}' 키 전송 실패: {e}", backend.name());
                    errors.push(format!("{}: {e}", backend.name()));
                }
            }
        }
        Err(CoreError::Injection(format!(
            "모든 백엔드 키 전송 실패: [{}]",
            errors.join("; ")
        )))
    }

    /// 텍스트 전송 — 첫 성공 백엔드 이름 반환
    pub fn send_text(&mut self, text: &str) -> Result<String, CoreError> {
        let mut errors = Vec::new();
        for backend in self.backends.iter_mut().filter(|b| b.supports_text()) {
            match backend.send_text(text) {
                Ok(()) => return Ok(backend.name().to_string()),
                Err(e) => {
                    warn!("백엔드 '{}' 텍스트 전송 실패: {e}", backend.name());
                    errors.push(format!("{}: {e}", backend.name()));
                }
            }
        }
        Err(CoreError::Injection(format!(
            "모든 백엔드 텍스트 전송 실패: [{}]",
            errors.join("; ")
        )))
    }

    /// Alt-Tab 전송 — 첫 성공 백엔드 이름 반환
    pub fn send_alt_tab(&mut self) -> Result<String, CoreError> {
        let mut errors = Vec::new();
        for backend in self.backends.iter_mut() {
            match backend.send_alt_tab() {
                Ok(()) => return Ok(backend.name().to_string()),
                Err(e) => {
                    warn!("백엔드 '{}' Alt-Tab 실패: {e}", backend.name());
                    errors.push(format!("{}: {e}", backend.name()));
                }
            }
        }
        Err(CoreError::Focus(format!(
            "모든 백엔드 Alt-Tab 실패: [{}]",
            errors.join("; ")
        )))
    }

    /// 체인의 백엔드 수
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }
}

/// 플랫폼별 기본 백엔드 체인 생성 팩토리.
///
/// `input` feature 활성화 시 enigo → 플랫폼 네이티브 → 클립보드 순서,
/// 사용 가능한 백엔드가 하나도 없으면 NoOp 폴백.
pub fn create_input_driver() -> InputDriver {
    let mut backends: Vec<Box<dyn InputBackend>> = Vec::new();

    #[cfg(feature = "input")]
    {
        match EnigoBackend::new() {
            Ok(backend) => {
                tracing::info!("enigo 입력 백엔드 초기화 완료");
                backends.push(Box::new(backend));
            }
            Err(e) => {
                warn!("enigo 초기화 실패: {e}");
            }
        }
    }

    #[cfg(any(target_os = "windows", target_os = "macos"))]
    {
        backends.push(Box::new(PlatformKeyBackend::new()));
    }

    #[cfg(feature = "input")]
    {
        match ClipboardBackend::new() {
            Ok(backend) => backends.push(Box::new(backend)),
            Err(e) => {
                warn!("클립보드 백엔드 초기화 실패: {e}");
            }
        }
    }

    if backends.is_empty() {
        warn!("사용 가능한 주입 백엔드 없음, NoOp 폴백");
        backends.push(Box::new(NoOpBackend));
    }

    InputDriver::new(backends)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// 호출 기록용 가짜 백엔드
    struct RecordingBackend {
        name: &'static str,
        fail: bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl InputBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        fn send_key(&mut self, key: SimKey) -> Result<(), CoreError> {
            if self.fail {
                return Err(CoreError::Injection("고장".to_string()));
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:key:{}", self.name, key.as_str()));
            Ok(())
        }

        fn send_text(&mut self, text: &str) -> Result<(), CoreError> {
            if self.fail {
                return Err(CoreError::Injection("고장".to_string()));
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:text:{}", self.name, text));
            Ok(())
        }

        fn send_alt_tab(&mut self) -> Result<(), CoreError> {
            if self.fail {
                return Err(CoreError::Injection("고장".to_string()));
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:alt_tab", self.name));
            Ok(())
        }
    }

    fn chain(
        specs: &[(&'static str, bool)],
    ) -> (InputDriver, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let backends: Vec<Box<dyn InputBackend>> = specs
            .iter()
            .map(|(name, fail)| {
                Box::new(RecordingBackend {
                    name,
                    fail: *fail,
                    calls: Arc::clone(&calls),
                }) as Box<dyn InputBackend>
            })
            .collect();
        (InputDriver::new(backends), calls)
    }

    #[test]
    fn first_successful_backend_wins() {
        let (mut driver, calls) = chain(&[("first", false), ("second", false)]);
        let backend = driver.send_key(SimKey::Enter).unwrap();
        assert_eq!(backend, "first");
        // 성공 후 두 번째 백엔드는 호출되지 않는다 — 중복 키 입력 금지
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn failed_backend_falls_through() {
        let (mut driver, calls) = chain(&[("broken", true), ("fallback", false)]);
        let backend = driver.send_text("1").unwrap();
        assert_eq!(backend, "fallback");
        assert_eq!(calls.lock().unwrap()[0], "fallback:text:1");
    }

    #[test]
    fn all_backends_failing_is_injection_error() {
        let (mut driver, _) = chain(&[("a", true), ("b", true)]);
        let err = driver.send_key(SimKey::Escape).unwrap_err();
        assert!(matches!(err, CoreError::Injection(_)));
    }

    #[test]
    fn noop_backend_accepts_everything() {
        let mut backend = NoOpBackend;
        assert!(backend.send_key(SimKey::Enter).is_ok());
        assert!(backend.send_text("hello").is_ok());
        assert!(backend.send_alt_tab().is_ok());
    }

    #[test]
    fn factory_always_yields_at_least_one_backend() {
        let driver = create_input_driver();
        assert!(driver.backend_count() >= 1);
    }
}

//! 비전(캡처/OCR) 포트.
//!
//! 구현: `cusim-vision` crate (xcap, image, leptess)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::frame::Frame;

/// 스크린 샘플러 — 주기적 캡처 (C1)
///
/// 성공 시 반환 전에 이미지 파일이 디스크에 존재함을 보장한다.
/// 실패 시 타입화된 에러를 반환하고 루프는 계속된다 — 재시도는
/// 호출자(다음 틱)의 몫이다.
#[async_trait]
pub trait ScreenSampler: Send {
    /// 프레임 캡처
    async fn capture(&mut self) -> Result<Frame, CoreError>;
}

/// 텍스트 추출기 — 프레임 → UTF-8 텍스트 (C2)
///
/// 계약: 성공 시 트리밍된 텍스트, 어떤 백엔드 실패에도 빈 문자열.
/// 루프로 에러를 올리지 않는다.
#[async_trait]
pub trait TextExtractor: Send {
    /// 프레임에서 텍스트 추출 (실패 시 빈 문자열)
    async fn extract(&mut self, frame: &Frame) -> String;
}

//! OCR 텍스트 추출.
//!
//! `leptess` 기반 Tesseract OCR 래퍼. `ocr` feature flag 활성화 시에만
//! 빌드되며, 비활성화 빌드는 빈 문자열 모드로 동작한다.
//!
//! 계약: 어떤 백엔드 실패도 루프로 전파되지 않는다. 백엔드가 없거나
//! 초기화에 실패하면 세션 잔여 기간 동안 빈 문자열 모드로 강등하고
//! 그 사실을 한 번만 로그에 남긴다.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
#[cfg(feature = "ocr")]
use tracing::debug;
use tracing::warn;

use cusim_core::models::frame::Frame;
use cusim_core::ports::vision::TextExtractor;

/// OCR 에러 타입
#[derive(Debug, Error)]
pub enum OcrError {
    /// Tesseract 초기화 실패 — 세션 강등 사유
    #[error("OCR 초기화 실패: {0}")]
    Init(String),

    /// 이미지 설정 실패
    #[error("OCR 이미지 설정 실패: {0}")]
    ImageSetup(String),

    /// 텍스트 추출 실패
    #[error("OCR 텍스트 추출 실패: {0}")]
    Extraction(String),

    /// 빈 이미지 입력
    #[error("빈 이미지: 너비 또는 높이가 0")]
    EmptyImage,

    /// 비동기 작업 실패
    #[error("OCR 비동기 작업 실패: {0}")]
    Async(String),
}

/// OCR 텍스트 추출기 (leptess 래퍼)
#[cfg(feature = "ocr")]
pub struct OcrExtractor {
    /// Tesseract 데이터 경로 (None이면 시스템 기본값)
    tessdata_path: Option<PathBuf>,
}

#[cfg(feature = "ocr")]
impl OcrExtractor {
    /// 새 OCR 추출기 생성
    pub fn new(tessdata_path: Option<PathBuf>) -> Self {
        Self { tessdata_path }
    }

    /// 이미지에서 텍스트 추출 (동기)
    pub fn extract(&self, image: &image::DynamicImage) -> Result<String, OcrError> {
        let rgba = image.to_rgba8();
        let (w, h) = (rgba.width(), rgba.height());

        if w == 0 || h == 0 {
            return Err(OcrError::EmptyImage);
        }

        let tessdata = self
            .tessdata_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string());

        let mut lt = leptess::LepTess::new(tessdata.as_deref(), "eng")
            .map_err(|e| OcrError::Init(format!("{e}")))?;

        lt.set_image_from_mem(rgba.as_raw(), w as i32, h as i32, 4, (w * 4) as i32)
            .map_err(|_| OcrError::ImageSetup("이미지 메모리 설정 실패".to_string()))?;

        let text = lt
            .get_utf8_text()
            .map_err(|e| OcrError::Extraction(format!("{e}")))?;

        Ok(text.trim().to_string())
    }

    /// 이미지에서 텍스트 추출 (비동기)
    ///
    /// spawn_blocking으로 루프 스레드 블로킹 제거.
    pub async fn extract_async(&self, image: &image::DynamicImage) -> Result<String, OcrError> {
        let rgba = image.to_rgba8();
        let (w, h) = (rgba.width(), rgba.height());

        if w == 0 || h == 0 {
            return Err(OcrError::EmptyImage);
        }

        let tessdata = self
            .tessdata_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string());
        let raw_data = rgba.into_raw();

        tokio::task::spawn_blocking(move || {
            let mut lt = leptess::LepTess::new(tessdata.as_deref(), "eng")
                .map_err(|e| OcrError::Init(format!("{e}")))?;

            lt.set_image_from_mem(&raw_data, w as i32, h as i32, 4, (w * 4) as i32)
                .map_err(|_| OcrError::ImageSetup("이미지 메모리 설정 실패".to_string()))?;

            let text = lt
                .get_utf8_text()
                .map_err(|e| OcrError::Extraction(format!("{e}")))?;

            Ok(text.trim().to_string())
        })
        .await
        .map_err(|e| OcrError::Async(format!("작업 조인 실패: {e}")))?
    }
}

// ============================================================
// TextReader — 강등 가능한 TextExtractor 어댑터
// ============================================================

/// 텍스트 리더 — OCR 백엔드를 감싸고 실패를 빈 문자열로 흡수한다.
///
/// `ocr` feature 비활성화 빌드에서는 항상 빈 문자열을 반환하며
/// 그 사실을 한 번만 경고한다.
pub struct TextReader {
    /// Tesseract 데이터 경로
    #[cfg_attr(not(feature = "ocr"), allow(dead_code))]
    tessdata_path: Option<PathBuf>,
    /// 백엔드 초기화 실패 후 세션 잔여 기간 빈 문자열 모드
    degraded: bool,
    /// "OCR 사용 불가" 안내를 이미 남겼는가
    warned: bool,
}

impl TextReader {
    /// 새 텍스트 리더 생성
    pub fn new(tessdata_path: Option<PathBuf>) -> Self {
        Self {
            tessdata_path,
            degraded: false,
            warned: false,
        }
    }

    /// 세션 강등 상태 여부
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// "OCR 사용 불가" 경고 — 세션당 한 번만
    fn warn_once(&mut self, reason: &str) {
        if !self.warned {
            warn!("OCR 사용 불가, 빈 텍스트 모드로 동작: {reason}");
            self.warned = true;
        }
    }
}

#[async_trait]
impl TextExtractor for TextReader {
    async fn extract(&mut self, frame: &Frame) -> String {
        #[cfg(feature = "ocr")]
        {
            if self.degraded {
                return String::new();
            }

            let image = match image::open(&frame.image_path) {
                Ok(img) => img,
                Err(e) => {
                    debug!(
                        "프레임 이미지 열기 실패: {}: {}",
                        frame.image_path.display(),
                        e
                    );
                    return String::new();
                }
            };

            let extractor = OcrExtractor::new(self.tessdata_path.clone());
            match extractor.extract_async(&image).await {
                Ok(text) => text,
                Err(OcrError::Init(reason)) => {
                    // 백엔드 부재/오설정 — 세션 잔여 기간 강등
                    self.degraded = true;
                    self.warn_once(&reason);
                    String::new()
                }
                Err(e) => {
                    debug!("OCR 추출 실패 (프레임 {}): {e}", frame.frame_id);
                    String::new()
                }
            }
        }

        #[cfg(not(feature = "ocr"))]
        {
            let _ = frame;
            self.warn_once("ocr feature 비활성화 빌드");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cusim_core::models::frame::CaptureRegion;

    fn dummy_frame() -> Frame {
        Frame {
            frame_id: 1,
            taken_at: Utc::now(),
            image_path: PathBuf::from("/nonexistent/screenshot_0.png"),
            region: CaptureRegion::Full,
        }
    }

    #[test]
    fn error_display_messages() {
        let e = OcrError::Init("테스트".to_string());
        assert!(e.to_string().contains("초기화"));

        let e = OcrError::EmptyImage;
        assert!(e.to_string().contains("빈 이미지"));
    }

    #[tokio::test]
    async fn missing_image_yields_empty_text() {
        let mut reader = TextReader::new(None);
        let text = reader.extract(&dummy_frame()).await;
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn repeated_failures_never_panic() {
        let mut reader = TextReader::new(None);
        for _ in 0..3 {
            assert!(reader.extract(&dummy_frame()).await.is_empty());
        }
    }

    #[cfg(feature = "ocr")]
    #[test]
    fn empty_image_returns_error() {
        let extractor = OcrExtractor::new(None);
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(0, 0));
        let result = extractor.extract(&img);
        assert!(matches!(result.unwrap_err(), OcrError::EmptyImage));
    }

    #[cfg(not(feature = "ocr"))]
    #[tokio::test]
    async fn feature_off_build_is_empty_text_mode() {
        let mut reader = TextReader::new(None);
        assert!(reader.extract(&dummy_frame()).await.is_empty());
        assert!(!reader.is_degraded());
    }
}

//! 프레임(스크린샷) 메타데이터 모델.
//!
//! 캡처 파이프라인이 생성하는 불변 프레임 레코드와 캡처 영역을 정의.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 캡처된 프레임 — 생성 후 불변, 세션 동안 유지
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// 단조 증가 프레임 ID
    pub frame_id: u64,
    /// 캡처 시각
    pub taken_at: DateTime<Utc>,
    /// 디스크에 기록된 이미지 파일 경로 (반환 시점에 이미 존재함)
    pub image_path: PathBuf,
    /// 캡처 영역
    pub region: CaptureRegion,
}

/// 캡처 영역 — 전체 화면 또는 설정된 사각형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CaptureRegion {
    /// 전체 데스크톱
    Full,
    /// 지정 사각형
    Rect(ScreenRegion),
}

/// 화면 사각 영역
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// 프레임에서 추출된 OCR 텍스트.
///
/// 빈 문자열은 "OCR이 아무것도 얻지 못함"을 뜻하는 정상 값이며
/// 루프를 멈추지 않는다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrText {
    /// 출처 프레임 ID
    pub frame_id: u64,
    /// 추출 텍스트 (빈 문자열 허용)
    pub text: String,
    /// 백엔드 신뢰도 (제공되는 경우에만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

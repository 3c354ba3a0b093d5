//! 스크린샷 주석.
//!
//! 결함 리포트에 첨부되는 스크린샷 위에 기대/실제/에러 영역 사각형을
//! 그린다. 호출자가 좌표를 제공한 경우에만 사용된다.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as ImageRect;
use std::path::Path;
use tracing::debug;

use cusim_core::error::CoreError;
use cusim_core::models::defect::{AnnotationKind, AnnotationRegion};

/// 사각형 테두리 두께 (픽셀)
const BORDER_PX: u32 = 3;

/// 영역 의미별 색상
fn region_color(kind: AnnotationKind) -> Rgba<u8> {
    match kind {
        AnnotationKind::ExpectedRegion => Rgba([0, 200, 0, 255]),
        AnnotationKind::ActualRegion => Rgba([255, 165, 0, 255]),
        AnnotationKind::ErrorLocation => Rgba([220, 0, 0, 255]),
    }
}

/// 원본 스크린샷에 영역 오버레이를 그려 사본으로 저장한다.
///
/// 이미지 경계를 벗어나는 영역은 건너뛴다 — 주석은 보조 정보이므로
/// 리포트 작성 자체를 실패시키지 않는다.
pub fn annotate_regions(
    src: &Path,
    dst: &Path,
    regions: &[AnnotationRegion],
) -> Result<(), CoreError> {
    let image = image::open(src)
        .map_err(|e| CoreError::Report(format!("주석 원본 열기 실패: {}: {}", src.display(), e)))?;
    let mut canvas: RgbaImage = image.to_rgba8();
    let (img_w, img_h) = (canvas.width(), canvas.height());

    for annotation in regions {
        let r = annotation.region;
        if r.w == 0 || r.h == 0 || r.x >= img_w || r.y >= img_h {
            debug!(
                "이미지 경계 밖 주석 영역 건너뜀: ({}, {}) {}x{}",
                r.x, r.y, r.w, r.h
            );
            continue;
        }
        let w = r.w.min(img_w - r.x);
        let h = r.h.min(img_h - r.y);
        let color = region_color(annotation.kind);

        // 중첩 사각형으로 테두리 두께 표현
        for inset in 0..BORDER_PX {
            if w <= inset * 2 || h <= inset * 2 {
                break;
            }
            let rect = ImageRect::at((r.x + inset) as i32, (r.y + inset) as i32)
                .of_size(w - inset * 2, h - inset * 2);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
    }

    canvas
        .save(dst)
        .map_err(|e| CoreError::Report(format!("주석 사본 저장 실패: {}: {}", dst.display(), e)))?;

    Ok(())
}

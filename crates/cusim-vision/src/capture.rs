//! 스크린 캡처.
//!
//! xcap 기반 주 모니터 캡처 + 롤링 스크린샷 저장소.
//! 성공 시 반환 전에 PNG가 디스크에 존재하며, 실패 시 타입화된 에러를
//! 반환하고 제자리 재시도는 하지 않는다 — 다음 틱이 재시도다.

use async_trait::async_trait;
use chrono::Utc;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xcap::Monitor;

use cusim_core::error::CoreError;
use cusim_core::models::frame::{CaptureRegion, Frame, ScreenRegion};
use cusim_core::ports::vision::ScreenSampler;

/// 스크린 캡처 — xcap 기반
///
/// 파일명은 `screenshot_<unix-seconds>.png`, 같은 초 내 충돌 시
/// `-NNN` 접미사를 붙인다. `max_screenshots`를 넘으면 가장 오래된
/// 파일부터 정리한다 (0이면 무제한).
pub struct ScreenCapture {
    /// 스크린샷 저장 디렉토리
    screenshot_dir: PathBuf,
    /// 캡처 영역 (None이면 전체 화면)
    region: Option<ScreenRegion>,
    /// 보존 상한 (개수)
    max_screenshots: usize,
    /// 단조 증가 프레임 ID
    frame_seq: u64,
}

impl ScreenCapture {
    /// 새 캡처 인스턴스 생성 (저장 디렉토리를 만든다)
    pub fn new(
        screenshot_dir: PathBuf,
        region: Option<ScreenRegion>,
        max_screenshots: usize,
    ) -> Result<Self, CoreError> {
        fs::create_dir_all(&screenshot_dir).map_err(|e| {
            CoreError::Capture(format!(
                "스크린샷 디렉토리 생성 실패: {}: {}",
                screenshot_dir.display(),
                e
            ))
        })?;
        Ok(Self {
            screenshot_dir,
            region,
            max_screenshots,
            frame_seq: 0,
        })
    }

    /// 주 모니터 스크린 캡처
    fn capture_primary(&self) -> Result<DynamicImage, CoreError> {
        let monitors = Monitor::all()
            .map_err(|e| CoreError::Capture(format!("모니터 목록 조회 실패: {e}")))?;

        let monitor = monitors
            .into_iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| Monitor::all().ok()?.into_iter().next())
            .ok_or_else(|| CoreError::Capture("모니터를 찾을 수 없음".to_string()))?;

        let image = monitor
            .capture_image()
            .map_err(|e| CoreError::Capture(format!("스크린 캡처 실패: {e}")))?;

        debug!("스크린 캡처 완료: {}x{}", image.width(), image.height());

        Ok(DynamicImage::ImageRgba8(image))
    }

    /// 설정된 영역으로 잘라낸다 (이미지 경계로 클램핑)
    fn crop_to_region(image: DynamicImage, region: &ScreenRegion) -> DynamicImage {
        let (img_w, img_h) = (image.width(), image.height());
        let x = region.x.min(img_w.saturating_sub(1));
        let y = region.y.min(img_h.saturating_sub(1));
        let w = region.w.min(img_w - x).max(1);
        let h = region.h.min(img_h - y).max(1);
        image.crop_imm(x, y, w, h)
    }

    /// 이미지를 PNG로 영속화하고 경로를 반환한다
    pub fn persist_image(&mut self, image: &DynamicImage) -> Result<PathBuf, CoreError> {
        let secs = Utc::now().timestamp();
        let mut path = self.screenshot_dir.join(format!("screenshot_{secs}.png"));

        // 같은 초 내 충돌 시 접미사로 구분
        let mut suffix = 1u32;
        while path.exists() {
            path = self
                .screenshot_dir
                .join(format!("screenshot_{secs}-{suffix:03}.png"));
            suffix += 1;
        }

        image
            .save(&path)
            .map_err(|e| CoreError::Capture(format!("스크린샷 저장 실패: {}: {}", path.display(), e)))?;

        self.prune_old_screenshots();

        Ok(path)
    }

    /// 보존 상한을 넘는 가장 오래된 스크린샷부터 삭제
    ///
    /// 루프가 단일 스레드이므로 작성 중인 결함 리포트가 참조하는
    /// 프레임을 앞지를 수 없다 — 리포트는 다음 캡처 전에 플러시된다.
    fn prune_old_screenshots(&self) {
        if self.max_screenshots == 0 {
            return;
        }

        let mut entries: Vec<(PathBuf, std::time::SystemTime)> = match fs::read_dir(&self.screenshot_dir)
        {
            Ok(rd) => rd
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.file_name()
                        .to_string_lossy()
                        .starts_with("screenshot_")
                })
                .filter_map(|e| {
                    let modified = e.metadata().ok()?.modified().ok()?;
                    Some((e.path(), modified))
                })
                .collect(),
            Err(e) => {
                warn!("스크린샷 디렉토리 조회 실패, 정리 생략: {e}");
                return;
            }
        };

        if entries.len() <= self.max_screenshots {
            return;
        }

        entries.sort_by_key(|(_, modified)| *modified);
        let excess = entries.len() - self.max_screenshots;
        for (path, _) in entries.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("오래된 스크린샷 삭제 실패: {}: {}", path.display(), e);
            } else {
                debug!("오래된 스크린샷 삭제: {}", path.display());
            }
        }
    }

    /// 스크린샷 저장 디렉토리
    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }
}

#[async_trait]
impl ScreenSampler for ScreenCapture {
    async fn capture(&mut self) -> Result<Frame, CoreError> {
        let image = self.capture_primary()?;

        let (image, region) = match self.region {
            Some(r) => (Self::crop_to_region(image, &r), CaptureRegion::Rect(r)),
            None => (image, CaptureRegion::Full),
        };

        let image_path = self.persist_image(&image)?;

        self.frame_seq += 1;
        Ok(Frame {
            frame_id: self.frame_seq,
            taken_at: Utc::now(),
            image_path,
            region,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use tempfile::TempDir;

    fn test_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::new(w, h))
    }

    #[test]
    fn persist_writes_png_before_returning() {
        let dir = TempDir::new().unwrap();
        let mut capture = ScreenCapture::new(dir.path().to_path_buf(), None, 0).unwrap();

        let path = capture.persist_image(&test_image(8, 8)).unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("screenshot_"));
    }

    #[test]
    fn same_second_collisions_get_suffix() {
        let dir = TempDir::new().unwrap();
        let mut capture = ScreenCapture::new(dir.path().to_path_buf(), None, 0).unwrap();

        let first = capture.persist_image(&test_image(4, 4)).unwrap();
        let second = capture.persist_image(&test_image(4, 4)).unwrap();
        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
    }

    #[test]
    fn prune_keeps_only_max_screenshots() {
        let dir = TempDir::new().unwrap();
        let mut capture = ScreenCapture::new(dir.path().to_path_buf(), None, 2).unwrap();

        for _ in 0..4 {
            capture.persist_image(&test_image(4, 4)).unwrap();
        }

        let count = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 2);
    }

    #[test]
    fn zero_max_means_unbounded() {
        let dir = TempDir::new().unwrap();
        let mut capture = ScreenCapture::new(dir.path().to_path_buf(), None, 0).unwrap();

        for _ in 0..5 {
            capture.persist_image(&test_image(4, 4)).unwrap();
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 5);
    }

    #[test]
    fn crop_clamps_to_image_bounds() {
        let region = ScreenRegion {
            x: 90,
            y: 90,
            w: 100,
            h: 100,
        };
        let cropped = ScreenCapture::crop_to_region(test_image(100, 100), &region);
        assert_eq!(cropped.width(), 10);
        assert_eq!(cropped.height(), 10);
    }

    #[test]
    fn crop_inside_bounds_is_exact() {
        let region = ScreenRegion {
            x: 10,
            y: 20,
            w: 30,
            h: 40,
        };
        let cropped = ScreenCapture::crop_to_region(test_image(100, 100), &region);
        assert_eq!(cropped.width(), 30);
        assert_eq!(cropped.height(), 40);
    }
}

//! 에러 인박스 감시.
//!
//! 외부 도구가 에러 파일을 떨어뜨리는 디렉토리를 틱마다 폴링해 *새*
//! 파일명만 감지한다. 파일은 절대 읽거나 지우지 않는다 — 내용은 다른
//! 소비자의 몫이고, 이 시스템은 냉각 신호로만 쓴다.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use cusim_core::error::CoreError;

/// 에러 인박스 — 새 파일명 감지기
pub struct ErrorInbox {
    /// 감시 디렉토리
    dir: PathBuf,
    /// 이미 본 파일명
    seen: HashSet<OsString>,
}

impl ErrorInbox {
    /// 새 인박스 감시자 생성.
    ///
    /// 디렉토리를 만들고, 이미 있는 파일명은 기존 것으로 간주한다 —
    /// 시작 시점의 잔존 파일이 냉각을 유발하지 않는다.
    pub fn new(dir: PathBuf) -> Result<Self, CoreError> {
        fs::create_dir_all(&dir).map_err(|e| {
            CoreError::Report(format!(
                "에러 인박스 디렉토리 생성 실패: {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut inbox = Self {
            dir,
            seen: HashSet::new(),
        };
        inbox.poll_new();
        Ok(inbox)
    }

    /// 마지막 폴링 이후 등장한 새 파일명 개수
    pub fn poll_new(&mut self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) => {
                warn!("에러 인박스 조회 실패: {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut fresh = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            if self.seen.insert(name.clone()) {
                debug!("새 에러 파일 감지: {}", name.to_string_lossy());
                fresh += 1;
            }
        }
        fresh
    }

    /// 감시 디렉토리
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

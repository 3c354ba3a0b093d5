//! 시뮬레이션 이벤트 로그.
//!
//! 트리거 발화마다 작은 텍스트 파일 하나를 기록하는 append-only
//! 디렉토리. 필드: `Trigger`, `Action`, `Timestamp` (unix 초).

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use cusim_core::error::CoreError;
use cusim_core::models::action::ActionDescriptor;

/// 시뮬레이션 이벤트 로그
pub struct SimulationEventLog {
    /// 이벤트 파일 디렉토리
    dir: PathBuf,
    /// 같은 초 내 파일명 충돌 방지용 시퀀스
    seq: u64,
}

impl SimulationEventLog {
    /// 새 이벤트 로그 생성 (디렉토리를 만든다)
    pub fn new(dir: PathBuf) -> Result<Self, CoreError> {
        fs::create_dir_all(&dir).map_err(|e| {
            CoreError::Report(format!(
                "이벤트 로그 디렉토리 생성 실패: {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir, seq: 0 })
    }

    /// 트리거 발화 기록 — 이벤트 파일 경로 반환
    pub fn record(
        &mut self,
        trigger: &str,
        action: &ActionDescriptor,
    ) -> Result<PathBuf, CoreError> {
        let ts = Utc::now().timestamp();
        self.seq += 1;
        let path = self.dir.join(format!("event_{ts}_{:06}.txt", self.seq));

        let content = format!(
            "Trigger: {trigger}\nAction: {}\nTimestamp: {ts}\n",
            action.string_form()
        );
        fs::write(&path, content).map_err(|e| {
            CoreError::Report(format!("이벤트 파일 쓰기 실패: {}: {}", path.display(), e))
        })?;

        debug!("시뮬레이션 이벤트 기록: {}", path.display());
        Ok(path)
    }

    /// 이벤트 디렉토리
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn record_writes_all_three_fields() {
        let dir = TempDir::new().unwrap();
        let mut log = SimulationEventLog::new(dir.path().join("SimulationEvents")).unwrap();

        let path = log
            .record(
                "Select an option:",
                &ActionDescriptor::parse("type_1"),
            )
            .unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("Trigger: Select an option:"));
        assert!(content.contains("Action: type_1"));
        assert!(content.lines().any(|l| {
            l.strip_prefix("Timestamp: ")
                .map(|ts| ts.parse::<i64>().is_ok())
                .unwrap_or(false)
        }));
    }

    #[test]
    fn one_file_per_fired_trigger() {
        let dir = TempDir::new().unwrap();
        let mut log = SimulationEventLog::new(dir.path().to_path_buf()).unwrap();

        let a = log
            .record("Continue?", &ActionDescriptor::parse("press_enter"))
            .unwrap();
        let b = log
            .record("Continue?", &ActionDescriptor::parse("press_enter"))
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}

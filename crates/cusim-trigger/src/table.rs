//! 트리거 테이블.
//!
//! 디스크 표현은 문자열→문자열 JSON 객체. 삽입 순서가 매칭 우선순위를
//! 정의하므로 파싱은 순서를 보존한다 (serde_json `preserve_order`).
//! 액션 문자열은 로드 시 정확히 한 번 `ActionDescriptor`로 파싱된다.
//!
//! 리로드는 원자적 스왑이다: 파싱이 끝난 새 테이블로 한 번에 교체하며,
//! 파싱 실패 시 이전 테이블을 유지하고 경고만 남긴다.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use cusim_core::error::CoreError;
use cusim_core::models::action::ActionDescriptor;
use cusim_core::models::trigger::TriggerRule;

/// 트리거 테이블 — 순서 있는 규칙 목록 + 버전 카운터
pub struct TriggerTable {
    /// 테이블 파일 경로
    path: PathBuf,
    /// 현재 규칙 스냅샷 (원자적 스왑 대상)
    rules: Arc<[TriggerRule]>,
    /// 성공한 (재)로드마다 증가하는 버전
    version: u64,
}

impl TriggerTable {
    /// 파일에서 테이블 최초 로드.
    ///
    /// 시작 시점의 읽기/파싱 실패는 치명적이다 — 호출자(바이너리)가
    /// 종료 코드 1로 끝낸다.
    pub fn load(path: PathBuf) -> Result<Self, CoreError> {
        let rules = Self::parse_file(&path)?;
        info!(
            "트리거 테이블 로드: {} ({}개 규칙)",
            path.display(),
            rules.len()
        );
        Ok(Self {
            path,
            rules: rules.into(),
            version: 1,
        })
    }

    /// 파일에서 다시 로드한다.
    ///
    /// 성공 시 버전이 증가한다 — 내용이 동일해도 증가한다(문서화된
    /// 동작). 실패 시 이전 테이블을 유지하고 `false`를 반환한다.
    pub fn reload(&mut self) -> bool {
        match Self::parse_file(&self.path) {
            Ok(rules) => {
                debug!(
                    "트리거 테이블 리로드: {}개 규칙, 버전 {} → {}",
                    rules.len(),
                    self.version,
                    self.version + 1
                );
                self.rules = rules.into();
                self.version += 1;
                true
            }
            Err(e) => {
                warn!("트리거 테이블 리로드 실패, 이전 테이블 유지: {e}");
                false
            }
        }
    }

    /// 현재 규칙의 일관된 스냅샷.
    ///
    /// 하나의 분류 단계는 이 스냅샷 하나만 본다.
    pub fn snapshot(&self) -> Arc<[TriggerRule]> {
        Arc::clone(&self.rules)
    }

    /// 현재 버전
    pub fn version(&self) -> u64 {
        self.version
    }

    /// 규칙 수
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 테이블이 비었는가
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 파일 읽기 + 파싱
    fn parse_file(path: &Path) -> Result<Vec<TriggerRule>, CoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::TableParse(format!("테이블 파일 읽기 실패: {}: {}", path.display(), e))
        })?;
        Self::parse_rules(&content)
    }

    /// JSON 문자열 파싱 — 순서 보존, 값은 문자열이어야 한다
    pub fn parse_rules(json: &str) -> Result<Vec<TriggerRule>, CoreError> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| CoreError::TableParse(format!("JSON 객체가 아님: {e}")))?;

        let mut rules = Vec::with_capacity(map.len());
        for (trigger, value) in map {
            let raw = value.as_str().ok_or_else(|| {
                CoreError::TableParse(format!("트리거 '{trigger}'의 값이 문자열이 아님"))
            })?;
            if trigger.is_empty() {
                // 빈 트리거는 모든 텍스트에 매치되므로 테이블에서 제외
                warn!("빈 트리거 키 무시 (액션: {raw})");
                continue;
            }
            rules.push(TriggerRule::new(trigger, ActionDescriptor::parse(raw)));
        }
        Ok(rules)
    }
}

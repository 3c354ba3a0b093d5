//! CUSIM 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자체 실패를 `CoreError` 변형으로 분류해 반환한다.
//! 루프 본체 밖으로 빠져나가는 예외는 없다 — 각 컴포넌트가 잡아서
//! 타입화된 실패로 돌려주거나 결함 리포트로 변환한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 캡처/OCR/주입/포커스 등 시뮬레이터 공통 실패를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 스크린 캡처 실패 (해당 틱은 건너뛴다)
    #[error("캡처 에러: {0}")]
    Capture(String),

    /// OCR 백엔드 실패 (빈 텍스트로 강등)
    #[error("OCR 에러: {0}")]
    Ocr(String),

    /// 모든 주입 백엔드 실패
    #[error("입력 주입 에러: {0}")]
    Injection(String),

    /// 포커스 전환(Alt-Tab) 실패
    #[error("포커스 에러: {0}")]
    Focus(String),

    /// 트리거 테이블 파싱 실패 (이전 테이블 유지)
    #[error("트리거 테이블 파싱 에러: {0}")]
    TableParse(String),

    /// 결함 리포트 작성 실패
    #[error("리포트 에러: {0}")]
    Report(String),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = CoreError::Capture("모니터 없음".to_string());
        assert!(e.to_string().contains("캡처"));

        let e = CoreError::TableParse("잘못된 JSON".to_string());
        assert!(e.to_string().contains("트리거 테이블"));
    }

    #[test]
    fn io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "없음");
        let e: CoreError = io.into();
        assert!(matches!(e, CoreError::Io(_)));
    }

    #[test]
    fn serde_error_conversion() {
        let bad = serde_json::from_str::<serde_json::Value>("{");
        let e: CoreError = bad.unwrap_err().into();
        assert!(matches!(e, CoreError::Serialization(_)));
    }
}

//! 평가기 설정 스키마 메타데이터
//!
//! 외부 정책 편집 UI가 평가기 속성 입력 폼을 만들 때 사용합니다.
//! 엔진은 이 메타데이터를 평가에 사용하지 않습니다.

use serde::{Deserialize, Serialize};

/// 속성 값 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistentType {
    Text,
    ShortText,
    Boolean,
    Uuid,
    Int,
    Long,
}

/// 속성 입력 폼 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAttribute {
    /// 속성 키
    pub code: String,

    /// 값 타입
    pub persistent_type: PersistentType,

    /// 필수 여부
    #[serde(default)]
    pub required: bool,

    /// UI 렌더링 힌트 (예: 엔티티 선택기)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_type: Option<String>,

    /// 기본값
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl FormAttribute {
    pub fn new(code: impl Into<String>, persistent_type: PersistentType) -> Self {
        Self {
            code: code.into(),
            persistent_type,
            required: false,
            face_type: None,
            default_value: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_face_type(mut self, face_type: impl Into<String>) -> Self {
        self.face_type = Some(face_type.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

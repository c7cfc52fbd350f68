//! 공통 에러 타입
//!
//! 인가 엔진 전체에서 사용되는 에러 타입을 정의합니다.
//!
//! 접근 거부는 에러가 아닙니다. 권한이 없으면 빈 권한 집합 또는
//! 모든 행을 거부하는 필터가 반환됩니다.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// 인가 엔진 공통 에러
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("duplicate evaluator name: {name}")]
    DuplicateEvaluator { name: String },

    #[error("policy '{policy}' references unknown evaluator '{name}'")]
    UnknownEvaluator { name: String, policy: String },

    #[error("evaluator '{evaluator}' does not support type '{entity_type}'")]
    UnsupportedType {
        evaluator: String,
        entity_type: String,
    },

    #[error("evaluator '{evaluator}' does not accept property '{property}'")]
    UnknownProperty { evaluator: String, property: String },

    #[error("delegation depth {depth} exceeded while evaluating '{entity_type}'")]
    DelegationDepthExceeded { entity_type: String, depth: usize },

    #[error("invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Schema Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("schema parse error: {message}")]
    SchemaParse { message: String },

    #[error("duplicate securable type: {name}")]
    DuplicateType { name: String },

    #[error("invalid owner reference: type '{entity_type}' is owned by non-existent type '{owner_type}'")]
    InvalidReference {
        entity_type: String,
        owner_type: String,
    },

    #[error("cyclic owner chain: {}", chain.join(" -> "))]
    CyclicOwnership { chain: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────────
    // Policy Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("policy parse error: {message}")]
    PolicyParse { message: String },

    #[error("duplicate policy id: {id}")]
    DuplicatePolicy { id: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // IO/Serialization Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// 설정 오류 여부
    ///
    /// 설정 오류는 부팅 시점 또는 첫 사용 시점에 드러나며 복구되지 않습니다.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Error::Yaml(_) | Error::Json(_))
    }

    /// 에러 코드 (로그/호출자용)
    pub fn code(&self) -> &'static str {
        match self {
            Error::DuplicateEvaluator { .. } => "DUPLICATE_EVALUATOR",
            Error::UnknownEvaluator { .. } => "UNKNOWN_EVALUATOR",
            Error::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
            Error::UnknownProperty { .. } => "UNKNOWN_PROPERTY",
            Error::DelegationDepthExceeded { .. } => "DELEGATION_DEPTH_EXCEEDED",
            Error::ConfigInvalid { .. } => "CONFIG_INVALID",
            Error::SchemaParse { .. } => "SCHEMA_PARSE_ERROR",
            Error::DuplicateType { .. } => "DUPLICATE_TYPE",
            Error::DuplicatePolicy { .. } => "DUPLICATE_POLICY",
            Error::InvalidReference { .. } => "INVALID_REFERENCE",
            Error::CyclicOwnership { .. } => "CYCLIC_OWNERSHIP",
            Error::PolicyParse { .. } => "POLICY_PARSE_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }
    }
}

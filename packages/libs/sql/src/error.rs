//! SQL 렌더링 에러

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SqlError>;

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("unknown securable type: {entity_type}")]
    UnknownType { entity_type: String },
}

impl SqlError {
    /// 에러 코드 반환
    pub fn code(&self) -> &'static str {
        match self {
            SqlError::UnknownType { .. } => "UNKNOWN_TYPE",
        }
    }
}

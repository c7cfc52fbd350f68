//! 보호 대상 엔티티
//!
//! 이미 로드된 행(Row)을 타입 이름, 식별자, 필드 맵으로 표현합니다.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 식별자 필드 이름
pub const ID_FIELD: &str = "id";

/// 보호 대상 엔티티 인스턴스
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// 보호 대상 타입 이름
    pub entity_type: String,

    /// 식별자
    pub id: String,

    /// 필드 값
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    /// 필드 설정
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// 필드 조회
    ///
    /// `id`는 항상 식별자를 반환합니다.
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == ID_FIELD {
            return Some(Value::String(self.id.clone()));
        }
        self.fields.get(name).cloned()
    }

    /// 문자열 필드 조회 (참조 컬럼용)
    pub fn field_str(&self, name: &str) -> Option<String> {
        match self.field(name)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup() {
        let entity = Entity::new("identity", "u1")
            .with_field("owner_id", "u2")
            .with_field("rank", 3);

        assert_eq!(entity.field("id"), Some(Value::String("u1".to_string())));
        assert_eq!(entity.field_str("owner_id").as_deref(), Some("u2"));
        assert_eq!(entity.field_str("rank").as_deref(), Some("3"));
        assert!(entity.field("missing").is_none());
    }
}

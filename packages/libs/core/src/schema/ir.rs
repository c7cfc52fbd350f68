//! 보호 대상 타입 스키마 IR
//!
//! 각 보호 대상 타입의 테이블, 식별자 컬럼, owner 참조를 담습니다.
//! 위임 평가기와 SQL 렌더러가 이 IR을 사용합니다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 보호 대상 타입 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurableType {
    /// 타입 이름
    pub name: String,

    /// 테이블 이름
    pub table: String,

    /// 식별자 컬럼 이름
    pub id: String,

    /// owner 참조 (없으면 직접 보호되는 타입)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerReference>,
}

impl SecurableType {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            id: "id".to_string(),
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner_type: impl Into<String>, column: impl Into<String>) -> Self {
        self.owner = Some(OwnerReference::new(owner_type, column));
        self
    }
}

/// owner 참조
///
/// 현재 행의 `column` 값이 owner 타입 행의 식별자를 가리킵니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerReference {
    /// owner 타입 이름
    #[serde(rename = "type")]
    pub entity_type: String,

    /// 현재 타입의 참조 컬럼
    pub column: String,
}

impl OwnerReference {
    pub fn new(entity_type: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            column: column.into(),
        }
    }
}

/// 보호 대상 타입 스키마
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitySchema {
    /// 타입 맵 (타입 이름 -> 정의)
    pub types: BTreeMap<String, SecurableType>,
}

impl EntitySchema {
    /// 빈 스키마 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 타입 추가
    pub fn add_type(&mut self, securable: SecurableType) {
        self.types.insert(securable.name.clone(), securable);
    }

    /// 타입 조회
    pub fn get(&self, name: &str) -> Option<&SecurableType> {
        self.types.get(name)
    }

    /// 타입 존재 여부
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// owner 참조 조회
    pub fn owner_reference(&self, name: &str) -> Option<&OwnerReference> {
        self.types.get(name).and_then(|t| t.owner.as_ref())
    }

    /// owner 체인 (자기 자신 제외, 가까운 owner부터)
    ///
    /// 순환이 있으면 순환이 시작되는 지점에서 멈춥니다.
    pub fn owner_chain(&self, name: &str) -> Vec<&str> {
        let mut chain: Vec<&str> = Vec::new();
        let mut current = name;
        while let Some(owner) = self.owner_reference(current) {
            let next = owner.entity_type.as_str();
            if next == name || chain.contains(&next) {
                break;
            }
            chain.push(next);
            current = next;
        }
        chain
    }

    /// owner 참조 검증
    ///
    /// 모든 owner 참조가 존재하는 타입을 가리키는지 확인합니다.
    pub fn validate_references(&self) -> Vec<ReferenceError> {
        let mut errors = Vec::new();

        for securable in self.types.values() {
            if let Some(owner) = &securable.owner {
                if !self.types.contains_key(&owner.entity_type) {
                    errors.push(ReferenceError::TypeNotFound {
                        entity_type: securable.name.clone(),
                        owner_type: owner.entity_type.clone(),
                    });
                }
            }
        }

        errors
    }

    /// owner 순환 탐지
    ///
    /// 순환이 있으면 순환 경로(시작 타입이 끝에 반복됨)를 반환합니다.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        for start in self.types.keys() {
            let mut path = vec![start.clone()];
            let mut current = start.as_str();
            while let Some(owner) = self.owner_reference(current) {
                let next = owner.entity_type.as_str();
                if let Some(pos) = path.iter().position(|p| p == next) {
                    let mut cycle = path[pos..].to_vec();
                    cycle.push(next.to_string());
                    return Some(cycle);
                }
                path.push(next.to_string());
                current = next;
            }
        }
        None
    }
}

/// 참조 검증 에러
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    TypeNotFound {
        entity_type: String,
        owner_type: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> EntitySchema {
        let mut schema = EntitySchema::new();
        schema.add_type(SecurableType::new("code_list", "idm_code_list"));
        schema.add_type(
            SecurableType::new("code_list_item", "idm_code_list_item")
                .with_owner("code_list", "code_list_id"),
        );
        schema.add_type(
            SecurableType::new("item_note", "idm_item_note").with_owner("code_list_item", "item_id"),
        );
        schema
    }

    #[test]
    fn test_owner_chain() {
        let schema = sample_schema();
        assert_eq!(schema.owner_chain("item_note"), vec!["code_list_item", "code_list"]);
        assert!(schema.owner_chain("code_list").is_empty());
        assert_eq!(
            schema.owner_reference("code_list_item").map(|o| o.column.as_str()),
            Some("code_list_id")
        );
    }

    #[test]
    fn test_find_cycle() {
        let mut schema = sample_schema();
        assert!(schema.find_cycle().is_none());

        schema.add_type(SecurableType::new("code_list", "idm_code_list").with_owner("item_note", "note_id"));
        let cycle = schema.find_cycle().unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
    }

    #[test]
    fn test_validate_references() {
        let mut schema = sample_schema();
        assert!(schema.validate_references().is_empty());

        schema.add_type(SecurableType::new("orphan", "idm_orphan").with_owner("missing", "missing_id"));
        assert_eq!(
            schema.validate_references(),
            vec![ReferenceError::TypeNotFound {
                entity_type: "orphan".to_string(),
                owner_type: "missing".to_string(),
            }]
        );
    }
}

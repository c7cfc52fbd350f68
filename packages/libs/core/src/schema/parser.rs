//! 스키마 YAML 파서
//!
//! `schema/*.yaml` 파일을 파싱하여 보호 대상 타입 스키마로 변환합니다.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::ir::{EntitySchema, OwnerReference, ReferenceError, SecurableType};
use crate::error::{Error, Result};

/// 스키마 파서
pub struct SchemaParser;

impl SchemaParser {
    /// 단일 YAML 문자열 파싱 + 검증
    pub fn parse_yaml(yaml: &str) -> Result<EntitySchema> {
        let types = Self::parse_types(yaml)?;
        Self::build_schema(types)
    }

    /// 여러 YAML 파일을 파싱하여 하나의 스키마 생성
    pub fn parse_multiple(yamls: &[&str]) -> Result<EntitySchema> {
        let mut all_types = Vec::new();

        for yaml in yamls {
            all_types.extend(Self::parse_types(yaml)?);
        }

        Self::build_schema(all_types)
    }

    /// 타입 목록을 스키마로 변환 (중복/참조/순환 검증)
    pub fn build_schema(types: Vec<SecurableType>) -> Result<EntitySchema> {
        let mut schema = EntitySchema::new();

        for securable in types {
            // 타입 이름 중복 검사 (전역)
            if schema.has_type(&securable.name) {
                return Err(Error::DuplicateType {
                    name: securable.name.clone(),
                });
            }
            schema.add_type(securable);
        }

        // 참조 검증
        if let Some(error) = schema.validate_references().into_iter().next() {
            match error {
                ReferenceError::TypeNotFound {
                    entity_type,
                    owner_type,
                } => {
                    return Err(Error::InvalidReference {
                        entity_type,
                        owner_type,
                    });
                }
            }
        }

        // 순환 검증
        if let Some(chain) = schema.find_cycle() {
            return Err(Error::CyclicOwnership { chain });
        }

        Ok(schema)
    }

    fn parse_types(yaml: &str) -> Result<Vec<SecurableType>> {
        let raw: RawSchema = serde_yaml::from_str(yaml).map_err(|e| Error::SchemaParse {
            message: e.to_string(),
        })?;

        Ok(raw
            .types
            .into_iter()
            .map(|(name, raw_type)| Self::convert_raw_type(name, raw_type))
            .collect())
    }

    /// Raw 타입 변환
    fn convert_raw_type(name: String, raw: RawType) -> SecurableType {
        SecurableType {
            table: raw.table.unwrap_or_else(|| name.clone()),
            id: raw.id.unwrap_or_else(|| "id".to_string()),
            owner: raw.owner,
            name,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw YAML 구조
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawSchema {
    #[serde(default)]
    types: BTreeMap<String, RawType>,
}

#[derive(Debug, Deserialize)]
struct RawType {
    table: Option<String>,
    id: Option<String>,
    owner: Option<OwnerReference>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema() {
        let yaml = r#"
types:
  code_list:
    table: idm_code_list
  code_list_item:
    table: idm_code_list_item
    owner:
      type: code_list
      column: code_list_id
  identity: {}
"#;

        let schema = SchemaParser::parse_yaml(yaml).unwrap();
        assert_eq!(schema.get("code_list").unwrap().table, "idm_code_list");
        assert_eq!(schema.get("identity").unwrap().table, "identity");
        assert_eq!(schema.get("identity").unwrap().id, "id");
        assert_eq!(
            schema.owner_reference("code_list_item"),
            Some(&OwnerReference::new("code_list", "code_list_id"))
        );
    }

    #[test]
    fn test_unknown_owner_rejected() {
        let yaml = r#"
types:
  code_list_item:
    owner: { type: code_list, column: code_list_id }
"#;
        let result = SchemaParser::parse_yaml(yaml);
        assert!(matches!(result, Err(Error::InvalidReference { .. })));
    }

    #[test]
    fn test_cycle_rejected() {
        let yaml = r#"
types:
  a:
    owner: { type: b, column: b_id }
  b:
    owner: { type: a, column: a_id }
"#;
        let result = SchemaParser::parse_yaml(yaml);
        assert!(matches!(result, Err(Error::CyclicOwnership { .. })));
    }

    #[test]
    fn test_duplicate_across_files_rejected() {
        let first = "types:\n  identity: {}\n";
        let second = "types:\n  identity: { table: idm_identity }\n";
        let result = SchemaParser::parse_multiple(&[first, second]);
        assert!(matches!(result, Err(Error::DuplicateType { .. })));
    }
}

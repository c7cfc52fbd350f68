//! 인가 정책 정의
//!
//! role, 보호 대상 타입, 평가기, 속성, 부여 권한을 묶는 정책 레코드와
//! `config/policies.yaml`의 구조를 정의합니다.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::permission::{deserialize_permission_set, Permission, PermissionSet};
use crate::error::{Error, Result};

/// Role 식별자
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        RoleId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 인가 정책
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// 정책 ID
    pub id: String,

    /// 정책이 부여된 role
    pub role: RoleId,

    /// 보호 대상 타입 이름
    pub authorizable_type: String,

    /// 평가기 이름
    pub evaluator: String,

    /// 평가기별 속성
    #[serde(default)]
    pub properties: Map<String, Value>,

    /// 평가기 조건이 맞을 때 부여되는 권한
    #[serde(default, deserialize_with = "deserialize_permission_set")]
    pub permissions: PermissionSet,

    /// 평가 순서
    #[serde(default)]
    pub order: i32,

    /// 비활성화 여부
    #[serde(default)]
    pub disabled: bool,
}

impl Policy {
    /// 새 정책 생성
    pub fn new(
        role: impl Into<String>,
        authorizable_type: impl Into<String>,
        evaluator: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: RoleId::new(role),
            authorizable_type: authorizable_type.into(),
            evaluator: evaluator.into(),
            properties: Map::new(),
            permissions: PermissionSet::new(),
            order: 0,
            disabled: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_permissions<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        self.permissions = permissions.into_iter().collect();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// 요청된 권한을 이 정책이 모두 부여하는지 (`requested ⊆ permissions`)
    pub fn grants_all(&self, requested: &[Permission]) -> bool {
        requested.iter().all(|p| self.permissions.contains(p))
    }
}

/// 정책 문서
///
/// `config/policies.yaml` 파일의 루트 구조입니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Role별 정책 목록
    #[serde(default)]
    pub roles: BTreeMap<String, RolePolicies>,
}

/// 문서 안의 단일 정책 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEntry {
    /// 정책 ID (없으면 UUID 생성)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// 보호 대상 타입
    #[serde(rename = "type")]
    pub authorizable_type: String,

    /// 평가기 이름
    pub evaluator: String,

    #[serde(default)]
    pub properties: Map<String, Value>,

    #[serde(default, deserialize_with = "deserialize_permission_set")]
    pub permissions: PermissionSet,

    #[serde(default)]
    pub order: i32,

    #[serde(default)]
    pub disabled: bool,
}

/// Role별 정책 목록 (ordered array)
#[derive(Debug, Clone, Serialize)]
pub struct RolePolicies {
    pub policies: Vec<PolicyEntry>,
}

/// RolePolicies의 custom deserializer (shorthand 호환)
impl<'de> Deserialize<'de> for RolePolicies {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct RolePoliciesVisitor;

        impl<'de> Visitor<'de> for RolePoliciesVisitor {
            type Value = RolePolicies;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of policies or a single policy object")
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut policies = Vec::new();
                while let Some(policy) = seq.next_element::<PolicyEntry>()? {
                    policies.push(policy);
                }
                Ok(RolePolicies { policies })
            }

            fn visit_map<M>(self, map: M) -> std::result::Result<Self::Value, M::Error>
            where
                M: de::MapAccess<'de>,
            {
                // Shorthand: 단일 object → Vec<PolicyEntry>
                let policy = PolicyEntry::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(RolePolicies {
                    policies: vec![policy],
                })
            }
        }

        deserializer.deserialize_any(RolePoliciesVisitor)
    }
}

impl PolicyDocument {
    /// YAML 문자열 파싱
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::PolicyParse {
            message: e.to_string(),
        })
    }

    /// 정책 레코드 목록으로 변환
    ///
    /// 문서 안에서 정책 id는 role에 관계없이 유일해야 합니다.
    pub fn into_policies(self) -> Result<Vec<Policy>> {
        let mut seen = HashSet::new();
        let mut policies = Vec::new();
        for (role, entries) in self.roles {
            for entry in entries.policies {
                let id = entry
                    .id
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                if !seen.insert(id.clone()) {
                    return Err(Error::DuplicatePolicy { id });
                }
                policies.push(Policy {
                    id,
                    role: RoleId::new(role.clone()),
                    authorizable_type: entry.authorizable_type,
                    evaluator: entry.evaluator,
                    properties: entry.properties,
                    permissions: entry.permissions,
                    order: entry.order,
                    disabled: entry.disabled,
                });
            }
        }
        Ok(policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy_document() {
        let yaml = r#"
roles:
  helpdesk:
    - type: identity
      evaluator: basic
      permissions: [READ, AUTOCOMPLETE]
    - id: p-self
      type: identity
      evaluator: self
      permissions: "UPDATE"
      order: 5
  auditor:
    type: code_list
    evaluator: basic
    permissions: [READ]
    disabled: true
"#;

        let doc = PolicyDocument::from_yaml(yaml).unwrap();
        assert_eq!(doc.roles["helpdesk"].policies.len(), 2);
        // Shorthand converts to single policy
        assert_eq!(doc.roles["auditor"].policies.len(), 1);

        let policies = doc.into_policies().unwrap();
        assert_eq!(policies.len(), 3);

        let own = policies.iter().find(|p| p.id == "p-self").unwrap();
        assert_eq!(own.role, RoleId::new("helpdesk"));
        assert_eq!(own.order, 5);
        assert!(own.permissions.contains(&Permission::UPDATE));

        let disabled = policies.iter().find(|p| p.role.as_str() == "auditor").unwrap();
        assert!(disabled.disabled);
        assert!(!disabled.id.is_empty());
    }

    #[test]
    fn test_grants_all_requires_same_policy() {
        let policy = Policy::new("r", "identity", "basic")
            .with_permissions([Permission::READ, Permission::UPDATE]);

        assert!(policy.grants_all(&[Permission::READ]));
        assert!(policy.grants_all(&[Permission::READ, Permission::UPDATE]));
        assert!(!policy.grants_all(&[Permission::READ, Permission::DELETE]));
        assert!(policy.grants_all(&[]));
    }

    #[test]
    fn test_duplicate_policy_id_across_roles() {
        let yaml = r#"
roles:
  a:
    id: p
    type: identity
    evaluator: self
    permissions: [READ]
  b:
    id: p
    type: identity
    evaluator: basic
    permissions: [UPDATE]
"#;

        let doc = PolicyDocument::from_yaml(yaml).unwrap();
        assert!(matches!(
            doc.into_policies(),
            Err(Error::DuplicatePolicy { id }) if id == "p"
        ));
    }

    #[test]
    fn test_invalid_document_is_policy_error() {
        let result = PolicyDocument::from_yaml("roles: [1, 2]");
        assert!(matches!(result, Err(Error::PolicyParse { .. })));
    }
}

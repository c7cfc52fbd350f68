//! 외부 협력자 인터페이스
//!
//! 엔진이 의존하는 주체/role 조회, 정책 저장소, 엔티티 조회, 폼 정의 조회를
//! 좁은 trait으로 정의합니다. 테스트와 임베딩용 in-memory 구현도 함께 제공합니다.

use std::collections::{BTreeMap, HashMap};

use super::entity::Entity;
use super::policy::{Policy, PolicyDocument, RoleId};
use crate::error::Result;
use crate::schema::OwnerReference;

/// 주체/role 조회
pub trait PrincipalResolver: Send + Sync {
    /// 현재 인증된 주체 ID (익명이면 None)
    fn current_principal_id(&self) -> Option<String>;

    /// 주체가 가진 role 목록
    fn roles_of(&self, principal_id: &str) -> Vec<RoleId>;
}

/// 정책 저장소 (읽기 전용)
pub trait PolicyStore: Send + Sync {
    /// role과 타입에 연결된 정책 목록
    fn policies_for(&self, role: &RoleId, entity_type: &str) -> Vec<Policy>;
}

/// 엔티티 조회
pub trait EntityAccessor: Send + Sync {
    /// 타입과 식별자로 엔티티 조회
    fn fetch(&self, entity_type: &str, id: &str) -> Option<Entity>;

    /// owner 엔티티 조회
    ///
    /// 참조 값이 없거나 owner 행이 없으면 None입니다.
    fn owner_of(&self, entity: &Entity, owner: &OwnerReference) -> Option<Entity> {
        let owner_id = entity.field_str(&owner.column)?;
        self.fetch(&owner.entity_type, &owner_id)
    }
}

/// 폼 정의 조회
pub trait FormDefinitions: Send + Sync {
    /// owner 타입의 폼 정의를 ID 또는 코드로 조회하여 정의 ID 반환
    fn resolve(&self, owner_type: &str, key: &str) -> Option<String>;

    /// owner 타입의 main 폼 정의 ID
    fn main_definition(&self, owner_type: &str) -> Option<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory 구현
// ─────────────────────────────────────────────────────────────────────────────

/// 고정된 주체
#[derive(Debug, Clone, Default)]
pub struct StaticPrincipal {
    principal_id: Option<String>,
    roles: HashMap<String, Vec<RoleId>>,
}

impl StaticPrincipal {
    /// 인증된 주체
    pub fn new(principal_id: impl Into<String>, roles: Vec<RoleId>) -> Self {
        let principal_id = principal_id.into();
        let mut all_roles = HashMap::new();
        all_roles.insert(principal_id.clone(), roles);
        Self {
            principal_id: Some(principal_id),
            roles: all_roles,
        }
    }

    /// 익명 주체
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 다른 주체의 role 등록 (authorities 조회용)
    pub fn with_roles_of(mut self, principal_id: impl Into<String>, roles: Vec<RoleId>) -> Self {
        self.roles.insert(principal_id.into(), roles);
        self
    }
}

impl PrincipalResolver for StaticPrincipal {
    fn current_principal_id(&self) -> Option<String> {
        self.principal_id.clone()
    }

    fn roles_of(&self, principal_id: &str) -> Vec<RoleId> {
        self.roles.get(principal_id).cloned().unwrap_or_default()
    }
}

/// In-memory 정책 저장소
#[derive(Debug, Clone, Default)]
pub struct InMemoryPolicyStore {
    policies: Vec<Policy>,
}

impl InMemoryPolicyStore {
    pub fn new(policies: Vec<Policy>) -> Self {
        Self { policies }
    }

    /// 정책 문서(YAML)에서 생성
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self::new(PolicyDocument::from_yaml(yaml)?.into_policies()?))
    }

    pub fn add(&mut self, policy: Policy) {
        self.policies.push(policy);
    }

    /// 전체 정책 (부팅 시 검증용)
    pub fn all(&self) -> &[Policy] {
        &self.policies
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn policies_for(&self, role: &RoleId, entity_type: &str) -> Vec<Policy> {
        self.policies
            .iter()
            .filter(|p| &p.role == role && p.authorizable_type == entity_type)
            .cloned()
            .collect()
    }
}

/// In-memory 엔티티 저장소
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntities {
    entities: HashMap<(String, String), Entity>,
}

impl InMemoryEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity) {
        self.entities
            .insert((entity.entity_type.clone(), entity.id.clone()), entity);
    }

    pub fn with(mut self, entity: Entity) -> Self {
        self.insert(entity);
        self
    }

    /// 타입별 엔티티 (id 순)
    pub fn of_type(&self, entity_type: &str) -> Vec<&Entity> {
        let mut list: Vec<&Entity> = self
            .entities
            .values()
            .filter(|e| e.entity_type == entity_type)
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }
}

impl EntityAccessor for InMemoryEntities {
    fn fetch(&self, entity_type: &str, id: &str) -> Option<Entity> {
        self.entities
            .get(&(entity_type.to_string(), id.to_string()))
            .cloned()
    }
}

/// In-memory 폼 정의 저장소
#[derive(Debug, Clone, Default)]
pub struct InMemoryFormDefinitions {
    /// owner 타입 -> (정의 ID -> 정의 코드)
    definitions: HashMap<String, BTreeMap<String, String>>,
    /// owner 타입 -> main 정의 ID
    main: HashMap<String, String>,
}

impl InMemoryFormDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 정의 등록
    pub fn with_definition(
        mut self,
        owner_type: impl Into<String>,
        id: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        self.definitions
            .entry(owner_type.into())
            .or_default()
            .insert(id.into(), code.into());
        self
    }

    /// main 정의 지정
    pub fn with_main(mut self, owner_type: impl Into<String>, id: impl Into<String>) -> Self {
        self.main.insert(owner_type.into(), id.into());
        self
    }
}

impl FormDefinitions for InMemoryFormDefinitions {
    fn resolve(&self, owner_type: &str, key: &str) -> Option<String> {
        let definitions = self.definitions.get(owner_type)?;
        if definitions.contains_key(key) {
            return Some(key.to_string());
        }
        definitions
            .iter()
            .find(|(_, code)| code.as_str() == key)
            .map(|(id, _)| id.clone())
    }

    fn main_definition(&self, owner_type: &str) -> Option<String> {
        let id = self.main.get(owner_type)?;
        // 등록되지 않은 main 정의는 해석되지 않은 것으로 취급
        self.resolve(owner_type, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_store_filters_by_role_and_type() {
        let store = InMemoryPolicyStore::new(vec![
            Policy::new("r1", "identity", "basic"),
            Policy::new("r1", "role", "basic"),
            Policy::new("r2", "identity", "basic"),
        ]);

        assert_eq!(store.policies_for(&RoleId::new("r1"), "identity").len(), 1);
        assert_eq!(store.policies_for(&RoleId::new("r3"), "identity").len(), 0);
    }

    #[test]
    fn test_owner_of() {
        let entities = InMemoryEntities::new()
            .with(Entity::new("code_list", "c1"))
            .with(Entity::new("code_list_item", "i1").with_field("code_list_id", "c1"))
            .with(Entity::new("code_list_item", "i2").with_field("code_list_id", "gone"));
        let reference = OwnerReference::new("code_list", "code_list_id");

        let item = entities.fetch("code_list_item", "i1").unwrap();
        assert_eq!(entities.owner_of(&item, &reference).unwrap().id, "c1");

        let dangling = entities.fetch("code_list_item", "i2").unwrap();
        assert!(entities.owner_of(&dangling, &reference).is_none());
    }

    #[test]
    fn test_form_definitions_resolve_by_id_or_code() {
        let definitions = InMemoryFormDefinitions::new()
            .with_definition("identity", "d1", "default")
            .with_definition("identity", "d2", "extra")
            .with_main("identity", "d1")
            .with_main("role", "d9");

        assert_eq!(definitions.resolve("identity", "d2").as_deref(), Some("d2"));
        assert_eq!(definitions.resolve("identity", "extra").as_deref(), Some("d2"));
        assert!(definitions.resolve("identity", "missing").is_none());
        assert_eq!(definitions.main_definition("identity").as_deref(), Some("d1"));
        assert!(definitions.main_definition("role").is_none());
    }

    #[test]
    fn test_static_principal() {
        let principal = StaticPrincipal::new("u1", vec![RoleId::new("helpdesk")])
            .with_roles_of("u2", vec![RoleId::new("auditor")]);

        assert_eq!(principal.current_principal_id().as_deref(), Some("u1"));
        assert_eq!(principal.roles_of("u2"), vec![RoleId::new("auditor")]);
        assert!(StaticPrincipal::anonymous().current_principal_id().is_none());
    }
}

//! 인가 관리자
//!
//! 주체의 role에 연결된 정책을 모아 평가기를 선택하고 결과를 합칩니다.
//!
//! - 행 필터 모드: 정책별 필터를 OR로 결합 (정책이 없으면 모두 거부)
//! - 인스턴스 모드: 정책별 권한 집합의 합집합
//!
//! 두 모드는 같은 정책 선택 로직을 공유합니다. 엔티티 `e`가
//! `get_predicate(T, [p])`를 만족하는 것과 `p ∈ get_permissions(e)`는 동치입니다.
//! 거부 우선(deny-override) 규칙은 없습니다.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::context::{AuthContext, EvalContext};
use super::entity::Entity;
use super::evaluator::{Evaluator, PredicateRequest};
use super::filter::RowFilter;
use super::permission::{Permission, PermissionSet};
use super::policy::{Policy, RoleId};
use super::provider::{EntityAccessor, PolicyStore, PrincipalResolver};
use super::registry::{unknown_property, EvaluatorRegistry};
use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// 권한 조회 대상
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// 주체 (role + 기본 role)
    Principal(String),
    /// 단일 role
    Role(RoleId),
}

/// 인가 관리자
pub struct AuthorizationManager {
    registry: Arc<EvaluatorRegistry>,
    policies: Arc<dyn PolicyStore>,
    principals: Arc<dyn PrincipalResolver>,
    entities: Arc<dyn EntityAccessor>,
    config: EngineConfig,
}

impl AuthorizationManager {
    /// 새 관리자 생성
    ///
    /// 레지스트리는 이미 완성(`build()`)된 상태여야 합니다.
    pub fn new(
        registry: Arc<EvaluatorRegistry>,
        policies: Arc<dyn PolicyStore>,
        principals: Arc<dyn PrincipalResolver>,
        entities: Arc<dyn EntityAccessor>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            policies,
            principals,
            entities,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    pub fn entities(&self) -> &dyn EntityAccessor {
        self.entities.as_ref()
    }

    /// 현재 주체의 인증 컨텍스트
    pub fn auth_context(&self) -> AuthContext {
        match self.principals.current_principal_id() {
            Some(principal_id) => self.auth_for(&principal_id),
            None => AuthContext::anonymous(),
        }
    }

    /// 특정 주체의 인증 컨텍스트 (기본 role 포함)
    fn auth_for(&self, principal_id: &str) -> AuthContext {
        let mut roles = self.principals.roles_of(principal_id);
        if let Some(default_role) = &self.config.default_role {
            roles.push(RoleId::new(default_role.clone()));
        }
        AuthContext::new(principal_id, roles)
    }

    /// 행 필터 (요청 권한 AND)
    pub fn get_predicate(&self, entity_type: &str, permissions: &[Permission]) -> Result<RowFilter> {
        let auth = self.auth_context();
        let ctx = EvalContext::new(self, &auth);
        self.predicate_in(&ctx, entity_type, permissions)
    }

    /// 엔티티에 대한 권한 집합
    pub fn get_permissions(&self, entity: &Entity) -> Result<PermissionSet> {
        let auth = self.auth_context();
        let ctx = EvalContext::new(self, &auth);
        self.permissions_in(&ctx, entity)
    }

    /// 엔티티에 대한 단일 권한 확인
    pub fn evaluate(&self, entity: &Entity, permission: &Permission) -> Result<bool> {
        Ok(self.get_permissions(entity)?.contains(permission))
    }

    /// 인스턴스 없이 부여되는 권한 (로그인 시 권한 목록용)
    pub fn get_authorities(&self, subject: &Subject, entity_type: &str) -> Result<BTreeSet<String>> {
        let auth = match subject {
            Subject::Principal(principal_id) => self.auth_for(principal_id),
            Subject::Role(role) => AuthContext {
                sub: None,
                roles: vec![role.clone()],
            },
        };
        let ctx = EvalContext::new(self, &auth);

        let mut authorities = BTreeSet::new();
        for (policy, evaluator) in self.active_policies(&auth.roles, entity_type)? {
            for permission in evaluator.get_authorities(&policy, &ctx)? {
                authorities.insert(permission.as_str().to_string());
            }
        }
        Ok(authorities)
    }

    /// 주어진 컨텍스트에서 행 필터 계산
    pub fn predicate_in(
        &self,
        ctx: &EvalContext<'_>,
        entity_type: &str,
        permissions: &[Permission],
    ) -> Result<RowFilter> {
        let request = PredicateRequest {
            entity_type,
            permissions,
        };

        let mut filters = Vec::new();
        for (policy, evaluator) in self.active_policies(&ctx.auth().roles, entity_type)? {
            // 위임 전용 평가기는 정책 권한 대신 owner 권한을 따름
            if evaluator.supports_permissions() && !policy.grants_all(permissions) {
                continue;
            }
            let filter = evaluator.get_predicate(&policy, &request, ctx)?;
            tracing::debug!(
                "policy {} ({}) on {} -> {:?}",
                policy.id,
                policy.evaluator,
                entity_type,
                filter
            );
            filters.push(filter);
        }

        Ok(RowFilter::any(filters))
    }

    /// 주어진 컨텍스트에서 권한 집합 계산
    pub fn permissions_in(&self, ctx: &EvalContext<'_>, entity: &Entity) -> Result<PermissionSet> {
        let mut granted = PermissionSet::new();
        for (policy, evaluator) in self.active_policies(&ctx.auth().roles, &entity.entity_type)? {
            let permissions = evaluator.get_permissions(&policy, entity, ctx)?;
            granted.extend(permissions);
        }

        tracing::debug!(
            "permissions on {} {} at depth {}: {:?}",
            entity.entity_type,
            entity.id,
            ctx.depth(),
            granted
        );
        Ok(granted)
    }

    /// 평가 대상 정책 선택
    ///
    /// 활성 정책 + 등록된 평가기 + 평가기 활성 + 타입 지원.
    /// 알 수 없는 평가기만 설정 오류로 실패합니다. 타입을 지원하지 않거나
    /// 알 수 없는 속성을 가진 정책은 해당 정책만 제외됩니다.
    fn active_policies(
        &self,
        roles: &[RoleId],
        entity_type: &str,
    ) -> Result<Vec<(Policy, Arc<dyn Evaluator>)>> {
        let mut seen_roles: BTreeSet<&RoleId> = BTreeSet::new();
        let mut seen_policies: BTreeSet<(RoleId, String)> = BTreeSet::new();
        let mut selected = Vec::new();

        for role in roles {
            if !seen_roles.insert(role) {
                continue;
            }
            for policy in self.policies.policies_for(role, entity_type) {
                if policy.disabled || policy.authorizable_type != entity_type {
                    continue;
                }
                if !seen_policies.insert((policy.role.clone(), policy.id.clone())) {
                    continue;
                }
                let evaluator = self
                    .registry
                    .get(&policy.evaluator)
                    .ok_or_else(|| Error::UnknownEvaluator {
                        name: policy.evaluator.clone(),
                        policy: policy.id.clone(),
                    })?
                    .clone();
                if self.registry.is_disabled(&policy.evaluator) {
                    continue;
                }
                if !evaluator.supports(entity_type) {
                    tracing::warn!(
                        "policy {} skipped: evaluator {} does not support {}",
                        policy.id,
                        policy.evaluator,
                        entity_type
                    );
                    continue;
                }
                if let Some(property) = unknown_property(evaluator.as_ref(), &policy) {
                    tracing::warn!(
                        "policy {} skipped: evaluator {} does not accept property {}",
                        policy.id,
                        policy.evaluator,
                        property
                    );
                    continue;
                }
                selected.push((policy, evaluator));
            }
        }

        selected.sort_by(|(a, _), (b, _)| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a.role.cmp(&b.role))
        });
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::permission::permission_set;
    use crate::permissions::evaluators::{BasicEvaluator, SelfEvaluator, TransitiveEvaluator};
    use crate::permissions::provider::{InMemoryEntities, InMemoryPolicyStore, StaticPrincipal};
    use crate::schema::OwnerReference;

    fn manager(policies: Vec<Policy>, config: EngineConfig) -> AuthorizationManager {
        manager_for(&["user"], policies, config)
    }

    fn manager_for(roles: &[&str], policies: Vec<Policy>, config: EngineConfig) -> AuthorizationManager {
        let registry = EvaluatorRegistry::builder(&config)
            .register(BasicEvaluator::new("basic", ["identity"]).with_module("core"))
            .unwrap()
            .register(SelfEvaluator::new("self", ["identity"], "id"))
            .unwrap()
            .register(BasicEvaluator::new("role-basic", ["role"]))
            .unwrap()
            .build();
        let roles: Vec<RoleId> = roles.iter().map(|r| RoleId::new(*r)).collect();

        AuthorizationManager::new(
            Arc::new(registry),
            Arc::new(InMemoryPolicyStore::new(policies)),
            Arc::new(StaticPrincipal::new("u1", roles)),
            Arc::new(InMemoryEntities::new()),
            config,
        )
    }

    #[test]
    fn test_no_policy_denies_all() {
        let manager = manager(vec![], EngineConfig::default());
        let filter = manager.get_predicate("identity", &[Permission::READ]).unwrap();
        assert!(filter.is_deny_all());
        assert!(manager
            .get_permissions(&Entity::new("identity", "u1"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_requested_permissions_must_come_from_same_policy() {
        let manager = manager(
            vec![
                Policy::new("user", "identity", "basic").with_permissions([Permission::READ]),
                Policy::new("user", "identity", "self").with_permissions([Permission::UPDATE]),
            ],
            EngineConfig::default(),
        );

        let read = manager.get_predicate("identity", &[Permission::READ]).unwrap();
        assert!(read.is_unrestricted());

        let update = manager.get_predicate("identity", &[Permission::UPDATE]).unwrap();
        assert_eq!(update, RowFilter::eq("id", "u1"));

        let both = manager
            .get_predicate("identity", &[Permission::READ, Permission::UPDATE])
            .unwrap();
        assert!(both.is_deny_all());
    }

    #[test]
    fn test_policy_order_is_stable() {
        let manager = manager(
            vec![
                Policy::new("user", "identity", "self")
                    .with_id("b")
                    .with_order(2)
                    .with_permissions([Permission::READ]),
                Policy::new("user", "identity", "self")
                    .with_id("a")
                    .with_order(1)
                    .with_permissions([Permission::READ]),
            ],
            EngineConfig::default(),
        );

        let selected = manager
            .active_policies(&[RoleId::new("user"), RoleId::new("user")], "identity")
            .unwrap();
        let ids: Vec<&str> = selected.iter().map(|(p, _)| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_evaluator_is_configuration_error() {
        let manager = manager(
            vec![Policy::new("user", "identity", "nope").with_permissions([Permission::READ])],
            EngineConfig::default(),
        );
        let result = manager.get_permissions(&Entity::new("identity", "u1"));
        assert!(matches!(result, Err(Error::UnknownEvaluator { .. })));
    }

    #[test]
    fn test_same_policy_id_under_two_roles() {
        let manager = manager_for(
            &["a", "b"],
            vec![
                Policy::new("a", "identity", "self")
                    .with_id("p")
                    .with_permissions([Permission::READ]),
                Policy::new("b", "identity", "basic")
                    .with_id("p")
                    .with_permissions([Permission::UPDATE]),
            ],
            EngineConfig::default(),
        );

        let other = manager.get_permissions(&Entity::new("identity", "u2")).unwrap();
        assert_eq!(other, permission_set([Permission::UPDATE]));

        let own = manager.get_permissions(&Entity::new("identity", "u1")).unwrap();
        assert_eq!(own, permission_set([Permission::READ, Permission::UPDATE]));

        let update = manager.get_predicate("identity", &[Permission::UPDATE]).unwrap();
        assert!(update.is_unrestricted());
    }

    #[test]
    fn test_misconfigured_policy_does_not_hide_others() {
        let manager = manager(
            vec![
                Policy::new("user", "identity", "basic").with_permissions([Permission::READ]),
                Policy::new("user", "identity", "role-basic").with_permissions([Permission::UPDATE]),
                Policy::new("user", "identity", "basic")
                    .with_property("colour", "red")
                    .with_permissions([Permission::DELETE]),
            ],
            EngineConfig::default(),
        );

        let granted = manager.get_permissions(&Entity::new("identity", "u2")).unwrap();
        assert_eq!(granted, permission_set([Permission::READ]));

        let read = manager.get_predicate("identity", &[Permission::READ]).unwrap();
        assert!(read.is_unrestricted());
        let update = manager.get_predicate("identity", &[Permission::UPDATE]).unwrap();
        assert!(update.is_deny_all());
        let delete = manager.get_predicate("identity", &[Permission::DELETE]).unwrap();
        assert!(delete.is_deny_all());
    }

    #[test]
    fn test_disabled_evaluator_is_skipped_before_property_check() {
        let manager = manager(
            vec![
                Policy::new("user", "identity", "basic")
                    .with_property("colour", "red")
                    .with_permissions([Permission::READ]),
                Policy::new("user", "identity", "self").with_permissions([Permission::UPDATE]),
            ],
            EngineConfig::default().with_disabled_evaluator("basic"),
        );

        let granted = manager.get_permissions(&Entity::new("identity", "u1")).unwrap();
        assert_eq!(granted, permission_set([Permission::UPDATE]));
    }

    #[test]
    fn test_default_role_applies_to_authenticated_principal() {
        let manager = manager(
            vec![Policy::new("everyone", "identity", "basic").with_permissions([Permission::AUTOCOMPLETE])],
            EngineConfig::default().with_default_role("everyone"),
        );

        let authorities = manager
            .get_authorities(&Subject::Principal("u1".to_string()), "identity")
            .unwrap();
        assert!(authorities.contains("AUTOCOMPLETE"));

        let role_only = manager
            .get_authorities(&Subject::Role(RoleId::new("user")), "identity")
            .unwrap();
        assert!(role_only.is_empty());
    }

    #[test]
    fn test_depth_bound() {
        // node가 자기 자신을 owner로 가리키는 잘못된 구성
        let config = EngineConfig::default().with_max_delegation_depth(3);
        let registry = EvaluatorRegistry::builder(&config)
            .register(TransitiveEvaluator::new(
                "loop",
                "node",
                OwnerReference::new("node", "parent_id"),
            ))
            .unwrap()
            .build();
        let entities = InMemoryEntities::new()
            .with(Entity::new("node", "n1").with_field("parent_id", "n1"));
        let manager = AuthorizationManager::new(
            Arc::new(registry),
            Arc::new(InMemoryPolicyStore::new(vec![Policy::new("user", "node", "loop")])),
            Arc::new(StaticPrincipal::new("u1", vec![RoleId::new("user")])),
            Arc::new(entities),
            config,
        );

        let n1 = manager.entities().fetch("node", "n1").unwrap();
        assert!(matches!(
            manager.get_permissions(&n1),
            Err(Error::DelegationDepthExceeded { depth: 4, .. })
        ));
        assert!(matches!(
            manager.get_predicate("node", &[Permission::READ]),
            Err(Error::DelegationDepthExceeded { .. })
        ));
    }
}

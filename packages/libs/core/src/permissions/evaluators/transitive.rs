//! 위임 평가기
//!
//! 직접적인 소유 표시가 없는 타입(코드 목록 항목, 폼 속성 등)의 권한을
//! owner 엔티티의 권한에서 그대로 가져옵니다.
//!
//! - 행 필터: `EXISTS (owner 행 o: o가 owner 타입 필터를 만족 AND o가 현재 행의 owner)`
//! - 권한 집합: owner 엔티티의 권한 집합 그대로
//!
//! 정책 자신의 `permissions` 필드는 사용하지 않습니다.
//! owner 행이 없으면 아무 권한도 부여하지 않습니다.

use crate::error::{Error, Result};
use crate::permissions::context::EvalContext;
use crate::permissions::entity::Entity;
use crate::permissions::evaluator::{Evaluator, PredicateRequest};
use crate::permissions::filter::RowFilter;
use crate::permissions::permission::PermissionSet;
use crate::permissions::policy::Policy;
use crate::schema::{EntitySchema, OwnerReference};

/// 위임 평가기
#[derive(Debug, Clone)]
pub struct TransitiveEvaluator {
    name: String,
    types: Vec<String>,
    owner: OwnerReference,
}

impl TransitiveEvaluator {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>, owner: OwnerReference) -> Self {
        Self {
            name: name.into(),
            types: vec![entity_type.into()],
            owner,
        }
    }

    /// 스키마의 owner 참조로 생성
    pub fn from_schema(
        name: impl Into<String>,
        schema: &EntitySchema,
        entity_type: &str,
    ) -> Result<Self> {
        let owner = schema
            .owner_reference(entity_type)
            .cloned()
            .ok_or_else(|| Error::ConfigInvalid {
                message: format!("type '{}' has no owner reference", entity_type),
            })?;
        Ok(Self::new(name, entity_type, owner))
    }

    /// owner 타입
    pub fn owner_type(&self) -> &str {
        &self.owner.entity_type
    }

    /// owner 엔티티 조회
    pub fn get_owner(&self, entity: &Entity, ctx: &EvalContext<'_>) -> Option<Entity> {
        ctx.entities().owner_of(entity, &self.owner)
    }
}

impl Evaluator for TransitiveEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_types(&self) -> &[String] {
        &self.types
    }

    fn is_disableable(&self) -> bool {
        false
    }

    fn supports_permissions(&self) -> bool {
        false
    }

    fn get_predicate(
        &self,
        _policy: &Policy,
        request: &PredicateRequest<'_>,
        ctx: &EvalContext<'_>,
    ) -> Result<RowFilter> {
        let owner_filter = ctx.delegate_predicate(self.owner_type(), request.permissions)?;
        Ok(RowFilter::exists(&self.owner, owner_filter))
    }

    fn matches(&self, policy: &Policy, entity: &Entity, ctx: &EvalContext<'_>) -> Result<bool> {
        Ok(!self.get_permissions(policy, entity, ctx)?.is_empty())
    }

    fn get_permissions(
        &self,
        policy: &Policy,
        entity: &Entity,
        ctx: &EvalContext<'_>,
    ) -> Result<PermissionSet> {
        match self.get_owner(entity, ctx) {
            Some(owner) => ctx.delegate_permissions(&owner),
            None => {
                tracing::debug!(
                    "policy {}: {} {} has no resolvable owner",
                    policy.id,
                    entity.entity_type,
                    entity.id
                );
                Ok(PermissionSet::new())
            }
        }
    }
}

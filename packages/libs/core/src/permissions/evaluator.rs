//! 평가기 계약
//!
//! 평가기는 정책 하나를 두 가지 형태로 해석합니다.
//!
//! - 행 필터: 대량 조회용 (`get_predicate`)
//! - 권한 집합: 이미 로드된 엔티티용 (`get_permissions`)
//!
//! 두 해석은 같은 조건에서 나와야 합니다. 엔티티 `e`가 필터를 만족하는 것과
//! `get_permissions(policy, e)`가 비어있지 않은 것은 동치입니다.

use serde::Serialize;

use super::context::EvalContext;
use super::entity::Entity;
use super::filter::RowFilter;
use super::form::{FormAttribute, PersistentType};
use super::permission::{Permission, PermissionSet};
use super::policy::Policy;
use crate::error::Result;

/// 행 필터 요청
#[derive(Debug, Clone, Copy)]
pub struct PredicateRequest<'r> {
    /// 조회 대상 타입
    pub entity_type: &'r str,

    /// 요청된 권한 (AND)
    pub permissions: &'r [Permission],
}

/// 평가기
pub trait Evaluator: Send + Sync {
    /// 고유 이름
    fn name(&self) -> &str;

    /// 지원하는 보호 대상 타입
    fn supported_types(&self) -> &[String];

    /// 타입 지원 여부
    fn supports(&self, entity_type: &str) -> bool {
        self.supported_types().iter().any(|t| t == entity_type)
    }

    /// 이 평가기가 속한 기능 모듈 (모듈 비활성화 시 함께 비활성화)
    fn module(&self) -> Option<&str> {
        None
    }

    /// 비활성화 가능 여부
    ///
    /// 참조 무결성 평가기는 `false`이며 항상 실행됩니다.
    fn is_disableable(&self) -> bool {
        true
    }

    /// 정책의 `permissions` 필드를 사용하는지 여부
    ///
    /// `false`이면 권한을 다른 엔티티에서 그대로 가져오는 위임 전용 평가기입니다.
    fn supports_permissions(&self) -> bool {
        true
    }

    /// 허용되는 속성 키
    fn property_names(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// 속성 입력 폼
    fn form_attributes(&self) -> Vec<FormAttribute> {
        self.property_names()
            .into_iter()
            .map(|name| FormAttribute::new(name, PersistentType::Text))
            .collect()
    }

    /// 행 필터
    fn get_predicate(
        &self,
        policy: &Policy,
        request: &PredicateRequest<'_>,
        ctx: &EvalContext<'_>,
    ) -> Result<RowFilter>;

    /// 엔티티가 정책 조건을 만족하는지
    fn matches(&self, policy: &Policy, entity: &Entity, ctx: &EvalContext<'_>) -> Result<bool>;

    /// 엔티티에 대한 권한 집합
    ///
    /// 기본 동작: 조건을 만족하면 정책의 권한, 아니면 빈 집합
    fn get_permissions(
        &self,
        policy: &Policy,
        entity: &Entity,
        ctx: &EvalContext<'_>,
    ) -> Result<PermissionSet> {
        if self.matches(policy, entity, ctx)? {
            Ok(policy.permissions.clone())
        } else {
            Ok(PermissionSet::new())
        }
    }

    /// 인스턴스 없이 부여되는 권한 (타입 수준)
    fn get_authorities(&self, _policy: &Policy, _ctx: &EvalContext<'_>) -> Result<PermissionSet> {
        Ok(PermissionSet::new())
    }
}

/// 평가기 설명 (정책 편집 UI용)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluatorDescriptor {
    pub name: String,
    pub supported_types: Vec<String>,
    pub property_names: Vec<String>,
    pub form_attributes: Vec<FormAttribute>,
    pub module: Option<String>,
    pub disableable: bool,
    pub disabled: bool,
    pub supports_permissions: bool,
}

//! 세분화된 인가 엔진
//!
//! # 개요
//!
//! role에 연결된 정책(`config/policies.yaml`)을 평가기로 해석하여
//! 두 가지 질문에 답합니다.
//!
//! - 이 타입에서 주체가 볼 수 있는 행은? → [`RowFilter`]
//! - 이 엔티티에 주체가 가진 권한은? → [`PermissionSet`]
//!
//! 정책이 없으면 아무것도 허용하지 않습니다.
//!
//! # 모듈 구조
//!
//! - `permission`: 권한 이름과 집합
//! - `policy`: 정책 레코드와 정책 문서
//! - `entity`, `filter`: 평가 대상 행과 행 필터
//! - `provider`: 주체/정책/엔티티/폼 정의 조회 trait
//! - `evaluator`, `registry`: 평가기 계약과 레지스트리
//! - `evaluators`: 기본 제공 평가기
//! - `manager`: 정책 선택 및 결과 결합

mod context;
mod entity;
mod evaluator;
pub mod evaluators;
mod filter;
mod form;
mod manager;
mod permission;
mod policy;
mod provider;
mod registry;

pub use context::{AuthContext, EvalContext};
pub use entity::{Entity, ID_FIELD};
pub use evaluator::{Evaluator, EvaluatorDescriptor, PredicateRequest};
pub use filter::RowFilter;
pub use form::{FormAttribute, PersistentType};
pub use manager::{AuthorizationManager, Subject};
pub use permission::{parse_permissions, permission_set, Permission, PermissionSet};
pub use policy::{Policy, PolicyDocument, PolicyEntry, RoleId, RolePolicies};
pub use provider::{
    EntityAccessor, FormDefinitions, InMemoryEntities, InMemoryFormDefinitions,
    InMemoryPolicyStore, PolicyStore, PrincipalResolver, StaticPrincipal,
};
pub use registry::{EvaluatorRegistry, EvaluatorRegistryBuilder};

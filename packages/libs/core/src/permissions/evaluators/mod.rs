//! 기본 제공 평가기
//!
//! - `basic`: 무조건 부여 (타입 수준 권한)
//! - `identifier`: 단일 엔티티 (`uuid`)
//! - `self_owned`: 본인 소유 엔티티
//! - `code_set`: 부모 + 코드 화이트리스트
//! - `condition`: 요청 컨텍스트 CEL 조건
//! - `transitive`: owner 엔티티 권한 위임
//! - `form_value`: 확장 속성 값 복합 조건

mod basic;
mod code_set;
mod condition;
mod form_value;
mod identifier;
mod properties;
mod self_owned;
mod transitive;

pub use basic::BasicEvaluator;
pub use code_set::{CodeSetEvaluator, PROPERTY_CODES, PROPERTY_PARENT_ID};
pub use condition::{ConditionEvaluator, PROPERTY_CONDITION};
pub use form_value::{
    FormValueEvaluator, PROPERTY_ATTRIBUTES, PROPERTY_FORM_DEFINITION, PROPERTY_OWNER_READ,
    PROPERTY_OWNER_UPDATE, PROPERTY_SELF_ONLY,
};
pub use identifier::{UuidEvaluator, PROPERTY_UUID};
pub use properties::CodeSet;
pub use self_owned::SelfEvaluator;
pub use transitive::TransitiveEvaluator;

//! 보호 대상 타입 스키마
//!
//! # 개요
//!
//! 보호 대상 타입은 `schema/*.yaml` 파일로 선언됩니다.
//! 각 타입은 테이블, 식별자 컬럼, 선택적인 owner 참조를 가집니다.
//! owner 참조는 위임 평가기가 권한을 owner 타입에서 가져올 때 사용됩니다.
//!
//! # 모듈 구조
//!
//! - `ir`: 스키마 IR (평가기/SQL 렌더러가 사용하는 최종 형태)
//! - `parser`: YAML 파싱 및 검증 (중복, 참조, 순환)

mod ir;
mod parser;

pub use ir::{EntitySchema, OwnerReference, ReferenceError, SecurableType};
pub use parser::SchemaParser;

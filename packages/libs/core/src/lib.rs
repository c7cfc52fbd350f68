//! idg-core: 세분화된 인가 엔진 핵심 라이브러리
//!
//! role에 연결된 정책을 평가기로 해석하여 행 필터(대량 조회용)와
//! 권한 집합(단일 엔티티용)을 계산합니다. 두 결과는 항상 일치합니다.
//!
//! # 모듈 구조
//!
//! - `permissions`: 권한, 정책, 평가기, 레지스트리, 인가 관리자
//! - `schema`: 보호 대상 타입 스키마(YAML) 파싱 및 owner 관계
//! - `config`: 엔진 설정 (YAML/환경변수)
//! - `error`: 공통 에러 타입

pub mod config;
pub mod error;
pub mod permissions;
pub mod schema;

pub use error::{Error, Result};

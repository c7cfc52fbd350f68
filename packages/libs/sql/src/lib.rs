//! idg-sql: 인가 행 필터 SQL 렌더러
//!
//! 인가 엔진이 만든 `RowFilter`를 WHERE 조건으로 변환하고
//! 보호된 SELECT를 생성합니다.
//! SeaQuery를 사용하여 SQL Injection을 원천 차단합니다.
//!
//! # 모듈 구조
//!
//! - `condition`: 행 필터 → SeaQuery 조건 (상관 EXISTS 포함)
//! - `builder`: 보호된 SELECT/COUNT 빌더
//! - `params`: 컬럼/정렬/페이지 파라미터

pub mod builder;
pub mod condition;
pub mod error;
pub mod params;

pub use builder::SecuredSelectBuilder;
pub use condition::ConditionBuilder;
pub use error::{Result, SqlError};
pub use params::{OrderBy, SelectParams, SortOrder};

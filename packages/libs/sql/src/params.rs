//! 조회 파라미터
//!
//! 보호된 SELECT의 컬럼, 정렬, 페이지 파라미터입니다.
//! 행 필터는 호출자가 지정할 수 없고 항상 인가 관리자에서 옵니다.

use serde::{Deserialize, Serialize};

/// 조회 파라미터
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectParams {
    /// SELECT할 컬럼 목록 (None = 모든 컬럼)
    #[serde(default)]
    pub columns: Option<Vec<String>>,

    /// 정렬 (순서 유지)
    #[serde(default)]
    pub order_by: Vec<OrderBy>,

    /// 제한
    #[serde(default)]
    pub limit: Option<u64>,

    /// 오프셋
    #[serde(default)]
    pub offset: Option<u64>,
}

impl SelectParams {
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            order,
        });
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// 정렬 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub order: SortOrder,
}

/// 정렬 순서
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

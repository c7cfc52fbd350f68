//! 행 필터
//!
//! 대량 조회에 WHERE 조건으로 추가되는 조합 가능한 불리언 조건입니다.
//! SQL을 가정하지 않으며, 같은 필터를 이미 로드된 엔티티에 대해
//! 메모리에서 평가할 수도 있습니다. 두 해석은 항상 같은 결과를 내야 합니다.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::Entity;
use super::provider::EntityAccessor;
use crate::schema::OwnerReference;

/// 행 필터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RowFilter {
    /// 제약 없음 (모든 행)
    Unrestricted,

    /// 모든 행 거부
    DenyAll,

    /// `column = value`
    ///
    /// `value`가 null이면 `column IS NULL`이며, 필드가 없는 행도 만족합니다.
    Eq { column: String, value: Value },

    /// `column IN (values)`; null 필드는 어떤 목록에도 속하지 않습니다.
    In { column: String, values: Vec<Value> },

    /// 모든 조건 충족
    And { filters: Vec<RowFilter> },

    /// 하나 이상의 조건 충족
    Or { filters: Vec<RowFilter> },

    /// 상관 서브필터
    ///
    /// `entity_type` 타입의 행 `o`가 존재하고, `o.id == row.<reference>`이며
    /// `o`가 `filter`를 만족합니다.
    Exists {
        entity_type: String,
        reference: String,
        filter: Box<RowFilter>,
    },
}

impl RowFilter {
    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        RowFilter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// `column IN (values)`; 빈 목록은 모든 행 거부
    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return RowFilter::DenyAll;
        }
        RowFilter::In {
            column: column.into(),
            values,
        }
    }

    /// AND 결합 (단순화 포함)
    ///
    /// `DenyAll`이 하나라도 있으면 `DenyAll`, `Unrestricted`는 생략됩니다.
    /// 빈 목록은 `Unrestricted`입니다.
    pub fn and<I>(filters: I) -> Self
    where
        I: IntoIterator<Item = RowFilter>,
    {
        let mut flat = Vec::new();
        for filter in filters {
            match filter {
                RowFilter::Unrestricted => {}
                RowFilter::DenyAll => return RowFilter::DenyAll,
                RowFilter::And { filters } => flat.extend(filters),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => RowFilter::Unrestricted,
            1 => flat.remove(0),
            _ => RowFilter::And { filters: flat },
        }
    }

    /// OR 결합 (단순화 포함)
    ///
    /// `Unrestricted`가 하나라도 있으면 `Unrestricted`, `DenyAll`은 생략됩니다.
    /// 빈 목록은 `DenyAll`입니다.
    pub fn any<I>(filters: I) -> Self
    where
        I: IntoIterator<Item = RowFilter>,
    {
        let mut flat = Vec::new();
        for filter in filters {
            match filter {
                RowFilter::DenyAll => {}
                RowFilter::Unrestricted => return RowFilter::Unrestricted,
                RowFilter::Or { filters } => flat.extend(filters),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => RowFilter::DenyAll,
            1 => flat.remove(0),
            _ => RowFilter::Or { filters: flat },
        }
    }

    /// owner 행에 대한 상관 서브필터
    ///
    /// 내부 필터가 `Unrestricted`여도 owner 행의 존재는 요구됩니다.
    pub fn exists(owner: &OwnerReference, filter: RowFilter) -> Self {
        if filter == RowFilter::DenyAll {
            return RowFilter::DenyAll;
        }
        RowFilter::Exists {
            entity_type: owner.entity_type.clone(),
            reference: owner.column.clone(),
            filter: Box::new(filter),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, RowFilter::Unrestricted)
    }

    pub fn is_deny_all(&self) -> bool {
        matches!(self, RowFilter::DenyAll)
    }

    /// 메모리 평가
    ///
    /// owner 행이 없으면 `Exists`는 만족되지 않습니다.
    pub fn matches(&self, entity: &Entity, entities: &dyn EntityAccessor) -> bool {
        match self {
            RowFilter::Unrestricted => true,
            RowFilter::DenyAll => false,
            RowFilter::Eq {
                column,
                value: Value::Null,
            } => matches!(entity.field(column), None | Some(Value::Null)),
            RowFilter::Eq { column, value } => entity.field(column).as_ref() == Some(value),
            RowFilter::In { column, values } => match entity.field(column) {
                Some(Value::Null) | None => false,
                Some(actual) => values.contains(&actual),
            },
            RowFilter::And { filters } => filters.iter().all(|f| f.matches(entity, entities)),
            RowFilter::Or { filters } => filters.iter().any(|f| f.matches(entity, entities)),
            RowFilter::Exists {
                entity_type,
                reference,
                filter,
            } => {
                let owner_ref = OwnerReference::new(entity_type.clone(), reference.clone());
                match entities.owner_of(entity, &owner_ref) {
                    Some(owner) => filter.matches(&owner, entities),
                    None => false,
                }
            }
        }
    }
}

//! 행 필터 → WHERE 조건
//!
//! 인가 엔진의 `RowFilter`를 SeaQuery `Condition`으로 변환합니다.
//! 값은 모두 SeaQuery 값으로 바인딩되므로 SQL Injection이 차단됩니다.
//!
//! `Exists`는 owner 테이블에 대한 상관 서브쿼리가 됩니다.
//!
//! ```sql
//! EXISTS(SELECT 1 FROM "code_lists" AS "t0"
//!         WHERE "t0"."id" = "code_items"."code_list_id" AND ...)
//! ```
//!
//! 서브쿼리 별칭은 중첩 깊이마다 `t0`, `t1`, ... 으로 부여됩니다.
//! 필터의 `id` 컬럼은 각 타입에 선언된 식별자 컬럼으로 바뀝니다.

use sea_query::{Condition, Expr, Iden, Query, SimpleExpr};
use serde_json::Value;

use idg_core::permissions::{RowFilter, ID_FIELD};
use idg_core::schema::{EntitySchema, SecurableType};

use crate::error::{Result, SqlError};

/// 동적 테이블/컬럼 식별자
#[derive(Debug, Clone)]
pub(crate) struct DynIden(pub(crate) String);

impl Iden for DynIden {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = s.write_str(&self.0);
    }
}

/// 조건 빌더
pub struct ConditionBuilder<'a> {
    schema: &'a EntitySchema,
}

impl<'a> ConditionBuilder<'a> {
    pub fn new(schema: &'a EntitySchema) -> Self {
        Self { schema }
    }

    /// 조건 생성
    ///
    /// # Arguments
    /// * `filter` - 인가 관리자가 만든 행 필터
    /// * `alias` - 바깥 쿼리에서 보호 대상 테이블의 이름 또는 별칭
    pub fn build(&self, filter: &RowFilter, alias: &str) -> Result<Condition> {
        self.condition(filter, &Scope::new(alias, ID_FIELD), 0)
    }

    /// 보호 대상 타입의 조건 생성 (식별자 컬럼 반영)
    pub fn build_for(&self, filter: &RowFilter, entity_type: &str, alias: &str) -> Result<Condition> {
        let securable = self.securable(entity_type)?;
        self.condition(filter, &Scope::new(alias, &securable.id), 0)
    }

    fn securable(&self, entity_type: &str) -> Result<&'a SecurableType> {
        self.schema
            .get(entity_type)
            .ok_or_else(|| SqlError::UnknownType {
                entity_type: entity_type.to_string(),
            })
    }

    fn condition(&self, filter: &RowFilter, scope: &Scope<'_>, depth: usize) -> Result<Condition> {
        let condition = match filter {
            RowFilter::Unrestricted => Condition::all().add(Expr::cust("1 = 1")),
            RowFilter::DenyAll => Condition::all().add(Expr::cust("1 = 0")),
            RowFilter::Eq { column, value } => {
                let col = Expr::col(scope.column(column));
                Condition::all().add(match value {
                    Value::Null => col.is_null(),
                    value => col.eq(value_to_expr(value)),
                })
            }
            RowFilter::In { values, .. } if values.is_empty() => {
                Condition::all().add(Expr::cust("1 = 0"))
            }
            RowFilter::In { column, values } => Condition::all().add(
                Expr::col(scope.column(column))
                    .is_in(values.iter().map(value_to_expr)),
            ),
            RowFilter::And { filters } => {
                let mut all = Condition::all();
                for filter in filters {
                    all = all.add(self.condition(filter, scope, depth)?);
                }
                all
            }
            RowFilter::Or { filters } => {
                let mut any = Condition::any();
                for filter in filters {
                    any = any.add(self.condition(filter, scope, depth)?);
                }
                any
            }
            RowFilter::Exists {
                entity_type,
                reference,
                filter,
            } => Condition::all().add(self.exists(entity_type, reference, filter, scope, depth)?),
        };
        Ok(condition)
    }

    fn exists(
        &self,
        entity_type: &str,
        reference: &str,
        filter: &RowFilter,
        scope: &Scope<'_>,
        depth: usize,
    ) -> Result<SimpleExpr> {
        let owner = self.securable(entity_type)?;

        let sub_alias = format!("t{}", depth);
        let sub_scope = Scope::new(&sub_alias, &owner.id);
        let join = Expr::col(sub_scope.column(ID_FIELD)).equals(scope.column(reference));
        let inner = self.condition(filter, &sub_scope, depth + 1)?;

        let mut sub = Query::select();
        sub.expr(Expr::val(1))
            .from_as(DynIden(owner.table.clone()), DynIden(sub_alias))
            .cond_where(Condition::all().add(join).add(inner));

        Ok(Expr::exists(sub))
    }
}

/// 현재 쿼리 수준의 테이블 별칭과 식별자 컬럼
struct Scope<'s> {
    alias: &'s str,
    id_column: &'s str,
}

impl<'s> Scope<'s> {
    fn new(alias: &'s str, id_column: &'s str) -> Self {
        Self { alias, id_column }
    }

    fn column(&self, column: &str) -> (DynIden, DynIden) {
        let column = if column == ID_FIELD {
            self.id_column
        } else {
            column
        };
        (DynIden(self.alias.to_string()), DynIden(column.to_string()))
    }
}

/// serde_json::Value를 SeaQuery Expr로 변환
pub(crate) fn value_to_expr(value: &Value) -> SimpleExpr {
    match value {
        Value::Null => Expr::val(Option::<String>::None).into(),
        Value::Bool(b) => Expr::val(*b).into(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Expr::val(i).into()
            } else if let Some(f) = n.as_f64() {
                Expr::val(f).into()
            } else {
                Expr::val(n.to_string()).into()
            }
        }
        Value::String(s) => Expr::val(s.as_str()).into(),
        Value::Array(_) | Value::Object(_) => Expr::val(value.to_string()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idg_core::schema::SchemaParser;
    use sea_query::{Asterisk, PostgresQueryBuilder};

    fn schema() -> EntitySchema {
        SchemaParser::parse_yaml(
            r#"
types:
  code_list:
    table: code_lists
  code_item:
    table: code_items
    owner:
      type: code_list
      column: code_list_id
  attachment:
    table: attachments
    owner:
      type: code_item
      column: item_id
"#,
        )
        .unwrap()
    }

    fn render(filter: &RowFilter, table: &str) -> String {
        let schema = schema();
        let condition = ConditionBuilder::new(&schema).build(filter, table).unwrap();
        Query::select()
            .column(Asterisk)
            .from(DynIden(table.to_string()))
            .cond_where(condition)
            .to_string(PostgresQueryBuilder)
    }

    #[test]
    fn test_unrestricted_and_deny_all() {
        assert!(render(&RowFilter::Unrestricted, "code_items").contains("1 = 1"));
        assert!(render(&RowFilter::DenyAll, "code_items").contains("1 = 0"));
    }

    #[test]
    fn test_eq_and_in() {
        let filter = RowFilter::and([
            RowFilter::eq("code_list_id", "c1"),
            RowFilter::is_in("code", ["A", "B"]),
        ]);
        let sql = render(&filter, "code_items");
        assert!(sql.contains("\"code_items\".\"code_list_id\" = 'c1'"));
        assert!(sql.contains("\"code_items\".\"code\" IN ('A', 'B')"));
        assert!(sql.contains(" AND "));
    }

    #[test]
    fn test_eq_null_renders_is_null() {
        let sql = render(&RowFilter::eq("parent_id", Value::Null), "code_items");
        assert!(sql.contains("\"code_items\".\"parent_id\" IS NULL"));
    }

    #[test]
    fn test_or() {
        let filter = RowFilter::any([RowFilter::eq("id", "a"), RowFilter::eq("id", "b")]);
        let sql = render(&filter, "code_lists");
        assert!(sql.contains("\"code_lists\".\"id\" = 'a'"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_nested_exists_uses_fresh_aliases() {
        let list = RowFilter::eq("id", "c1");
        let item = RowFilter::Exists {
            entity_type: "code_list".to_string(),
            reference: "code_list_id".to_string(),
            filter: Box::new(list),
        };
        let attachment = RowFilter::Exists {
            entity_type: "code_item".to_string(),
            reference: "item_id".to_string(),
            filter: Box::new(item),
        };

        let sql = render(&attachment, "attachments");
        assert!(sql.contains("EXISTS"));
        assert!(sql.contains("SELECT 1 FROM \"code_items\" AS \"t0\""));
        assert!(sql.contains("\"t0\".\"id\" = \"attachments\".\"item_id\""));
        assert!(sql.contains("SELECT 1 FROM \"code_lists\" AS \"t1\""));
        assert!(sql.contains("\"t1\".\"id\" = \"t0\".\"code_list_id\""));
        assert!(sql.contains("\"t1\".\"id\" = 'c1'"));
    }

    #[test]
    fn test_exists_unrestricted_still_requires_owner() {
        let filter = RowFilter::Exists {
            entity_type: "code_list".to_string(),
            reference: "code_list_id".to_string(),
            filter: Box::new(RowFilter::Unrestricted),
        };
        let sql = render(&filter, "code_items");
        assert!(sql.contains("EXISTS"));
        assert!(sql.contains("\"t0\".\"id\" = \"code_items\".\"code_list_id\""));
    }

    #[test]
    fn test_unknown_owner_type() {
        let schema = schema();
        let filter = RowFilter::Exists {
            entity_type: "nowhere".to_string(),
            reference: "x".to_string(),
            filter: Box::new(RowFilter::Unrestricted),
        };
        let err = ConditionBuilder::new(&schema)
            .build(&filter, "code_items")
            .unwrap_err();
        assert!(matches!(err, SqlError::UnknownType { .. }));
    }

    #[test]
    fn test_id_column_follows_schema() {
        let schema = SchemaParser::parse_yaml(
            r#"
types:
  identity:
    table: identities
    id: identity_id
  contact:
    table: contacts
    owner:
      type: identity
      column: owner_id
"#,
        )
        .unwrap();
        let filter = RowFilter::Exists {
            entity_type: "identity".to_string(),
            reference: "owner_id".to_string(),
            filter: Box::new(RowFilter::eq("id", "u1")),
        };
        let condition = ConditionBuilder::new(&schema)
            .build_for(&filter, "contact", "contacts")
            .unwrap();
        let sql = Query::select()
            .column(Asterisk)
            .from(DynIden("contacts".to_string()))
            .cond_where(condition)
            .to_string(PostgresQueryBuilder);

        assert!(sql.contains("\"t0\".\"identity_id\" = \"contacts\".\"owner_id\""));
        assert!(sql.contains("\"t0\".\"identity_id\" = 'u1'"));
    }
}

//! 보호된 SELECT 빌더
//!
//! 보호 대상 타입과 인가 관리자의 행 필터를 받아 SQL을 생성합니다.
//! 행 필터는 항상 WHERE에 AND로 추가되며 호출자가 제거할 수 없습니다.

use sea_query::{Asterisk, Expr, Func, Order, PostgresQueryBuilder, Query, SelectStatement, Values};

use idg_core::permissions::RowFilter;
use idg_core::schema::{EntitySchema, SecurableType};

use crate::condition::{ConditionBuilder, DynIden};
use crate::error::{Result, SqlError};
use crate::params::{SelectParams, SortOrder};

/// 보호된 SELECT 쿼리 빌더
pub struct SecuredSelectBuilder<'a> {
    schema: &'a EntitySchema,
    securable: &'a SecurableType,
}

impl<'a> SecuredSelectBuilder<'a> {
    /// 새 빌더 생성
    pub fn new(schema: &'a EntitySchema, entity_type: &str) -> Result<Self> {
        let securable = schema.get(entity_type).ok_or_else(|| SqlError::UnknownType {
            entity_type: entity_type.to_string(),
        })?;
        Ok(Self { schema, securable })
    }

    /// SQL 생성 (값 인라인)
    pub fn build(&self, filter: &RowFilter, params: &SelectParams) -> Result<String> {
        Ok(self.statement(filter, params)?.to_string(PostgresQueryBuilder))
    }

    /// SQL 생성
    ///
    /// # Returns
    /// (SQL 문자열, 바인딩할 값들)
    pub fn build_values(
        &self,
        filter: &RowFilter,
        params: &SelectParams,
    ) -> Result<(String, Values)> {
        Ok(self.statement(filter, params)?.build(PostgresQueryBuilder))
    }

    /// COUNT SQL 생성
    pub fn build_count(&self, filter: &RowFilter) -> Result<String> {
        let mut query = Query::select();
        query
            .expr(Func::count(Expr::col(Asterisk)))
            .from(self.table());
        query.cond_where(self.condition(filter)?);
        Ok(query.to_string(PostgresQueryBuilder))
    }

    fn statement(&self, filter: &RowFilter, params: &SelectParams) -> Result<SelectStatement> {
        let mut query = Query::select();

        // FROM
        query.from(self.table());

        // SELECT columns
        match &params.columns {
            Some(columns) => {
                for column in columns {
                    query.column((self.table(), DynIden(column.clone())));
                }
            }
            None => {
                query.column((self.table(), Asterisk));
            }
        }

        // WHERE (권한 조건)
        query.cond_where(self.condition(filter)?);

        // ORDER BY
        for order_by in &params.order_by {
            let order = match order_by.order {
                SortOrder::Asc => Order::Asc,
                SortOrder::Desc => Order::Desc,
            };
            query.order_by((self.table(), DynIden(order_by.column.clone())), order);
        }

        // LIMIT / OFFSET
        if let Some(limit) = params.limit {
            query.limit(limit);
        }
        if let Some(offset) = params.offset {
            query.offset(offset);
        }

        Ok(query)
    }

    fn condition(&self, filter: &RowFilter) -> Result<sea_query::Condition> {
        ConditionBuilder::new(self.schema).build_for(
            filter,
            &self.securable.name,
            &self.securable.table,
        )
    }

    fn table(&self) -> DynIden {
        DynIden(self.securable.table.clone())
    }
}

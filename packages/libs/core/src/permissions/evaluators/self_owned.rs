//! 본인 소유 평가기
//!
//! owner 컬럼 값이 현재 주체 ID와 같은 엔티티에만 권한을 부여합니다.
//! 익명 주체에게는 아무것도 부여하지 않습니다.

use serde_json::Value;

use crate::error::Result;
use crate::permissions::context::EvalContext;
use crate::permissions::entity::Entity;
use crate::permissions::evaluator::{Evaluator, PredicateRequest};
use crate::permissions::filter::RowFilter;
use crate::permissions::policy::Policy;

/// 본인 소유 평가기
#[derive(Debug, Clone)]
pub struct SelfEvaluator {
    name: String,
    types: Vec<String>,
    owner_column: String,
    module: Option<String>,
}

impl SelfEvaluator {
    /// `owner_column`: 주체 ID를 담는 컬럼 (주체 타입 자체라면 `id`)
    pub fn new<I, S>(name: impl Into<String>, types: I, owner_column: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            types: types.into_iter().map(Into::into).collect(),
            owner_column: owner_column.into(),
            module: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }
}

impl Evaluator for SelfEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_types(&self) -> &[String] {
        &self.types
    }

    fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    fn get_predicate(
        &self,
        _policy: &Policy,
        _request: &PredicateRequest<'_>,
        ctx: &EvalContext<'_>,
    ) -> Result<RowFilter> {
        Ok(match ctx.principal_id() {
            Some(principal) => RowFilter::eq(self.owner_column.as_str(), principal),
            None => RowFilter::DenyAll,
        })
    }

    fn matches(&self, _policy: &Policy, entity: &Entity, ctx: &EvalContext<'_>) -> Result<bool> {
        let Some(principal) = ctx.principal_id() else {
            return Ok(false);
        };
        Ok(entity.field(&self.owner_column) == Some(Value::String(principal.to_string())))
    }
}

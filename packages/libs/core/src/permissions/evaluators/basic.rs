//! 무조건 평가기
//!
//! 타입의 모든 엔티티에 정책 권한을 부여합니다.
//! 인스턴스 없이 부여되는 권한(authorities)의 원천입니다.

use crate::error::Result;
use crate::permissions::context::EvalContext;
use crate::permissions::entity::Entity;
use crate::permissions::evaluator::{Evaluator, PredicateRequest};
use crate::permissions::filter::RowFilter;
use crate::permissions::permission::PermissionSet;
use crate::permissions::policy::Policy;

/// 무조건 평가기
#[derive(Debug, Clone)]
pub struct BasicEvaluator {
    name: String,
    types: Vec<String>,
    module: Option<String>,
}

impl BasicEvaluator {
    pub fn new<I, S>(name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            types: types.into_iter().map(Into::into).collect(),
            module: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }
}

impl Evaluator for BasicEvaluator {
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
        _ctx: &EvalContext<'_>,
    ) -> Result<RowFilter> {
        Ok(RowFilter::Unrestricted)
    }

    fn matches(&self, _policy: &Policy, _entity: &Entity, _ctx: &EvalContext<'_>) -> Result<bool> {
        Ok(true)
    }

    fn get_authorities(&self, policy: &Policy, _ctx: &EvalContext<'_>) -> Result<PermissionSet> {
        Ok(policy.permissions.clone())
    }
}

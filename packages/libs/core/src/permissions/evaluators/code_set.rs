//! 코드 집합 평가기
//!
//! 부모(코드 목록, 폼 정의 등)에 속한 항목 중 화이트리스트 코드에 해당하는
//! 항목에 권한을 부여합니다.
//!
//! - `parent-id`: 부모 식별자 (필수, 없거나 해석되지 않으면 모두 거부)
//! - `codes`: 쉼표 구분 코드 목록 (비어있으면 모든 코드)

use serde::Deserialize;
use serde_json::Value;

use super::properties::{decode_properties, deserialize_non_blank, CodeSet};
use crate::error::Result;
use crate::permissions::context::EvalContext;
use crate::permissions::entity::Entity;
use crate::permissions::evaluator::{Evaluator, PredicateRequest};
use crate::permissions::filter::RowFilter;
use crate::permissions::form::{FormAttribute, PersistentType};
use crate::permissions::policy::Policy;

pub const PROPERTY_PARENT_ID: &str = "parent-id";
pub const PROPERTY_CODES: &str = "codes";

#[derive(Debug, Deserialize)]
struct CodeSetProperties {
    #[serde(rename = "parent-id", default, deserialize_with = "deserialize_non_blank")]
    parent_id: Option<String>,
    #[serde(default)]
    codes: CodeSet,
}

/// 해석된 정책 조건
struct Resolved {
    parent_id: String,
    codes: CodeSet,
}

/// 코드 집합 평가기
#[derive(Debug, Clone)]
pub struct CodeSetEvaluator {
    name: String,
    types: Vec<String>,
    parent_column: String,
    code_column: String,
    parent_type: Option<String>,
    module: Option<String>,
}

impl CodeSetEvaluator {
    pub fn new(
        name: impl Into<String>,
        entity_type: impl Into<String>,
        parent_column: impl Into<String>,
        code_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            types: vec![entity_type.into()],
            parent_column: parent_column.into(),
            code_column: code_column.into(),
            parent_type: None,
            module: None,
        }
    }

    /// 부모 타입 지정 (지정하면 부모 행 존재를 확인)
    pub fn with_parent_type(mut self, parent_type: impl Into<String>) -> Self {
        self.parent_type = Some(parent_type.into());
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    fn resolve(&self, policy: &Policy, ctx: &EvalContext<'_>) -> Option<Resolved> {
        let properties: CodeSetProperties = decode_properties(&self.name, policy)?;
        let Some(parent_id) = properties.parent_id else {
            tracing::warn!("policy {} has no {} property", policy.id, PROPERTY_PARENT_ID);
            return None;
        };

        if let Some(parent_type) = &self.parent_type {
            if ctx.entities().fetch(parent_type, &parent_id).is_none() {
                tracing::warn!(
                    "policy {} references missing {} {}",
                    policy.id,
                    parent_type,
                    parent_id
                );
                return None;
            }
        }

        Some(Resolved {
            parent_id,
            codes: properties.codes,
        })
    }
}

impl Evaluator for CodeSetEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_types(&self) -> &[String] {
        &self.types
    }

    fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    fn property_names(&self) -> Vec<&'static str> {
        vec![PROPERTY_PARENT_ID, PROPERTY_CODES]
    }

    fn form_attributes(&self) -> Vec<FormAttribute> {
        vec![
            FormAttribute::new(PROPERTY_PARENT_ID, PersistentType::Uuid)
                .required()
                .with_face_type("entity-select"),
            FormAttribute::new(PROPERTY_CODES, PersistentType::ShortText),
        ]
    }

    fn get_predicate(
        &self,
        policy: &Policy,
        _request: &PredicateRequest<'_>,
        ctx: &EvalContext<'_>,
    ) -> Result<RowFilter> {
        let Some(resolved) = self.resolve(policy, ctx) else {
            return Ok(RowFilter::DenyAll);
        };

        let mut filters = vec![RowFilter::eq(self.parent_column.as_str(), resolved.parent_id)];
        if !resolved.codes.is_empty() {
            filters.push(RowFilter::is_in(
                self.code_column.as_str(),
                resolved.codes.iter().map(str::to_string),
            ));
        }
        Ok(RowFilter::and(filters))
    }

    fn matches(&self, policy: &Policy, entity: &Entity, ctx: &EvalContext<'_>) -> Result<bool> {
        let Some(resolved) = self.resolve(policy, ctx) else {
            return Ok(false);
        };

        if entity.field(&self.parent_column) != Some(Value::String(resolved.parent_id)) {
            return Ok(false);
        }

        Ok(match entity.field(&self.code_column) {
            Some(Value::String(code)) => resolved.codes.accepts(&code),
            _ => resolved.codes.is_empty(),
        })
    }
}

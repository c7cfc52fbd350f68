//! 단일 엔티티 평가기
//!
//! `uuid` 속성과 식별자가 같은 엔티티 하나에만 권한을 부여합니다.

use serde::Deserialize;
use uuid::Uuid;

use super::properties::{decode_properties, deserialize_non_blank};
use crate::error::Result;
use crate::permissions::context::EvalContext;
use crate::permissions::entity::{Entity, ID_FIELD};
use crate::permissions::evaluator::{Evaluator, PredicateRequest};
use crate::permissions::filter::RowFilter;
use crate::permissions::form::{FormAttribute, PersistentType};
use crate::permissions::policy::Policy;

pub const PROPERTY_UUID: &str = "uuid";

#[derive(Debug, Deserialize)]
struct UuidProperties {
    #[serde(default, deserialize_with = "deserialize_non_blank")]
    uuid: Option<String>,
}

/// 단일 엔티티 평가기
#[derive(Debug, Clone)]
pub struct UuidEvaluator {
    name: String,
    types: Vec<String>,
    module: Option<String>,
}

impl UuidEvaluator {
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

    /// 정책이 가리키는 식별자 (정규화된 UUID 문자열)
    ///
    /// 없거나 UUID가 아니면 None
    fn target(&self, policy: &Policy) -> Option<String> {
        let properties: UuidProperties = decode_properties(&self.name, policy)?;
        let raw = properties.uuid?;
        match Uuid::parse_str(&raw) {
            Ok(uuid) => Some(uuid.to_string()),
            Err(_) => {
                tracing::warn!("policy {} has invalid uuid property: {}", policy.id, raw);
                None
            }
        }
    }
}

impl Evaluator for UuidEvaluator {
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
        vec![PROPERTY_UUID]
    }

    fn form_attributes(&self) -> Vec<FormAttribute> {
        vec![FormAttribute::new(PROPERTY_UUID, PersistentType::Uuid)
            .required()
            .with_face_type("entity-select")]
    }

    fn get_predicate(
        &self,
        policy: &Policy,
        _request: &PredicateRequest<'_>,
        _ctx: &EvalContext<'_>,
    ) -> Result<RowFilter> {
        Ok(match self.target(policy) {
            Some(id) => RowFilter::eq(ID_FIELD, id),
            None => RowFilter::DenyAll,
        })
    }

    fn matches(&self, policy: &Policy, entity: &Entity, _ctx: &EvalContext<'_>) -> Result<bool> {
        Ok(self.target(policy).as_deref() == Some(entity.id.as_str()))
    }
}

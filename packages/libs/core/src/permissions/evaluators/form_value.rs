//! 확장 속성 값 평가기
//!
//! (owner 엔티티, 폼 정의, 속성)으로 식별되는 확장 속성 값 행을 보호합니다.
//! 아래 조건 중 켜진 것을 모두 만족하면 정책의 권한을 부여합니다.
//!
//! - `form-definition`: 지정된 폼 정의의 값만 (없으면 owner 타입의 main 정의)
//! - `attributes`: 속성 코드 화이트리스트 (비어있으면 정의의 모든 속성)
//! - `self-only`: 값의 owner가 현재 주체
//! - `owner-read`: 현재 주체가 owner 엔티티에 READ 권한 보유
//! - `owner-update`: 현재 주체가 owner 엔티티에 UPDATE 권한 보유
//!
//! 폼 정의가 해석되지 않으면 모두 거부합니다.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::properties::{decode_properties, deserialize_flag, deserialize_non_blank, CodeSet};
use crate::error::Result;
use crate::permissions::context::EvalContext;
use crate::permissions::entity::Entity;
use crate::permissions::evaluator::{Evaluator, PredicateRequest};
use crate::permissions::filter::RowFilter;
use crate::permissions::form::{FormAttribute, PersistentType};
use crate::permissions::permission::Permission;
use crate::permissions::policy::Policy;
use crate::permissions::provider::FormDefinitions;
use crate::schema::OwnerReference;

pub const PROPERTY_FORM_DEFINITION: &str = "form-definition";
pub const PROPERTY_ATTRIBUTES: &str = "attributes";
pub const PROPERTY_SELF_ONLY: &str = "self-only";
pub const PROPERTY_OWNER_READ: &str = "owner-read";
pub const PROPERTY_OWNER_UPDATE: &str = "owner-update";

const DEFAULT_DEFINITION_COLUMN: &str = "form_definition_id";
const DEFAULT_ATTRIBUTE_COLUMN: &str = "attribute_code";

#[derive(Debug, Deserialize)]
struct FormValueProperties {
    #[serde(rename = "form-definition", default, deserialize_with = "deserialize_non_blank")]
    form_definition: Option<String>,
    #[serde(default)]
    attributes: CodeSet,
    #[serde(rename = "self-only", default, deserialize_with = "deserialize_flag")]
    self_only: bool,
    #[serde(rename = "owner-read", default, deserialize_with = "deserialize_flag")]
    owner_read: bool,
    #[serde(rename = "owner-update", default, deserialize_with = "deserialize_flag")]
    owner_update: bool,
}

/// 해석된 정책 조건
struct Resolved {
    definition_id: String,
    properties: FormValueProperties,
}

impl Resolved {
    /// owner 엔티티에 요구되는 권한
    fn owner_permissions(&self) -> Vec<Permission> {
        let mut required = Vec::new();
        if self.properties.owner_read {
            required.push(Permission::READ);
        }
        if self.properties.owner_update {
            required.push(Permission::UPDATE);
        }
        required
    }
}

/// 확장 속성 값 평가기
pub struct FormValueEvaluator {
    name: String,
    types: Vec<String>,
    owner: OwnerReference,
    definition_column: String,
    attribute_column: String,
    definitions: Arc<dyn FormDefinitions>,
    module: Option<String>,
}

impl FormValueEvaluator {
    /// `owner`: 값 행에서 owner 엔티티를 가리키는 참조
    pub fn new(
        name: impl Into<String>,
        value_type: impl Into<String>,
        owner: OwnerReference,
        definitions: Arc<dyn FormDefinitions>,
    ) -> Self {
        Self {
            name: name.into(),
            types: vec![value_type.into()],
            owner,
            definition_column: DEFAULT_DEFINITION_COLUMN.to_string(),
            attribute_column: DEFAULT_ATTRIBUTE_COLUMN.to_string(),
            definitions,
            module: None,
        }
    }

    /// 폼 정의/속성 컬럼 지정
    pub fn with_columns(
        mut self,
        definition_column: impl Into<String>,
        attribute_column: impl Into<String>,
    ) -> Self {
        self.definition_column = definition_column.into();
        self.attribute_column = attribute_column.into();
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    fn resolve(&self, policy: &Policy) -> Option<Resolved> {
        let properties: FormValueProperties = decode_properties(&self.name, policy)?;

        let definition_id = match &properties.form_definition {
            Some(key) => self.definitions.resolve(&self.owner.entity_type, key),
            None => self.definitions.main_definition(&self.owner.entity_type),
        };
        let Some(definition_id) = definition_id else {
            tracing::warn!(
                "policy {}: form definition {:?} for {} is not resolvable",
                policy.id,
                properties.form_definition,
                self.owner.entity_type
            );
            return None;
        };

        Some(Resolved {
            definition_id,
            properties,
        })
    }
}

impl Evaluator for FormValueEvaluator {
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
        vec![
            PROPERTY_FORM_DEFINITION,
            PROPERTY_ATTRIBUTES,
            PROPERTY_SELF_ONLY,
            PROPERTY_OWNER_READ,
            PROPERTY_OWNER_UPDATE,
        ]
    }

    fn form_attributes(&self) -> Vec<FormAttribute> {
        vec![
            FormAttribute::new(PROPERTY_FORM_DEFINITION, PersistentType::Uuid)
                .with_face_type("form-definition-select"),
            FormAttribute::new(PROPERTY_ATTRIBUTES, PersistentType::ShortText),
            FormAttribute::new(PROPERTY_SELF_ONLY, PersistentType::Boolean).with_default("false"),
            FormAttribute::new(PROPERTY_OWNER_READ, PersistentType::Boolean).with_default("false"),
            FormAttribute::new(PROPERTY_OWNER_UPDATE, PersistentType::Boolean)
                .with_default("false"),
        ]
    }

    fn get_predicate(
        &self,
        policy: &Policy,
        _request: &PredicateRequest<'_>,
        ctx: &EvalContext<'_>,
    ) -> Result<RowFilter> {
        let Some(resolved) = self.resolve(policy) else {
            return Ok(RowFilter::DenyAll);
        };

        let mut filters = vec![RowFilter::eq(
            self.definition_column.as_str(),
            resolved.definition_id.as_str(),
        )];

        if !resolved.properties.attributes.is_empty() {
            filters.push(RowFilter::is_in(
                self.attribute_column.as_str(),
                resolved.properties.attributes.iter().map(str::to_string),
            ));
        }

        if resolved.properties.self_only {
            filters.push(match ctx.principal_id() {
                Some(principal) => RowFilter::eq(self.owner.column.as_str(), principal),
                None => RowFilter::DenyAll,
            });
        }

        // 권한마다 별도 EXISTS: 서로 다른 owner 정책이 READ와 UPDATE를 부여해도 충족
        for permission in resolved.owner_permissions() {
            let owner_filter = ctx.delegate_predicate(&self.owner.entity_type, &[permission])?;
            filters.push(RowFilter::exists(&self.owner, owner_filter));
        }

        Ok(RowFilter::and(filters))
    }

    fn matches(&self, policy: &Policy, entity: &Entity, ctx: &EvalContext<'_>) -> Result<bool> {
        let Some(resolved) = self.resolve(policy) else {
            return Ok(false);
        };

        if entity.field(&self.definition_column) != Some(Value::String(resolved.definition_id.clone()))
        {
            return Ok(false);
        }

        let attribute_ok = match entity.field(&self.attribute_column) {
            Some(Value::String(code)) => resolved.properties.attributes.accepts(&code),
            _ => resolved.properties.attributes.is_empty(),
        };
        if !attribute_ok {
            return Ok(false);
        }

        if resolved.properties.self_only {
            let Some(principal) = ctx.principal_id() else {
                return Ok(false);
            };
            if entity.field(&self.owner.column) != Some(Value::String(principal.to_string())) {
                return Ok(false);
            }
        }

        let required = resolved.owner_permissions();
        if required.is_empty() {
            return Ok(true);
        }

        // owner 행이 없으면 제약 없음이 아니라 거부
        let Some(owner) = ctx.entities().owner_of(entity, &self.owner) else {
            return Ok(false);
        };
        let granted = ctx.delegate_permissions(&owner)?;
        Ok(required.iter().all(|p| granted.contains(p)))
    }
}

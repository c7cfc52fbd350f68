//! CEL 조건 평가기
//!
//! 요청 컨텍스트(`request.auth.*`)에 대한 CEL 조건이 참이면 타입의 모든
//! 엔티티에 권한을 부여합니다. 행과 무관한 조건이므로 행 필터는
//! `Unrestricted` 또는 `DenyAll` 중 하나입니다.
//!
//! 컴파일/평가 오류는 거부로 처리합니다.

use std::collections::HashMap;
use std::sync::Arc;

use cel_interpreter::objects::Value as CelValue;
use cel_interpreter::{Context, Program};
use serde::Deserialize;

use super::properties::{decode_properties, deserialize_non_blank};
use crate::error::Result;
use crate::permissions::context::{AuthContext, EvalContext};
use crate::permissions::entity::Entity;
use crate::permissions::evaluator::{Evaluator, PredicateRequest};
use crate::permissions::filter::RowFilter;
use crate::permissions::form::{FormAttribute, PersistentType};
use crate::permissions::permission::PermissionSet;
use crate::permissions::policy::Policy;

pub const PROPERTY_CONDITION: &str = "condition";

#[derive(Debug, Deserialize)]
struct ConditionProperties {
    #[serde(default, deserialize_with = "deserialize_non_blank")]
    condition: Option<String>,
}

/// CEL 조건 평가기
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    name: String,
    types: Vec<String>,
    module: Option<String>,
}

impl ConditionEvaluator {
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

    /// 정책 조건 평가 (조건 누락/오류 = false)
    fn holds(&self, policy: &Policy, auth: &AuthContext) -> bool {
        let Some(properties) = decode_properties::<ConditionProperties>(&self.name, policy) else {
            return false;
        };
        let Some(condition) = properties.condition else {
            tracing::warn!("policy {} has no {} property", policy.id, PROPERTY_CONDITION);
            return false;
        };

        match eval_cel_bool(&condition, auth) {
            Ok(result) => result,
            Err(message) => {
                tracing::warn!("policy {} condition failed: {}", policy.id, message);
                false
            }
        }
    }
}

impl Evaluator for ConditionEvaluator {
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
        vec![PROPERTY_CONDITION]
    }

    fn form_attributes(&self) -> Vec<FormAttribute> {
        vec![FormAttribute::new(PROPERTY_CONDITION, PersistentType::Text)
            .required()
            .with_face_type("cel")]
    }

    fn get_predicate(
        &self,
        policy: &Policy,
        _request: &PredicateRequest<'_>,
        ctx: &EvalContext<'_>,
    ) -> Result<RowFilter> {
        Ok(if self.holds(policy, ctx.auth()) {
            RowFilter::Unrestricted
        } else {
            RowFilter::DenyAll
        })
    }

    fn matches(&self, policy: &Policy, _entity: &Entity, ctx: &EvalContext<'_>) -> Result<bool> {
        Ok(self.holds(policy, ctx.auth()))
    }

    fn get_authorities(&self, policy: &Policy, ctx: &EvalContext<'_>) -> Result<PermissionSet> {
        if self.holds(policy, ctx.auth()) {
            Ok(policy.permissions.clone())
        } else {
            Ok(PermissionSet::new())
        }
    }
}

fn eval_cel_bool(condition: &str, auth: &AuthContext) -> std::result::Result<bool, String> {
    let mut cel_ctx = Context::default();
    for (name, value) in auth.to_cel_variables() {
        cel_ctx.add_variable_from_value(name, json_to_cel(value));
    }

    let program = Program::compile(condition).map_err(|e| e.to_string())?;
    let result = program.execute(&cel_ctx).map_err(|e| e.to_string())?;

    match result {
        CelValue::Bool(b) => Ok(b),
        _ => Err("condition did not evaluate to bool".to_string()),
    }
}

fn json_to_cel(value: serde_json::Value) -> CelValue {
    match value {
        serde_json::Value::Null => CelValue::Null,
        serde_json::Value::Bool(b) => CelValue::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                CelValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                CelValue::UInt(u)
            } else if let Some(f) = n.as_f64() {
                CelValue::Float(f)
            } else {
                CelValue::Null
            }
        }
        serde_json::Value::String(s) => CelValue::String(s.into()),
        serde_json::Value::Array(arr) => {
            let values = arr.into_iter().map(json_to_cel).collect::<Vec<_>>();
            CelValue::List(Arc::new(values))
        }
        serde_json::Value::Object(map) => {
            let mut obj = HashMap::new();
            for (k, v) in map {
                obj.insert(cel_interpreter::objects::Key::from(k), json_to_cel(v));
            }
            CelValue::Map(cel_interpreter::objects::Map { map: Arc::new(obj) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::policy::RoleId;

    #[test]
    fn test_eval_cel_bool() {
        let auth = AuthContext::new("u1", vec![RoleId::new("helpdesk")]);

        assert_eq!(eval_cel_bool("'helpdesk' in request.auth.roles", &auth), Ok(true));
        assert_eq!(eval_cel_bool("request.auth.sub == 'u2'", &auth), Ok(false));
        assert!(eval_cel_bool("request.auth.sub", &auth).is_err());
        assert!(eval_cel_bool("((", &auth).is_err());
    }

    #[test]
    fn test_holds_fails_closed() {
        let evaluator = ConditionEvaluator::new("condition", ["identity"]);
        let auth = AuthContext::new("u1", vec![]);

        let missing = Policy::new("r", "identity", "condition");
        assert!(!evaluator.holds(&missing, &auth));

        let broken = Policy::new("r", "identity", "condition").with_property("condition", "((");
        assert!(!evaluator.holds(&broken, &auth));

        let ok = Policy::new("r", "identity", "condition")
            .with_property("condition", "request.auth.authenticated");
        assert!(evaluator.holds(&ok, &auth));
    }
}

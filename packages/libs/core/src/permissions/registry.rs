//! 평가기 레지스트리
//!
//! 부팅 시점에 builder로 평가기를 등록하고, `build()` 이후에는 변경하지 않습니다.
//! 완성된 레지스트리는 `Arc`로 공유되어 동시에 읽기 전용으로 조회됩니다.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::evaluator::{Evaluator, EvaluatorDescriptor};
use super::policy::Policy;
use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// 평가기 레지스트리
pub struct EvaluatorRegistry {
    evaluators: BTreeMap<String, Arc<dyn Evaluator>>,
    by_type: HashMap<String, Vec<String>>,
    disabled: HashMap<String, bool>,
}

/// 레지스트리 builder
pub struct EvaluatorRegistryBuilder {
    config: EngineConfig,
    evaluators: BTreeMap<String, Arc<dyn Evaluator>>,
}

impl EvaluatorRegistryBuilder {
    /// 평가기 등록
    ///
    /// 같은 이름이 이미 등록되어 있으면 설정 오류입니다.
    pub fn register(mut self, evaluator: impl Evaluator + 'static) -> Result<Self> {
        self.register_arc(Arc::new(evaluator))?;
        Ok(self)
    }

    /// 이미 공유된 평가기 등록
    pub fn register_arc(&mut self, evaluator: Arc<dyn Evaluator>) -> Result<()> {
        let name = evaluator.name().to_string();
        if self.evaluators.contains_key(&name) {
            return Err(Error::DuplicateEvaluator { name });
        }
        tracing::debug!("registering evaluator {}", name);
        self.evaluators.insert(name, evaluator);
        Ok(())
    }

    /// 레지스트리 완성
    pub fn build(self) -> EvaluatorRegistry {
        let mut by_type: HashMap<String, Vec<String>> = HashMap::new();
        let mut disabled = HashMap::new();

        for (name, evaluator) in &self.evaluators {
            for entity_type in evaluator.supported_types() {
                by_type
                    .entry(entity_type.clone())
                    .or_default()
                    .push(name.clone());
            }

            let is_disabled = evaluator.is_disableable()
                && (self.config.disabled_evaluators.contains(name)
                    || evaluator
                        .module()
                        .map(|m| self.config.is_module_disabled(m))
                        .unwrap_or(false));
            if is_disabled {
                tracing::info!("evaluator {} is disabled by configuration", name);
            }
            disabled.insert(name.clone(), is_disabled);
        }

        EvaluatorRegistry {
            evaluators: self.evaluators,
            by_type,
            disabled,
        }
    }
}

impl EvaluatorRegistry {
    /// builder 생성
    pub fn builder(config: &EngineConfig) -> EvaluatorRegistryBuilder {
        EvaluatorRegistryBuilder {
            config: config.clone(),
            evaluators: BTreeMap::new(),
        }
    }

    /// 이름으로 조회
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Evaluator>> {
        self.evaluators.get(name)
    }

    /// 타입을 지원하는 평가기 이름 목록
    pub fn for_type(&self, entity_type: &str) -> Vec<&str> {
        self.by_type
            .get(entity_type)
            .map(|names| names.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// 비활성화 여부 (등록되지 않은 이름은 false)
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.get(name).copied().unwrap_or(false)
    }

    /// 평가기 설명
    pub fn descriptor(&self, name: &str) -> Option<EvaluatorDescriptor> {
        let evaluator = self.evaluators.get(name)?;
        Some(EvaluatorDescriptor {
            name: name.to_string(),
            supported_types: evaluator.supported_types().to_vec(),
            property_names: evaluator
                .property_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            form_attributes: evaluator.form_attributes(),
            module: evaluator.module().map(str::to_string),
            disableable: evaluator.is_disableable(),
            disabled: self.is_disabled(name),
            supports_permissions: evaluator.supports_permissions(),
        })
    }

    /// 전체 평가기 설명 (이름 순)
    pub fn descriptors(&self) -> Vec<EvaluatorDescriptor> {
        self.evaluators
            .keys()
            .filter_map(|name| self.descriptor(name))
            .collect()
    }

    /// 정책 구성 검증
    ///
    /// 평가기 존재, 타입 지원, 속성 키를 확인하고 해당 평가기를 반환합니다.
    pub fn validate_policy(&self, policy: &Policy) -> Result<&Arc<dyn Evaluator>> {
        let evaluator = self
            .evaluators
            .get(&policy.evaluator)
            .ok_or_else(|| Error::UnknownEvaluator {
                name: policy.evaluator.clone(),
                policy: policy.id.clone(),
            })?;

        if !evaluator.supports(&policy.authorizable_type) {
            return Err(Error::UnsupportedType {
                evaluator: policy.evaluator.clone(),
                entity_type: policy.authorizable_type.clone(),
            });
        }

        if let Some(property) = unknown_property(evaluator.as_ref(), policy) {
            return Err(Error::UnknownProperty {
                evaluator: policy.evaluator.clone(),
                property: property.to_string(),
            });
        }

        Ok(evaluator)
    }

    /// 여러 정책 일괄 검증 (부팅 시)
    ///
    /// 정책 id 중복도 설정 오류입니다.
    pub fn validate_policies<'p, I>(&self, policies: I) -> Result<()>
    where
        I: IntoIterator<Item = &'p Policy>,
    {
        let mut seen = HashSet::new();
        for policy in policies {
            if !seen.insert(policy.id.as_str()) {
                return Err(Error::DuplicatePolicy {
                    id: policy.id.clone(),
                });
            }
            self.validate_policy(policy)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}

/// 평가기가 받지 않는 속성 키
pub(crate) fn unknown_property<'p>(evaluator: &dyn Evaluator, policy: &'p Policy) -> Option<&'p str> {
    let allowed = evaluator.property_names();
    policy
        .properties
        .keys()
        .map(String::as_str)
        .find(|key| !allowed.contains(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::evaluators::{BasicEvaluator, TransitiveEvaluator, UuidEvaluator};
    use crate::schema::OwnerReference;

    fn registry(config: &EngineConfig) -> EvaluatorRegistry {
        EvaluatorRegistry::builder(config)
            .register(BasicEvaluator::new("basic", ["identity", "code_list"]).with_module("core"))
            .unwrap()
            .register(UuidEvaluator::new("uuid", ["identity"]).with_module("acc"))
            .unwrap()
            .register(TransitiveEvaluator::new(
                "code_list_item_transitive",
                "code_list_item",
                OwnerReference::new("code_list", "code_list_id"),
            ))
            .unwrap()
            .build()
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = EvaluatorRegistry::builder(&EngineConfig::default())
            .register(BasicEvaluator::new("basic", ["identity"]))
            .unwrap()
            .register(BasicEvaluator::new("basic", ["role"]));

        assert!(matches!(result, Err(Error::DuplicateEvaluator { .. })));
    }

    #[test]
    fn test_lookup_by_type() {
        let registry = registry(&EngineConfig::default());
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.for_type("identity"), vec!["basic", "uuid"]);
        assert_eq!(registry.for_type("code_list_item"), vec!["code_list_item_transitive"]);
        assert!(registry.for_type("unknown").is_empty());
    }

    #[test]
    fn test_disabled_by_module_and_name() {
        let config = EngineConfig::default()
            .with_disabled_module("acc")
            .with_disabled_evaluator("code_list_item_transitive");
        let registry = registry(&config);

        assert!(registry.is_disabled("uuid"));
        assert!(!registry.is_disabled("basic"));
        // 비활성화 불가능한 평가기는 설정과 무관하게 실행
        assert!(!registry.is_disabled("code_list_item_transitive"));
    }

    #[test]
    fn test_descriptor() {
        let registry = registry(&EngineConfig::default());
        let descriptor = registry.descriptor("uuid").unwrap();

        assert_eq!(descriptor.property_names, vec!["uuid".to_string()]);
        assert_eq!(descriptor.module.as_deref(), Some("acc"));
        assert!(descriptor.supports_permissions);

        let transitive = registry.descriptor("code_list_item_transitive").unwrap();
        assert!(!transitive.disableable);
        assert!(!transitive.supports_permissions);
        assert_eq!(registry.descriptors().len(), 3);
    }

    #[test]
    fn test_validate_policy() {
        let registry = registry(&EngineConfig::default());

        let ok = Policy::new("r", "identity", "uuid").with_property("uuid", "x");
        assert!(registry.validate_policy(&ok).is_ok());

        let unknown = Policy::new("r", "identity", "missing");
        assert!(matches!(
            registry.validate_policy(&unknown),
            Err(Error::UnknownEvaluator { .. })
        ));

        let unsupported = Policy::new("r", "role", "uuid");
        assert!(matches!(
            registry.validate_policy(&unsupported),
            Err(Error::UnsupportedType { .. })
        ));

        let bad_property = Policy::new("r", "identity", "uuid").with_property("colour", "red");
        assert!(matches!(
            registry.validate_policy(&bad_property),
            Err(Error::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_validate_policies_rejects_duplicate_ids() {
        let registry = registry(&EngineConfig::default());
        let policies = vec![
            Policy::new("a", "identity", "basic").with_id("p"),
            Policy::new("b", "identity", "basic").with_id("p"),
        ];

        assert!(matches!(
            registry.validate_policies(&policies),
            Err(Error::DuplicatePolicy { id }) if id == "p"
        ));
        assert!(registry.validate_policies(&policies[..1]).is_ok());
    }
}

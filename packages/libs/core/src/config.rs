//! 엔진 설정
//!
//! 위임 깊이 제한, 비활성화된 모듈/평가기, 기본 role을 정의합니다.
//! YAML 문서 또는 환경변수에서 로드할 수 있습니다.

use std::collections::BTreeSet;
use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 기본 위임 깊이 제한
pub const DEFAULT_MAX_DELEGATION_DEPTH: usize = 16;

/// 엔진 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 위임(transitive) 평가 최대 깊이
    pub max_delegation_depth: usize,

    /// 비활성화된 기능 모듈
    pub disabled_modules: BTreeSet<String>,

    /// 이름으로 비활성화된 평가기
    pub disabled_evaluators: BTreeSet<String>,

    /// 인증된 모든 주체가 암묵적으로 가지는 role
    pub default_role: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_delegation_depth: DEFAULT_MAX_DELEGATION_DEPTH,
            disabled_modules: BTreeSet::new(),
            disabled_evaluators: BTreeSet::new(),
            default_role: None,
        }
    }
}

impl EngineConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        let max_delegation_depth = match env::var("IDG_AUTHZ_MAX_DEPTH") {
            Ok(value) => value.trim().parse().map_err(|_| Error::ConfigInvalid {
                message: format!("IDG_AUTHZ_MAX_DEPTH is not a number: {}", value),
            })?,
            Err(_) => DEFAULT_MAX_DELEGATION_DEPTH,
        };

        let config = Self {
            max_delegation_depth,
            disabled_modules: env::var("IDG_AUTHZ_DISABLED_MODULES")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            disabled_evaluators: env::var("IDG_AUTHZ_DISABLED_EVALUATORS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            default_role: env::var("IDG_AUTHZ_DEFAULT_ROLE")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// YAML 문자열에서 설정 로드
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.max_delegation_depth == 0 {
            return Err(Error::ConfigInvalid {
                message: "max_delegation_depth must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// 모듈 비활성화 여부
    pub fn is_module_disabled(&self, module: &str) -> bool {
        self.disabled_modules.contains(module)
    }

    pub fn with_disabled_module(mut self, module: impl Into<String>) -> Self {
        self.disabled_modules.insert(module.into());
        self
    }

    pub fn with_disabled_evaluator(mut self, name: impl Into<String>) -> Self {
        self.disabled_evaluators.insert(name.into());
        self
    }

    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = Some(role.into());
        self
    }

    pub fn with_max_delegation_depth(mut self, depth: usize) -> Self {
        self.max_delegation_depth = depth;
        self
    }
}

/// 쉼표 구분 목록 파싱 (공백 제거, 빈 항목 무시)
fn split_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_defaults() {
        let config = EngineConfig::from_yaml("disabled_modules: [vs]").unwrap();
        assert_eq!(config.max_delegation_depth, DEFAULT_MAX_DELEGATION_DEPTH);
        assert!(config.is_module_disabled("vs"));
        assert!(!config.is_module_disabled("acc"));
        assert!(config.default_role.is_none());
    }

    #[test]
    fn test_zero_depth_rejected() {
        let result = EngineConfig::from_yaml("max_delegation_depth: 0");
        assert!(matches!(result, Err(Error::ConfigInvalid { .. })));
    }

    #[test]
    fn test_split_list() {
        let list = split_list(" acc, ,vs,, rpt ");
        assert_eq!(list.len(), 3);
        assert!(list.contains("acc"));
        assert!(list.contains("rpt"));
    }
}

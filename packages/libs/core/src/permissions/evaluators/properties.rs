//! 정책 속성 디코딩
//!
//! 정책의 속성 맵을 평가기별 타입 구조체로 변환합니다.
//! 변환에 실패한 정책은 아무 권한도 부여하지 않습니다 (fail-closed).

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{self, DeserializeOwned, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::permissions::policy::Policy;

/// 속성 맵을 타입 구조체로 디코딩
///
/// 실패하면 경고를 남기고 None을 반환합니다.
pub(crate) fn decode_properties<T: DeserializeOwned>(evaluator: &str, policy: &Policy) -> Option<T> {
    match serde_json::from_value(Value::Object(policy.properties.clone())) {
        Ok(properties) => Some(properties),
        Err(e) => {
            tracing::warn!(
                "policy {} has unresolvable properties for evaluator {}: {}",
                policy.id,
                evaluator,
                e
            );
            None
        }
    }
}

/// 코드 화이트리스트
///
/// 비어있으면 모든 코드를 허용합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeSet(BTreeSet<String>);

impl CodeSet {
    /// 쉼표 구분 문자열 파싱 (공백 제거, 빈 항목 무시)
    pub fn parse(value: &str) -> Self {
        CodeSet(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 코드 허용 여부
    pub fn accepts(&self, code: &str) -> bool {
        self.0.is_empty() || self.0.contains(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }
}

impl<'de> Deserialize<'de> for CodeSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CodeSetVisitor;

        impl<'de> Visitor<'de> for CodeSetVisitor {
            type Value = CodeSet;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a comma separated string or a sequence of codes")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(CodeSet::parse(value))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut codes = BTreeSet::new();
                while let Some(code) = seq.next_element::<String>()? {
                    let code = code.trim();
                    if !code.is_empty() {
                        codes.insert(code.to_string());
                    }
                }
                Ok(CodeSet(codes))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(CodeSet::default())
            }
        }

        deserializer.deserialize_any(CodeSetVisitor)
    }
}

/// 불리언 속성 (`true` 또는 `"true"`)
pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a boolean or a boolean string")
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            match value.trim().to_lowercase().as_str() {
                "true" => Ok(true),
                "false" | "" => Ok(false),
                other => Err(E::custom(format!("invalid boolean: {}", other))),
            }
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(false)
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}

/// 빈 문자열은 None으로 취급
pub(crate) fn deserialize_non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

//! 권한 토큰
//!
//! 권한은 문자열 상수이며 동등 비교만 지원합니다.
//! `ADMIN`도 다른 권한을 포함하지 않습니다.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 권한 토큰
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Permission(Cow<'static, str>);

/// 권한 집합
pub type PermissionSet = BTreeSet<Permission>;

impl Permission {
    pub const READ: Permission = Permission(Cow::Borrowed("READ"));
    pub const CREATE: Permission = Permission(Cow::Borrowed("CREATE"));
    pub const UPDATE: Permission = Permission(Cow::Borrowed("UPDATE"));
    pub const DELETE: Permission = Permission(Cow::Borrowed("DELETE"));
    pub const AUTOCOMPLETE: Permission = Permission(Cow::Borrowed("AUTOCOMPLETE"));
    pub const COUNT: Permission = Permission(Cow::Borrowed("COUNT"));
    pub const EXECUTE: Permission = Permission(Cow::Borrowed("EXECUTE"));
    pub const ADMIN: Permission = Permission(Cow::Borrowed("ADMIN"));

    /// 문자열에서 생성 (공백 제거 + 대문자 정규화)
    pub fn new(name: &str) -> Self {
        Permission(Cow::Owned(name.trim().to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Permission::new(value)
    }
}

impl Serialize for Permission {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Permission::new(&value))
    }
}

/// 권한 집합 생성
pub fn permission_set<I>(permissions: I) -> PermissionSet
where
    I: IntoIterator<Item = Permission>,
{
    permissions.into_iter().collect()
}

/// 쉼표 구분 문자열을 권한 집합으로 파싱
pub fn parse_permissions(value: &str) -> PermissionSet {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Permission::new)
        .collect()
}

/// 권한 집합 deserializer
///
/// 목록(`[READ, UPDATE]`)과 쉼표 구분 문자열(`"READ, UPDATE"`)을 모두 허용합니다.
pub(crate) fn deserialize_permission_set<'de, D>(deserializer: D) -> Result<PermissionSet, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct PermissionSetVisitor;

    impl<'de> Visitor<'de> for PermissionSetVisitor {
        type Value = PermissionSet;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a sequence of permissions or a comma separated string")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(parse_permissions(value))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut set = PermissionSet::new();
            while let Some(permission) = seq.next_element::<Permission>()? {
                set.insert(permission);
            }
            Ok(set)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(PermissionSet::new())
        }
    }

    deserializer.deserialize_any(PermissionSetVisitor)
}

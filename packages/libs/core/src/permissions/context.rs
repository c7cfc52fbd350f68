//! 평가 컨텍스트
//!
//! 현재 주체, role, 위임 깊이를 평가기에 전달합니다.
//! 위임 평가기는 이 컨텍스트를 통해 manager를 재귀 호출합니다.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::Entity;
use super::filter::RowFilter;
use super::manager::AuthorizationManager;
use super::permission::{Permission, PermissionSet};
use super::policy::RoleId;
use super::provider::EntityAccessor;
use crate::error::{Error, Result};

/// 인증 컨텍스트
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// 주체 ID (익명이면 None)
    pub sub: Option<String>,

    /// Role 목록
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl AuthContext {
    /// 새 인증 컨텍스트 생성
    pub fn new(sub: impl Into<String>, roles: Vec<RoleId>) -> Self {
        Self {
            sub: Some(sub.into()),
            roles,
        }
    }

    /// 익명 컨텍스트
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 인증되었는지 확인
    pub fn is_authenticated(&self) -> bool {
        self.sub.is_some()
    }

    /// 특정 role을 가지고 있는지 확인
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }

    /// CEL 평가를 위한 Map으로 변환
    ///
    /// - `request.auth.sub`: 주체 ID
    /// - `request.auth.roles`: Role 목록
    pub fn to_cel_variables(&self) -> HashMap<String, Value> {
        let mut vars = HashMap::new();

        // request.auth
        let mut auth_obj = serde_json::Map::new();
        if let Some(sub) = &self.sub {
            auth_obj.insert("sub".to_string(), Value::String(sub.clone()));
        }
        auth_obj.insert(
            "roles".to_string(),
            Value::Array(
                self.roles
                    .iter()
                    .map(|r| Value::String(r.as_str().to_string()))
                    .collect(),
            ),
        );
        auth_obj.insert("authenticated".to_string(), Value::Bool(self.is_authenticated()));

        // request 객체
        let mut request_obj = serde_json::Map::new();
        request_obj.insert("auth".to_string(), Value::Object(auth_obj));

        vars.insert("request".to_string(), Value::Object(request_obj));
        vars
    }
}

/// 평가기에 전달되는 컨텍스트
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    manager: &'a AuthorizationManager,
    auth: &'a AuthContext,
    depth: usize,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(manager: &'a AuthorizationManager, auth: &'a AuthContext) -> Self {
        Self {
            manager,
            auth,
            depth: 0,
        }
    }

    /// 인증 정보
    pub fn auth(&self) -> &'a AuthContext {
        self.auth
    }

    /// 현재 주체 ID
    pub fn principal_id(&self) -> Option<&'a str> {
        self.auth.sub.as_deref()
    }

    /// 현재 위임 깊이 (최상위 호출 = 0)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 엔티티 조회기
    pub fn entities(&self) -> &'a dyn EntityAccessor {
        self.manager.entities()
    }

    /// 한 단계 아래 컨텍스트
    ///
    /// 설정된 최대 깊이를 넘으면 설정 오류로 즉시 실패합니다.
    pub fn descend(&self, entity_type: &str) -> Result<EvalContext<'a>> {
        let depth = self.depth + 1;
        if depth > self.manager.config().max_delegation_depth {
            return Err(Error::DelegationDepthExceeded {
                entity_type: entity_type.to_string(),
                depth,
            });
        }
        Ok(Self {
            manager: self.manager,
            auth: self.auth,
            depth,
        })
    }

    /// 다른 타입의 행 필터를 manager에 위임
    pub fn delegate_predicate(
        &self,
        entity_type: &str,
        permissions: &[Permission],
    ) -> Result<RowFilter> {
        let child = self.descend(entity_type)?;
        self.manager.predicate_in(&child, entity_type, permissions)
    }

    /// 다른 엔티티의 권한 집합을 manager에 위임
    pub fn delegate_permissions(&self, entity: &Entity) -> Result<PermissionSet> {
        let child = self.descend(&entity.entity_type)?;
        self.manager.permissions_in(&child, entity)
    }
}

impl std::fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("auth", self.auth)
            .field("depth", &self.depth)
            .finish()
    }
}

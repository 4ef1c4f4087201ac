//! Audit log entity
//!
//! Append-only record of administrative mutations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: u64,
    /// User who performed the mutation
    pub user_id: String,
    /// Permission, RolePermission, UserPermission, RoutePermission, RoutePermissionMap, SystemConfig
    pub entity: String,
    pub entity_id: String,
    /// CREATE, UPDATE, DELETE
    pub action: String,
    /// Before/after state in JSON format
    #[sea_orm(column_type = "Text", nullable)]
    pub change_details: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

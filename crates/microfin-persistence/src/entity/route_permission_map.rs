//! Route policy entity
//!
//! One row per exposed route, keyed by `METHOD:/path/:param`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "route_permission_map")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub route_key: String,
    pub method: String,
    pub path: String,
    pub route_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub route_description: Option<String>,
    pub category: Option<String>,
    pub requires_auth: bool,
    pub only_primary_role: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

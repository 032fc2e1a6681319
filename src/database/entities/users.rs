use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const LEVEL_USER: i32 = 1;
pub const LEVEL_STAFF: i32 = 50;
pub const LEVEL_ADMIN: i32 = 100;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub level: i32,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::person_contacts::Entity")]
    PersonContacts,
}

impl Related<super::person_contacts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PersonContacts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_staff(&self) -> bool {
        self.level >= LEVEL_STAFF
    }

    pub fn is_admin(&self) -> bool {
        self.level >= LEVEL_ADMIN
    }
}

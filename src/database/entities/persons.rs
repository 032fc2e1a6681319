use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::reconcile::HasId;

/// Legal type assigned to persons created by the import pipeline
pub const LEGAL_TYPE_IMPORTED: i32 = 6;

/// An organisation or location goods are sent from or delivered to
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "persons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub city_id: i32,
    pub person_type_id: Option<i32>,
    pub parent_id: Option<i32>,
    pub legal_type: i32,
    pub priority: i32,
    pub export_ignore: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cities::Entity",
        from = "Column::CityId",
        to = "super::cities::Column::Id"
    )]
    Cities,
    #[sea_orm(
        belongs_to = "super::person_types::Entity",
        from = "Column::PersonTypeId",
        to = "super::person_types::Column::Id"
    )]
    PersonTypes,
    #[sea_orm(has_many = "super::person_contacts::Entity")]
    PersonContacts,
}

impl Related<super::cities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cities.def()
    }
}

impl Related<super::person_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PersonTypes.def()
    }
}

impl Related<super::person_contacts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PersonContacts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl HasId for Model {
    fn id(&self) -> i32 {
        self.id
    }
}

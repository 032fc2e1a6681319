use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Derived per-destination totals for one (product, unit) pair
///
/// Rows are rewritten wholesale by the consolidation recompute and never
/// incremented in place.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_consolidated")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub destination_id: i32,
    pub product_id: i32,
    pub unit_id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 3)))")]
    pub request_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 3)))")]
    pub supply_reserve_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 3)))")]
    pub supply_transport_quantity: Decimal,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::persons::Entity",
        from = "Column::DestinationId",
        to = "super::persons::Column::Id"
    )]
    Destination,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Products,
    #[sea_orm(
        belongs_to = "super::units::Entity",
        from = "Column::UnitId",
        to = "super::units::Column::Id"
    )]
    Units,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::units::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Units.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn has_quantity(&self) -> bool {
        !self.request_quantity.is_zero()
            || !self.supply_reserve_quantity.is_zero()
            || !self.supply_transport_quantity.is_zero()
    }
}

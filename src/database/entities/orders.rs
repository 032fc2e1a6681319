use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::reconcile::HasId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[sea_orm(num_value = 1)]
    Request,
    #[sea_orm(num_value = 2)]
    Supply,
}

impl OrderType {
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::Request => "Request",
            OrderType::Supply => "Supply",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(num_value = 1)]
    New,
    #[sea_orm(num_value = 2)]
    UnderReview,
    /// Never persisted: rewritten to `Processed` on save
    #[sea_orm(num_value = 3)]
    ReviewOk,
    #[sea_orm(num_value = 4)]
    Processed,
    #[sea_orm(num_value = 5)]
    Canceled,
    #[sea_orm(num_value = 6)]
    Delivered,
}

impl OrderStatus {
    /// Statuses a non-staff user may set
    pub const ACCOUNT_SETTABLE: [OrderStatus; 2] = [OrderStatus::New, OrderStatus::Canceled];

    /// Status written for orders created by the import pipeline
    pub const IMPORTED: OrderStatus = OrderStatus::Processed;

    /// Review approval immediately finalizes the order
    pub fn normalized(self) -> Self {
        match self {
            OrderStatus::ReviewOk => OrderStatus::Processed,
            other => other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_type: OrderType,
    pub status: OrderStatus,
    /// Imported orders have no origin, contacts or creator
    pub origin_id: Option<i32>,
    pub origin_contact_id: Option<i32>,
    pub destination_id: i32,
    pub destination_contact_id: Option<i32>,
    pub category_id: Option<i32>,
    pub effective_date: Date,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub internal_notes: Option<String>,
    pub needs_review: bool,
    pub creator_id: Option<i32>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_line_items::Entity")]
    OrderLineItems,
    #[sea_orm(has_many = "super::order_history::Entity")]
    OrderHistory,
    #[sea_orm(
        belongs_to = "super::persons::Entity",
        from = "Column::DestinationId",
        to = "super::persons::Column::Id"
    )]
    Destination,
    #[sea_orm(
        belongs_to = "super::persons::Entity",
        from = "Column::OriginId",
        to = "super::persons::Column::Id"
    )]
    Origin,
    #[sea_orm(
        belongs_to = "super::order_categories::Entity",
        from = "Column::CategoryId",
        to = "super::order_categories::Column::Id"
    )]
    OrderCategories,
}

impl Related<super::order_line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLineItems.def()
    }
}

impl Related<super::order_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderHistory.def()
    }
}

impl Related<super::order_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderCategories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl HasId for Model {
    fn id(&self) -> i32 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_ok_normalizes_to_processed() {
        assert_eq!(OrderStatus::ReviewOk.normalized(), OrderStatus::Processed);
        assert_eq!(OrderStatus::New.normalized(), OrderStatus::New);
        assert_eq!(OrderStatus::Canceled.normalized(), OrderStatus::Canceled);
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&OrderStatus::UnderReview).unwrap();
        assert_eq!(json, "\"UNDER_REVIEW\"");
        let parsed: OrderType = serde_json::from_str("\"SUPPLY\"").unwrap();
        assert_eq!(parsed, OrderType::Supply);
    }
}

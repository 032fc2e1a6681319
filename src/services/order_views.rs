//! Role-specific projections of an order
//!
//! Staff see review and internal fields; account users get the public subset.
//! The projection is picked from [`Role`] once, at the boundary.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[cfg(feature = "server")]
use utoipa::ToSchema;

use super::access::Role;
use crate::database::entities::{order_line_items, orders, OrderStatus, OrderType};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    pub id: i32,
    pub product_id: i32,
    pub unit_id: i32,
    pub quantity: Decimal,
    pub notes: Option<String>,
}

impl From<order_line_items::Model> for LineItemView {
    fn from(item: order_line_items::Model) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            unit_id: item.unit_id,
            quantity: item.quantity,
            notes: item.notes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AccountOrderView {
    pub id: i32,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub origin_id: Option<i32>,
    pub origin_contact_id: Option<i32>,
    pub destination_id: i32,
    pub destination_contact_id: Option<i32>,
    pub category_id: Option<i32>,
    pub effective_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub line_items: Vec<LineItemView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct StaffOrderView {
    pub id: i32,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub origin_id: Option<i32>,
    pub origin_contact_id: Option<i32>,
    pub destination_id: i32,
    pub destination_contact_id: Option<i32>,
    pub category_id: Option<i32>,
    pub effective_date: NaiveDate,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
    pub needs_review: bool,
    pub creator_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub line_items: Vec<LineItemView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(untagged)]
pub enum OrderView {
    Staff(StaffOrderView),
    Account(AccountOrderView),
}

impl OrderView {
    pub fn project(
        role: Role,
        order: orders::Model,
        items: Vec<order_line_items::Model>,
    ) -> Self {
        let line_items = items.into_iter().map(LineItemView::from).collect();
        match role {
            Role::Staff => OrderView::Staff(StaffOrderView {
                id: order.id,
                order_type: order.order_type,
                status: order.status,
                origin_id: order.origin_id,
                origin_contact_id: order.origin_contact_id,
                destination_id: order.destination_id,
                destination_contact_id: order.destination_contact_id,
                category_id: order.category_id,
                effective_date: order.effective_date,
                notes: order.notes,
                internal_notes: order.internal_notes,
                needs_review: order.needs_review,
                creator_id: order.creator_id,
                created_at: order.created_at,
                updated_at: order.updated_at,
                line_items,
            }),
            Role::Account => OrderView::Account(AccountOrderView {
                id: order.id,
                order_type: order.order_type,
                status: order.status,
                origin_id: order.origin_id,
                origin_contact_id: order.origin_contact_id,
                destination_id: order.destination_id,
                destination_contact_id: order.destination_contact_id,
                category_id: order.category_id,
                effective_date: order.effective_date,
                notes: order.notes,
                created_at: order.created_at,
                updated_at: order.updated_at,
                line_items,
            }),
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            OrderView::Staff(view) => view.id,
            OrderView::Account(view) => view.id,
        }
    }

    pub fn line_items(&self) -> &[LineItemView] {
        match self {
            OrderView::Staff(view) => &view.line_items,
            OrderView::Account(view) => &view.line_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> orders::Model {
        let now = Utc::now();
        orders::Model {
            id: 9,
            order_type: OrderType::Request,
            status: OrderStatus::New,
            origin_id: Some(1),
            origin_contact_id: Some(1),
            destination_id: 2,
            destination_contact_id: Some(2),
            category_id: None,
            effective_date: NaiveDate::from_ymd_opt(2020, 5, 3).unwrap(),
            notes: Some("urgent".to_string()),
            internal_notes: Some("call the director".to_string()),
            needs_review: true,
            creator_id: Some(4),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_account_projection_hides_internal_fields() {
        let view = OrderView::project(Role::Account, sample_order(), vec![]);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["type"], "REQUEST");
        assert!(json.get("internalNotes").is_none());
        assert!(json.get("needsReview").is_none());
    }

    #[test]
    fn test_staff_projection_includes_internal_fields() {
        let view = OrderView::project(Role::Staff, sample_order(), vec![]);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["internalNotes"], "call the director");
        assert_eq!(json["needsReview"], true);
        assert_eq!(view.id(), 9);
    }
}

//! Consolidated quantities per destination

mod common;

use aidlink::database::entities::*;
use aidlink::services::{ConsolidatedFilter, ConsolidationService, OrderService};
use anyhow::Result;
use common::*;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

async fn place(
    service: &OrderService,
    world: &World,
    order_type: OrderType,
    status: OrderStatus,
    product_id: i32,
    quantity: i64,
) -> Result<i32> {
    let mut payload = request_payload(world, vec![item(product_id, dec(quantity))]);
    payload.order_type = order_type;
    payload.status = status;
    Ok(service.save_order(&world.staff, None, payload).await?)
}

async fn water_row(db: &sea_orm::DatabaseConnection, world: &World) -> Result<order_consolidated::Model> {
    Ok(order_consolidated::Entity::find()
        .filter(order_consolidated::Column::DestinationId.eq(world.destination_id))
        .filter(order_consolidated::Column::ProductId.eq(world.water_id))
        .one(db)
        .await?
        .expect("consolidated row for water"))
}

#[tokio::test]
async fn test_quantities_are_bucketed_by_type_and_status() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let orders = OrderService::new(db.clone());

    place(&orders, &world, OrderType::Request, OrderStatus::New, world.water_id, 5).await?;
    place(&orders, &world, OrderType::Request, OrderStatus::Processed, world.water_id, 3).await?;
    place(&orders, &world, OrderType::Request, OrderStatus::Canceled, world.water_id, 7).await?;
    place(&orders, &world, OrderType::Supply, OrderStatus::New, world.water_id, 2).await?;
    place(&orders, &world, OrderType::Supply, OrderStatus::UnderReview, world.water_id, 1).await?;
    place(&orders, &world, OrderType::Supply, OrderStatus::Processed, world.water_id, 4).await?;
    place(&orders, &world, OrderType::Supply, OrderStatus::Delivered, world.water_id, 9).await?;

    let row = water_row(&db, &world).await?;
    assert_eq!(row.unit_id, world.litre_id);
    assert_eq!(row.request_quantity, dec(8));
    assert_eq!(row.supply_reserve_quantity, dec(3));
    assert_eq!(row.supply_transport_quantity, dec(4));

    Ok(())
}

#[tokio::test]
async fn test_recompute_is_idempotent() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let orders = OrderService::new(db.clone());

    place(&orders, &world, OrderType::Request, OrderStatus::New, world.water_id, 5).await?;
    place(&orders, &world, OrderType::Request, OrderStatus::New, world.blanket_id, 2).await?;

    let consolidation = ConsolidationService::new(db.clone());
    let summary = consolidation.recompute_for_destination(world.destination_id).await?;
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unchanged, 2);

    let rows = order_consolidated::Entity::find()
        .filter(order_consolidated::Column::DestinationId.eq(world.destination_id))
        .all(&db)
        .await?;
    assert_eq!(rows.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_recompute_only_touches_its_destination() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let orders = OrderService::new(db.clone());

    place(&orders, &world, OrderType::Request, OrderStatus::New, world.water_id, 5).await?;
    let before = water_row(&db, &world).await?;

    let summary = ConsolidationService::new(db.clone())
        .recompute_for_destination(world.other_destination_id)
        .await?;
    assert_eq!(summary.inserted + summary.updated + summary.zeroed + summary.unchanged, 0);
    assert_eq!(water_row(&db, &world).await?, before);

    Ok(())
}

#[tokio::test]
async fn test_canceling_an_order_zeroes_the_row() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let orders = OrderService::new(db.clone());

    let id = place(&orders, &world, OrderType::Request, OrderStatus::New, world.water_id, 5).await?;
    let mut canceled = request_payload(&world, vec![item(world.water_id, dec(5))]);
    canceled.status = OrderStatus::Canceled;
    orders.save_order(&world.account, Some(id), canceled).await?;

    let row = water_row(&db, &world).await?;
    assert_eq!(row.request_quantity, Decimal::ZERO);
    assert_eq!(row.supply_reserve_quantity, Decimal::ZERO);

    Ok(())
}

#[tokio::test]
async fn test_list_filters_and_visibility() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let orders = OrderService::new(db.clone());

    place(&orders, &world, OrderType::Request, OrderStatus::New, world.water_id, 5).await?;
    place(&orders, &world, OrderType::Request, OrderStatus::New, world.blanket_id, 2).await?;
    let mut elsewhere = request_payload(&world, vec![item(world.water_id, dec(4))]);
    elsewhere.destination_id = world.other_destination_id;
    elsewhere.destination_contact_id = world.other_destination_contact_id;
    orders.save_order(&world.staff, None, elsewhere).await?;

    let consolidation = ConsolidationService::new(db.clone());

    let (rows, meta) = consolidation.list(&world.staff, &ConsolidatedFilter::default()).await?;
    assert_eq!(meta.total, 3);
    assert_eq!(rows.len(), 3);

    let (rows, _) = consolidation.list(&world.account, &ConsolidatedFilter::default()).await?;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.destination_id == world.destination_id));

    let by_name = ConsolidatedFilter {
        q: Some("cob".to_string()),
        ..Default::default()
    };
    let (rows, _) = consolidation.list(&world.staff, &by_name).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product_name, "Cobertor");
    assert_eq!(rows[0].unit_name, "Unidade(s)");
    assert_eq!(rows[0].destination_city, "Canoas");
    assert_eq!(rows[0].person_type.as_deref(), Some("Shelter"));

    Ok(())
}

#[tokio::test]
async fn test_show_only_with_quantity_hides_zeroed_rows() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let orders = OrderService::new(db.clone());

    let id = place(&orders, &world, OrderType::Request, OrderStatus::New, world.water_id, 5).await?;
    place(&orders, &world, OrderType::Request, OrderStatus::New, world.blanket_id, 2).await?;
    orders.delete_order(&world.staff, id).await?;

    let consolidation = ConsolidationService::new(db.clone());
    let all = consolidation
        .export_rows(&world.staff, &ConsolidatedFilter::default())
        .await?;
    assert_eq!(all.len(), 2);

    let with_quantity = ConsolidatedFilter {
        show_only_with_quantity: true,
        ..Default::default()
    };
    let rows = consolidation.export_rows(&world.staff, &with_quantity).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product_id, world.blanket_id);

    Ok(())
}

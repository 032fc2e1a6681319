//! CSV import pipelines

mod common;

use aidlink::database::entities::persons::LEGAL_TYPE_IMPORTED;
use aidlink::database::entities::*;
use aidlink::errors::ImportError;
use aidlink::reconcile::{AnomalyLevel, MatchStyle, MemoryAnomalyLog, Reconciler};
use aidlink::services::{OrderImportService, ReferenceImportService};
use anyhow::Result;
use common::*;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;

const HEADER: &str = "city,person_type,person,priority,unit,product,consumable,quantity,notes\n";

fn order_importer(db: &DatabaseConnection) -> (OrderImportService, Arc<MemoryAnomalyLog>) {
    let log = Arc::new(MemoryAnomalyLog::new());
    let reconciler = Reconciler::new(MatchStyle::Like, log.clone());
    (OrderImportService::new(db.clone(), reconciler), log)
}

async fn water_line(db: &DatabaseConnection, world: &World) -> Result<order_line_items::Model> {
    let order = orders::Entity::find()
        .filter(orders::Column::DestinationId.eq(world.destination_id))
        .one(db)
        .await?
        .expect("imported order");
    Ok(order_line_items::Entity::find()
        .filter(order_line_items::Column::OrderId.eq(order.id))
        .filter(order_line_items::Column::ProductId.eq(world.water_id))
        .one(db)
        .await?
        .expect("imported line item"))
}

#[tokio::test]
async fn test_rows_accumulate_into_one_request_order() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let (importer, _log) = order_importer(&db);

    let csv = format!(
        "{}{}{}",
        HEADER,
        "Canoas,Shelter,Abrigo Norte,,Litro(s),Agua,1,5,\n",
        "canoas,Shelter,abrigo norte,,Litro(s),AGUA,1,3,\n"
    );
    let report = importer.import_reader(csv.as_bytes()).await?;
    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 2);
    assert!(report.is_clean());
    assert_eq!(report.destinations, vec![world.destination_id]);

    let order = orders::Entity::find()
        .filter(orders::Column::DestinationId.eq(world.destination_id))
        .one(&db)
        .await?
        .expect("imported order");
    assert_eq!(order.order_type, OrderType::Request);
    assert_eq!(order.status, OrderStatus::Processed);
    assert!(order.needs_review);
    assert_eq!(order.origin_id, None);

    assert_eq!(water_line(&db, &world).await?.quantity, dec(8));

    let consolidated = order_consolidated::Entity::find()
        .filter(order_consolidated::Column::DestinationId.eq(world.destination_id))
        .one(&db)
        .await?
        .expect("consolidated row");
    assert_eq!(consolidated.request_quantity, dec(8));

    Ok(())
}

#[tokio::test]
async fn test_rerun_adds_quantities_without_duplicating_rows() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let (importer, _log) = order_importer(&db);

    let csv = format!("{}Canoas,Shelter,Abrigo Norte,,Litro(s),Agua,1,5,\n", HEADER);
    importer.import_reader(csv.as_bytes()).await?;
    let orders_before = orders::Entity::find().count(&db).await?;
    let items_before = order_line_items::Entity::find().count(&db).await?;

    importer.import_reader(csv.as_bytes()).await?;
    assert_eq!(orders::Entity::find().count(&db).await?, orders_before);
    assert_eq!(order_line_items::Entity::find().count(&db).await?, items_before);
    assert_eq!(water_line(&db, &world).await?.quantity, dec(10));

    Ok(())
}

#[tokio::test]
async fn test_bad_row_is_reported_and_run_continues() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let (importer, log) = order_importer(&db);

    let csv = format!(
        "{}{}{}{}",
        HEADER,
        "Canoas,Shelter,Abrigo Norte,,Litro(s),Agua,1,5,\n",
        "Nowhere,Shelter,Abrigo Norte,,Litro(s),Agua,1,5,\n",
        "Canoas,Shelter,Abrigo Norte,,Litro(s),Agua,1,abc,\n"
    );
    let report = importer.import_reader(csv.as_bytes()).await?;
    assert_eq!(report.processed, 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.failures[0].line, 3);
    assert_eq!(report.failures[0].error_code, "NOT_FOUND");
    assert_eq!(report.failures[1].line, 4);
    assert_eq!(report.failures[1].error_code, "INVALID_VALUE");
    assert_eq!(log.count(AnomalyLevel::Error), 2);

    assert_eq!(water_line(&db, &world).await?.quantity, dec(5));

    Ok(())
}

#[tokio::test]
async fn test_zero_quantity_row_is_rejected() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let _world = create_world(&db).await?;
    let (importer, _log) = order_importer(&db);

    let csv = format!("{}Canoas,Shelter,Abrigo Norte,,Litro(s),Agua,1,0,\n", HEADER);
    let report = importer.import_reader(csv.as_bytes()).await?;
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].error_code, "INVALID_VALUE");
    assert!(report.destinations.is_empty());

    assert_eq!(order_line_items::Entity::find().count(&db).await?, 0);
    assert_eq!(orders::Entity::find().count(&db).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_unknown_person_is_created_incomplete() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let (importer, log) = order_importer(&db);

    let csv = format!("{}Canoas,Hospital,Hospital Municipal,3,Unidade(s),Cobertor,,2,\n", HEADER);
    let report = importer.import_reader(csv.as_bytes()).await?;
    assert!(report.is_clean());

    let person = persons::Entity::find()
        .filter(persons::Column::Name.eq("Hospital Municipal"))
        .one(&db)
        .await?
        .expect("person created");
    assert_eq!(person.city_id, world.city_id);
    assert_eq!(person.legal_type, LEGAL_TYPE_IMPORTED);
    assert_eq!(person.priority, 3);

    let warnings: Vec<String> = log.entries().into_iter().map(|a| a.message).collect();
    assert!(warnings.iter().any(|m| m.starts_with("Incomplete person created")));
    assert!(warnings.iter().any(|m| m.starts_with("Incomplete order created")));

    Ok(())
}

#[tokio::test]
async fn test_missing_header_aborts_the_run() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let (importer, _log) = order_importer(&db);

    let err = importer
        .import_reader("city,person,unit,product\nCanoas,X,Litro(s),Agua\n".as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::InvalidValue { field: "header", .. }));
    assert_eq!(orders::Entity::find().count(&db).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_city_import_is_idempotent() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let log = Arc::new(MemoryAnomalyLog::new());
    let importer = ReferenceImportService::new(db.clone(), Reconciler::new(MatchStyle::Like, log.clone()));

    let csv = "state_initials,state_name,city\nRS,Rio Grande do Sul,Canoas\nrs,Rio Grande do Sul,Porto Alegre\nSC,Santa Catarina,Joinville\n";
    let report = importer.import_cities(csv.as_bytes()).await?;
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.created, 5);
    assert_eq!(states::Entity::find().count(&db).await?, 2);
    assert_eq!(cities::Entity::find().count(&db).await?, 3);

    let report = importer.import_cities(csv.as_bytes()).await?;
    assert_eq!(report.created, 0);
    assert_eq!(cities::Entity::find().count(&db).await?, 3);

    Ok(())
}

#[tokio::test]
async fn test_product_import_updates_known_products() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    let importer = ReferenceImportService::new(
        db.clone(),
        Reconciler::new(MatchStyle::Like, Arc::new(MemoryAnomalyLog::new())),
    );

    let csv = "name,unit,consumable,request_form_active,priority,description\n\
               Lanterna,Unidade(s),no,yes,4,LED\n\
               Fralda,Unidade(s),yes,yes,2,\n";
    let report = importer.import_products(csv.as_bytes()).await?;
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.created, 1);

    let lantern = products::Entity::find_by_id(world.retired_product_id)
        .one(&db)
        .await?
        .expect("existing product");
    assert!(lantern.request_form_active);
    assert_eq!(lantern.priority, 4);
    assert_eq!(lantern.description.as_deref(), Some("LED"));
    assert_eq!(lantern.unit_id, world.count_id);

    let diapers = products::Entity::find()
        .filter(products::Column::Name.eq("Fralda"))
        .one(&db)
        .await?
        .expect("new product");
    assert!(diapers.consumable);

    Ok(())
}

//! Find-or-create against a real database

mod common;

use aidlink::database::entities::*;
use aidlink::errors::ReconcileError;
use aidlink::reconcile::{AnomalyLevel, MatchStyle, MemoryAnomalyLog, NaturalKey, Reconciler};
use anyhow::Result;
use common::*;
use sea_orm::{EntityTrait, PaginatorTrait, Set};
use std::sync::Arc;

fn unit_key(name: &str) -> NaturalKey<units::Entity> {
    NaturalKey::<units::Entity>::new("units").name(units::Column::Name, Some(name))
}

fn new_unit(name: &str) -> units::ActiveModel {
    units::ActiveModel {
        name: Set(name.to_string()),
        name_singular: Set(name.to_string()),
        name_plural: Set(name.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_creates_once_then_finds() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let log = Arc::new(MemoryAnomalyLog::new());
    let reconciler = Reconciler::new(MatchStyle::Like, log.clone());

    let first = reconciler
        .find_or_create(&db, unit_key("Caixa(s)"), || new_unit("Caixa(s)"))
        .await?;
    assert!(first.was_created());
    assert_eq!(log.count(AnomalyLevel::Warning), 1);
    assert!(log.entries()[0].message.contains("created with id"));

    // Case and surrounding whitespace do not matter
    let second = reconciler
        .find_or_create(&db, unit_key("  caixa(s) "), || new_unit("duplicate"))
        .await?;
    assert!(!second.was_created());
    assert_eq!(second.id(), first.id());
    assert_eq!(log.count(AnomalyLevel::Warning), 1);

    assert_eq!(units::Entity::find().count(&db).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_ambiguous_key_is_a_data_integrity_error() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let world = create_world(&db).await?;
    create_person(&db, "Abrigo Norte", world.city_id, None).await?;

    let reconciler = Reconciler::new(MatchStyle::Like, Arc::new(MemoryAnomalyLog::new()));
    let key = NaturalKey::<persons::Entity>::new("persons")
        .name(persons::Column::Name, Some("Abrigo Norte"))
        .exact(persons::Column::CityId, Some(world.city_id));
    let before = persons::Entity::find().count(&db).await?;

    let err = reconciler
        .find_or_create(&db, key, || persons::ActiveModel::default())
        .await
        .unwrap_err();
    match err {
        ReconcileError::DataIntegrity { entity, matches, .. } => {
            assert_eq!(entity, "persons");
            assert_eq!(matches.len(), 2);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(persons::Entity::find().count(&db).await?, before);

    Ok(())
}

#[tokio::test]
async fn test_wildcards_in_names_match_literally() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let reconciler = Reconciler::new(MatchStyle::Like, Arc::new(MemoryAnomalyLog::new()));

    reconciler
        .find_or_create(&db, unit_key("KitXA"), || new_unit("KitXA"))
        .await?;
    let other = reconciler
        .find_or_create(&db, unit_key("Kit_A"), || new_unit("Kit_A"))
        .await?;
    assert!(other.was_created());

    Ok(())
}

#[tokio::test]
async fn test_find_existing_never_writes() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let log = Arc::new(MemoryAnomalyLog::new());
    let reconciler = Reconciler::new(MatchStyle::Like, log.clone());

    let err = reconciler
        .find_existing(
            &db,
            NaturalKey::<cities::Entity>::new("cities").name(cities::Column::Name, Some("Nowhere")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound { entity: "cities", .. }));
    assert!(log.entries().is_empty());
    assert_eq!(cities::Entity::find().count(&db).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_blank_key_is_rejected_without_writing() -> Result<()> {
    let (db, _dir) = setup_test_db().await?;
    let reconciler = Reconciler::new(MatchStyle::Like, Arc::new(MemoryAnomalyLog::new()));

    let err = reconciler
        .find_or_create(&db, unit_key("   "), || new_unit("blank"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Configuration { .. }));
    assert_eq!(units::Entity::find().count(&db).await?, 0);

    Ok(())
}

//! Shared fixtures for the integration tests
#![allow(dead_code)]

use aidlink::database::entities::*;
use aidlink::database::migrations::Migrator;
use aidlink::services::{Actor, LineItemPayload, OrderPayload, Role};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;

/// File-backed SQLite database with the schema applied
pub async fn setup_test_db() -> Result<(DatabaseConnection, TempDir)> {
    let dir = tempfile::tempdir()?;
    let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

    let db = Database::connect(&db_url).await?;
    Migrator::up(&db, None).await?;

    Ok((db, dir))
}

/// Reference data most order tests need
pub struct World {
    pub state_id: i32,
    pub city_id: i32,
    pub staff: Actor,
    pub account: Actor,
    /// Account user with a read-only contact at the destination
    pub viewer: Actor,
    pub shelter_type_id: i32,
    pub origin_id: i32,
    pub origin_contact_id: i32,
    pub destination_id: i32,
    pub destination_contact_id: i32,
    pub other_destination_id: i32,
    pub other_destination_contact_id: i32,
    pub litre_id: i32,
    pub count_id: i32,
    pub water_id: i32,
    pub blanket_id: i32,
    pub retired_product_id: i32,
    pub category_id: i32,
}

pub async fn create_user(db: &DatabaseConnection, email: &str, level: i32, active: bool) -> Result<i32> {
    let user = users::ActiveModel {
        name: Set(email.to_string()),
        email: Set(email.to_string()),
        level: Set(level),
        is_active: Set(active),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(user.id)
}

pub async fn create_person(
    db: &DatabaseConnection,
    name: &str,
    city_id: i32,
    person_type_id: Option<i32>,
) -> Result<i32> {
    let now = Utc::now();
    let person = persons::ActiveModel {
        name: Set(name.to_string()),
        city_id: Set(city_id),
        person_type_id: Set(person_type_id),
        parent_id: Set(None),
        legal_type: Set(1),
        priority: Set(2),
        export_ignore: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(person.id)
}

pub async fn create_contact(
    db: &DatabaseConnection,
    person_id: i32,
    user_id: Option<i32>,
    can_edit_order: bool,
) -> Result<i32> {
    let contact = person_contacts::ActiveModel {
        person_id: Set(person_id),
        user_id: Set(user_id),
        name: Set(format!("Contact of {}", person_id)),
        can_edit_order: Set(can_edit_order),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(contact.id)
}

pub async fn create_unit(db: &DatabaseConnection, name: &str, singular: &str, plural: &str) -> Result<i32> {
    let unit = units::ActiveModel {
        name: Set(name.to_string()),
        name_singular: Set(singular.to_string()),
        name_plural: Set(plural.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(unit.id)
}

pub async fn create_product(
    db: &DatabaseConnection,
    name: &str,
    unit_id: i32,
    consumable: bool,
    request_form_active: bool,
) -> Result<i32> {
    let now = Utc::now();
    let product = products::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        unit_id: Set(unit_id),
        consumable: Set(consumable),
        request_form_active: Set(request_form_active),
        priority: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(product.id)
}

pub async fn create_world(db: &DatabaseConnection) -> Result<World> {
    let state = states::ActiveModel {
        name: Set("Rio Grande do Sul".to_string()),
        initials: Set("RS".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let city = cities::ActiveModel {
        name: Set("Canoas".to_string()),
        state_id: Set(state.id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let shelter = person_types::ActiveModel {
        name: Set("Shelter".to_string()),
        city_id: Set(Some(city.id)),
        priority: Set(1),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let staff_id = create_user(db, "staff@example.org", users::LEVEL_STAFF, true).await?;
    let account_id = create_user(db, "shelter@example.org", users::LEVEL_USER, true).await?;
    let viewer_id = create_user(db, "viewer@example.org", users::LEVEL_USER, true).await?;

    let origin_id = create_person(db, "Deposito Central", city.id, None).await?;
    let destination_id = create_person(db, "Abrigo Norte", city.id, Some(shelter.id)).await?;
    let other_destination_id = create_person(db, "Abrigo Sul", city.id, Some(shelter.id)).await?;

    let origin_contact_id = create_contact(db, origin_id, Some(account_id), true).await?;
    let destination_contact_id = create_contact(db, destination_id, Some(account_id), true).await?;
    let other_destination_contact_id = create_contact(db, other_destination_id, None, false).await?;
    create_contact(db, destination_id, Some(viewer_id), false).await?;
    create_contact(db, origin_id, Some(viewer_id), false).await?;

    let litre_id = create_unit(db, "Litro(s)", "Litro", "Litros").await?;
    let count_id = create_unit(db, "Unidade(s)", "Unidade", "Unidades").await?;
    let water_id = create_product(db, "Agua", litre_id, true, true).await?;
    let blanket_id = create_product(db, "Cobertor", count_id, false, true).await?;
    let retired_product_id = create_product(db, "Lanterna", count_id, false, false).await?;

    let category = order_categories::ActiveModel {
        name: Set("Emergency".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(World {
        state_id: state.id,
        city_id: city.id,
        staff: Actor::new(staff_id, Role::Staff),
        account: Actor::new(account_id, Role::Account),
        viewer: Actor::new(viewer_id, Role::Account),
        shelter_type_id: shelter.id,
        origin_id,
        origin_contact_id,
        destination_id,
        destination_contact_id,
        other_destination_id,
        other_destination_contact_id,
        litre_id,
        count_id,
        water_id,
        blanket_id,
        retired_product_id,
        category_id: category.id,
    })
}

pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

pub fn item(product_id: i32, quantity: Decimal) -> LineItemPayload {
    LineItemPayload {
        product_id,
        quantity,
        notes: None,
    }
}

/// Request order from the origin to the destination
pub fn request_payload(world: &World, products: Vec<LineItemPayload>) -> OrderPayload {
    OrderPayload {
        order_type: OrderType::Request,
        status: OrderStatus::New,
        origin_id: world.origin_id,
        origin_contact_id: world.origin_contact_id,
        destination_id: world.destination_id,
        destination_contact_id: world.destination_contact_id,
        category_id: Some(world.category_id),
        effective_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap_or_default(),
        notes: None,
        internal_notes: None,
        needs_review: None,
        products,
    }
}

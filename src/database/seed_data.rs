use anyhow::Result;
use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::database::entities::{order_categories, users};

const DEFAULT_CATEGORIES: [&str; 3] = ["Emergency", "Routine", "Donation"];

/// Creates the first administrator and the default order categories.
///
/// Safe to run on every `db init`: existing rows are left untouched.
pub async fn seed_initial_data(
    db: &DatabaseConnection,
    admin_email: &str,
    admin_name: &str,
) -> Result<i32> {
    let existing_admin = users::Entity::find()
        .filter(users::Column::Email.eq(admin_email))
        .one(db)
        .await?;

    let admin_id = match existing_admin {
        Some(admin) => {
            info!("Admin user {} already exists, skipping", admin_email);
            admin.id
        }
        None => {
            let admin = users::ActiveModel {
                name: Set(admin_name.to_string()),
                email: Set(admin_email.to_string()),
                level: Set(users::LEVEL_ADMIN),
                is_active: Set(true),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?;
            info!("Created admin user {} with ID: {}", admin_email, admin.id);
            admin.id
        }
    };

    let category_count = order_categories::Entity::find().count(db).await?;
    if category_count == 0 {
        let categories = DEFAULT_CATEGORIES.iter().map(|name| order_categories::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        });
        order_categories::Entity::insert_many(categories).exec(db).await?;
        info!("Created {} order categories", DEFAULT_CATEGORIES.len());
    }

    Ok(admin_id)
}

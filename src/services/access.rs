//! Who is acting, and which persons they may act on

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};

use crate::database::entities::{person_contacts, persons, users};
use crate::errors::{OrderError, OrderResult};

/// Caller category that selects projections and filtering rules
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Account,
}

impl Role {
    pub fn for_user(user: &users::Model) -> Self {
        if user.is_staff() {
            Role::Staff
        } else {
            Role::Account
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i32, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn from_user(user: &users::Model) -> Self {
        Self::new(user.id, Role::for_user(user))
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

#[derive(Clone)]
pub struct AccessService {
    db: DatabaseConnection,
}

impl AccessService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Active user for `user_id`, or `None` when unknown or deactivated
    pub async fn resolve_actor(&self, user_id: i32) -> Result<Option<Actor>, DbErr> {
        let user = users::Entity::find_by_id(user_id).one(&self.db).await?;
        Ok(user
            .filter(|user| user.is_active)
            .map(|user| Actor::from_user(&user)))
    }

    /// Persons the user holds an active contact for
    pub async fn allowed_person_ids(&self, user_id: i32) -> Result<Vec<i32>, DbErr> {
        person_contacts::Entity::find()
            .select_only()
            .column(person_contacts::Column::PersonId)
            .filter(person_contacts::Column::UserId.eq(user_id))
            .filter(person_contacts::Column::IsActive.eq(true))
            .into_tuple::<i32>()
            .all(&self.db)
            .await
    }

    /// Loads the person and checks the actor may send orders for it
    pub async fn ensure_can_edit_person(
        &self,
        actor: &Actor,
        person_id: i32,
        side: &str,
    ) -> OrderResult<persons::Model> {
        let person = persons::Entity::find_by_id(person_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                OrderError::validation(format!("{} person {} not found.", side, person_id))
            })?;

        if actor.is_staff() {
            return Ok(person);
        }

        let contact = person_contacts::Entity::find()
            .filter(person_contacts::Column::UserId.eq(actor.user_id))
            .filter(person_contacts::Column::PersonId.eq(person_id))
            .filter(person_contacts::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                OrderError::validation(format!(
                    "User has no relationship with {} person {}.",
                    side.to_lowercase(),
                    person_id
                ))
            })?;

        if !contact.can_edit_order {
            return Err(OrderError::validation(format!(
                "User is not allowed to send orders for {} person {}.",
                side.to_lowercase(),
                person_id
            )));
        }

        Ok(person)
    }

    /// Checks an optional contact id belongs to the given person
    pub async fn ensure_contact_of(
        &self,
        contact_id: i32,
        person_id: i32,
        side: &str,
    ) -> OrderResult<person_contacts::Model> {
        let contact = person_contacts::Entity::find_by_id(contact_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                OrderError::validation(format!("{} contact {} not found.", side, contact_id))
            })?;

        if contact.person_id != person_id {
            return Err(OrderError::validation(format!(
                "{} contact {} does not belong to person {}.",
                side, contact_id, person_id
            )));
        }
        Ok(contact)
    }
}

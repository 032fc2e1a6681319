//! Batch name lookups for listings and exports
//!
//! Loads every referenced person, product, unit and category in a handful of
//! `IN (...)` queries instead of one query per row.

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use std::collections::{BTreeSet, HashMap};

use crate::database::entities::{
    cities, order_categories, person_types, persons, products, states, units,
};

/// Person with its location and type resolved to display values
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PersonSummary {
    pub id: i32,
    pub name: String,
    pub city: String,
    pub state: String,
    pub person_type: Option<String>,
    pub person_type_priority: i32,
    pub priority: i32,
    pub parent_name: Option<String>,
}

impl PersonSummary {
    /// `City - ST`
    pub fn city_with_state(&self) -> String {
        if self.state.is_empty() {
            self.city.clone()
        } else {
            format!("{} - {}", self.city, self.state)
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReferenceLookup {
    persons: HashMap<i32, PersonSummary>,
    products: HashMap<i32, products::Model>,
    units: HashMap<i32, units::Model>,
    categories: HashMap<i32, String>,
}

#[derive(Clone, Debug, Default)]
pub struct LookupRequest {
    pub person_ids: BTreeSet<i32>,
    pub product_ids: BTreeSet<i32>,
    pub unit_ids: BTreeSet<i32>,
    pub category_ids: BTreeSet<i32>,
}

impl ReferenceLookup {
    pub async fn load<C: ConnectionTrait>(conn: &C, request: &LookupRequest) -> Result<Self, DbErr> {
        let persons = load_persons(conn, &request.person_ids).await?;

        let products = if request.product_ids.is_empty() {
            HashMap::new()
        } else {
            products::Entity::find()
                .filter(products::Column::Id.is_in(request.product_ids.iter().copied()))
                .all(conn)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        let units = if request.unit_ids.is_empty() {
            HashMap::new()
        } else {
            units::Entity::find()
                .filter(units::Column::Id.is_in(request.unit_ids.iter().copied()))
                .all(conn)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        };

        let categories = if request.category_ids.is_empty() {
            HashMap::new()
        } else {
            order_categories::Entity::find()
                .filter(order_categories::Column::Id.is_in(request.category_ids.iter().copied()))
                .all(conn)
                .await?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect()
        };

        Ok(Self {
            persons,
            products,
            units,
            categories,
        })
    }

    pub fn person(&self, id: i32) -> Option<&PersonSummary> {
        self.persons.get(&id)
    }

    pub fn product(&self, id: i32) -> Option<&products::Model> {
        self.products.get(&id)
    }

    pub fn product_name(&self, id: i32) -> String {
        self.products
            .get(&id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    pub fn unit_name(&self, id: i32) -> String {
        self.units.get(&id).map(|u| u.name.clone()).unwrap_or_default()
    }

    pub fn category_name(&self, id: Option<i32>) -> String {
        id.and_then(|id| self.categories.get(&id).cloned())
            .unwrap_or_default()
    }
}

async fn load_persons<C: ConnectionTrait>(
    conn: &C,
    ids: &BTreeSet<i32>,
) -> Result<HashMap<i32, PersonSummary>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = persons::Entity::find()
        .filter(persons::Column::Id.is_in(ids.iter().copied()))
        .all(conn)
        .await?;

    let parent_ids: BTreeSet<i32> = rows.iter().filter_map(|p| p.parent_id).collect();
    let parent_names: HashMap<i32, String> = if parent_ids.is_empty() {
        HashMap::new()
    } else {
        persons::Entity::find()
            .filter(persons::Column::Id.is_in(parent_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect()
    };

    let city_ids: BTreeSet<i32> = rows.iter().map(|p| p.city_id).collect();
    let city_rows = cities::Entity::find()
        .filter(cities::Column::Id.is_in(city_ids))
        .all(conn)
        .await?;
    let state_ids: BTreeSet<i32> = city_rows.iter().map(|c| c.state_id).collect();
    let state_initials: HashMap<i32, String> = states::Entity::find()
        .filter(states::Column::Id.is_in(state_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s.initials))
        .collect();
    let city_info: HashMap<i32, (String, String)> = city_rows
        .into_iter()
        .map(|c| {
            let state = state_initials.get(&c.state_id).cloned().unwrap_or_default();
            (c.id, (c.name, state))
        })
        .collect();

    let type_ids: BTreeSet<i32> = rows.iter().filter_map(|p| p.person_type_id).collect();
    let type_info: HashMap<i32, (String, i32)> = if type_ids.is_empty() {
        HashMap::new()
    } else {
        person_types::Entity::find()
            .filter(person_types::Column::Id.is_in(type_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|t| (t.id, (t.name, t.priority)))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|p| {
            let (city, state) = city_info.get(&p.city_id).cloned().unwrap_or_default();
            let person_type = p.person_type_id.and_then(|id| type_info.get(&id));
            let summary = PersonSummary {
                id: p.id,
                name: p.name,
                city,
                state,
                person_type: person_type.map(|(name, _)| name.clone()),
                person_type_priority: person_type.map(|(_, priority)| *priority).unwrap_or(0),
                priority: p.priority,
                parent_name: p.parent_id.and_then(|id| parent_names.get(&id).cloned()),
            };
            (summary.id, summary)
        })
        .collect())
}

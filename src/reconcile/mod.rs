//! Find-or-create reconciliation over natural keys
//!
//! The import pipeline resolves every reference it reads (city, person, unit,
//! product, order header, line item) through [`Reconciler`]. A natural key is a
//! conjunction of exact column matches and case-insensitive name matches. The
//! outcome is always exactly one row id, or an error:
//!
//! - no match: the fallback row is inserted and a WARNING anomaly is recorded
//! - one match: the row is returned as is
//! - several matches: [`ReconcileError::DataIntegrity`], nothing is written
//!
//! A key with a missing part is rejected with [`ReconcileError::Configuration`]
//! before any query runs, so a blank value can never widen into a table scan.

pub mod anomaly;
pub mod match_style;

use sea_orm::sea_query::{Condition, SimpleExpr};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    IdenStatic, IntoActiveModel, QueryFilter, Value,
};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

pub use anomaly::{
    Anomaly, AnomalyLevel, AnomalySink, FileAnomalyLog, MemoryAnomalyLog, DEFAULT_ANOMALY_LOG,
};
pub use match_style::MatchStyle;

use crate::errors::{ReconcileError, ReconcileResult};

/// Rows addressable by an integer primary key
pub trait HasId {
    fn id(&self) -> i32;
}

/// Result of a find-or-create call
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution<M> {
    Found(M),
    Created(M),
}

impl<M: HasId> Resolution<M> {
    pub fn id(&self) -> i32 {
        self.model().id()
    }

    pub fn model(&self) -> &M {
        match self {
            Resolution::Found(model) | Resolution::Created(model) => model,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

enum KeyValue {
    Exact(Option<Value>),
    Name(Option<String>),
}

struct KeyPart<C> {
    column: C,
    value: KeyValue,
    display: Option<String>,
}

/// Uniqueness predicate for one entity
pub struct NaturalKey<E: EntityTrait> {
    entity: &'static str,
    parts: Vec<KeyPart<E::Column>>,
}

impl<E: EntityTrait> NaturalKey<E> {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            parts: Vec::new(),
        }
    }

    /// Column must equal `value`
    pub fn exact<V>(mut self, column: E::Column, value: Option<V>) -> Self
    where
        V: Into<Value> + Debug,
    {
        let display = value.as_ref().map(|v| format!("{:?}", v));
        self.parts.push(KeyPart {
            column,
            value: KeyValue::Exact(value.map(Into::into)),
            display,
        });
        self
    }

    /// Column must match `value` ignoring case; blank values count as absent
    pub fn name<S: AsRef<str>>(mut self, column: E::Column, value: Option<S>) -> Self {
        let value = value
            .map(|v| v.as_ref().trim().to_string())
            .filter(|v| !v.is_empty());
        let display = value.as_ref().map(|v| format!("'{}'", v));
        self.parts.push(KeyPart {
            column,
            value: KeyValue::Name(value),
            display,
        });
        self
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// `column=value` pairs, for logs and error messages
    pub fn describe(&self) -> String {
        self.parts
            .iter()
            .map(|part| {
                format!(
                    "{}={}",
                    part.column.as_str(),
                    part.display.as_deref().unwrap_or("<blank>")
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn condition(&self, style: MatchStyle) -> ReconcileResult<Condition> {
        if self.parts.is_empty() {
            return Err(ReconcileError::Configuration {
                entity: self.entity,
                field: "<empty key>".to_string(),
            });
        }

        let mut condition = Condition::all();
        for part in &self.parts {
            let expr: SimpleExpr = match &part.value {
                KeyValue::Exact(Some(value)) => part.column.eq(value.clone()),
                KeyValue::Name(Some(name)) => style.equals(part.column, name),
                KeyValue::Exact(None) | KeyValue::Name(None) => {
                    return Err(ReconcileError::Configuration {
                        entity: self.entity,
                        field: part.column.as_str().to_string(),
                    });
                }
            };
            condition = condition.add(expr);
        }
        Ok(condition)
    }
}

/// Find-or-create service shared by the import pipelines
#[derive(Clone)]
pub struct Reconciler {
    match_style: MatchStyle,
    anomalies: Arc<dyn AnomalySink>,
}

impl Reconciler {
    pub fn new(match_style: MatchStyle, anomalies: Arc<dyn AnomalySink>) -> Self {
        Self {
            match_style,
            anomalies,
        }
    }

    pub fn match_style(&self) -> MatchStyle {
        self.match_style
    }

    pub fn anomalies(&self) -> &Arc<dyn AnomalySink> {
        &self.anomalies
    }

    async fn matching<E, C>(&self, conn: &C, key: &NaturalKey<E>) -> ReconcileResult<Vec<E::Model>>
    where
        E: EntityTrait,
        C: ConnectionTrait,
    {
        let condition = key.condition(self.match_style)?;
        Ok(E::find().filter(condition).all(conn).await?)
    }

    /// Returns the single row matching `key`, inserting `fallback()` when none does
    pub async fn find_or_create<E, A, C, F>(
        &self,
        conn: &C,
        key: NaturalKey<E>,
        fallback: F,
    ) -> ReconcileResult<Resolution<E::Model>>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<A> + HasId,
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        C: ConnectionTrait,
        F: FnOnce() -> A,
    {
        let mut matches = self.matching(conn, &key).await?;

        match matches.len() {
            0 => {
                let created = fallback().insert(conn).await?;
                self.anomalies.warning(format!(
                    "{} not found for [{}], created with id {}",
                    key.entity(),
                    key.describe(),
                    created.id()
                ));
                Ok(Resolution::Created(created))
            }
            1 => {
                let found = matches.remove(0);
                debug!("Resolved {} [{}] to id {}", key.entity(), key.describe(), found.id());
                Ok(Resolution::Found(found))
            }
            _ => Err(ReconcileError::DataIntegrity {
                entity: key.entity(),
                key: key.describe(),
                matches: matches.iter().map(HasId::id).collect(),
            }),
        }
    }

    /// Read-only lookup for references that must already exist
    pub async fn find_existing<E, C>(&self, conn: &C, key: NaturalKey<E>) -> ReconcileResult<E::Model>
    where
        E: EntityTrait,
        E::Model: HasId,
        C: ConnectionTrait,
    {
        let mut matches = self.matching(conn, &key).await?;

        match matches.len() {
            0 => Err(ReconcileError::NotFound {
                entity: key.entity(),
                key: key.describe(),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(ReconcileError::DataIntegrity {
                entity: key.entity(),
                key: key.describe(),
                matches: matches.iter().map(HasId::id).collect(),
            }),
        }
    }
}

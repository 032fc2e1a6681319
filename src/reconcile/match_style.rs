use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, DbBackend};
use serde::{Deserialize, Serialize};

/// How name columns are compared during reconciliation and search.
///
/// Picked once per process (from config or the connected backend) and handed to
/// whatever builds queries, so no query code branches on the database dialect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStyle {
    /// `LIKE`, case-insensitive for ASCII on SQLite and MySQL
    #[default]
    Like,
    /// `LOWER(col) = lower(value)`, portable to case-sensitive collations
    LowerEquals,
}

impl MatchStyle {
    pub fn for_backend(backend: DbBackend) -> Self {
        match backend {
            DbBackend::Postgres => MatchStyle::LowerEquals,
            DbBackend::MySql | DbBackend::Sqlite => MatchStyle::Like,
        }
    }

    /// Case-insensitive whole-value match
    pub fn equals<C: ColumnTrait>(&self, column: C, value: &str) -> SimpleExpr {
        match self {
            MatchStyle::Like => Expr::col(column.as_column_ref())
                .like(LikeExpr::new(escape_like(value)).escape('\\')),
            MatchStyle::LowerEquals => {
                Expr::expr(Func::lower(Expr::col(column.as_column_ref())))
                    .eq(value.to_lowercase())
            }
        }
    }

    /// Case-insensitive prefix match, used by name searches
    pub fn starts_with<C: ColumnTrait>(&self, column: C, prefix: &str) -> SimpleExpr {
        match self {
            MatchStyle::Like => Expr::col(column.as_column_ref())
                .like(LikeExpr::new(format!("{}%", escape_like(prefix))).escape('\\')),
            MatchStyle::LowerEquals => {
                Expr::expr(Func::lower(Expr::col(column.as_column_ref()))).like(
                    LikeExpr::new(format!("{}%", escape_like(&prefix.to_lowercase())))
                        .escape('\\'),
                )
            }
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

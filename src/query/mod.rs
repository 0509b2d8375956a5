//! Fluent statement builders bound to a [`Database`](crate::Database).
//!
//! Each builder wraps the dialect-aware SQL serializer and carries an
//! `execute()` capability for the owning database handle. Builders are
//! created per operation and discarded after execution.
//!
//! Predicates are plain sea-query expressions; [`Expr`] and [`Alias`] are
//! re-exported so callers can write
//! `query.and_where(Expr::col(Alias::new("id")).gt(5))` without a separate
//! import.

pub(crate) mod builder;

pub use builder::{DeleteQuery, InsertQuery, SelectQuery, UpdateQuery};

pub use sea_query::{Alias, Expr, Order, SimpleExpr};

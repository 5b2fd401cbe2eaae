//! Table and index definitions for the identity tables.
//!
//! Both tables are SCHEMALESS: documents are stored as the stores write
//! them. Every statement uses `IF NOT EXISTS`, so the bootstrap can run any
//! number of times, including against tables that already hold data or
//! already carry some of the indexes.

use std::collections::BTreeMap;

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::context::IdentityOptions;
use crate::error::DbError;

/// Index names created on the user table, relative to the table name.
pub const USER_INDEXES: &[&str] = &[
    "normalized_user_name",
    "normalized_email",
    "login_provider",
    "role_normalized_name",
    "claim_type",
    "role_claim_type",
];

/// Index names created on the role table, relative to the table name.
pub const ROLE_INDEXES: &[&str] = &["normalized_name"];

/// Full index name as defined in the database.
pub fn index_name(table: &str, index: &str) -> String {
    format!("{table}_{index}")
}

fn concurrently(options: &IdentityOptions) -> &'static str {
    if options.concurrent_index_build {
        " CONCURRENTLY"
    } else {
        ""
    }
}

/// DDL for a bare table. Stores need the table to exist even when
/// indexes are disabled.
pub fn table_ddl(table: &str) -> String {
    format!("DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;\n")
}

/// DDL for the user table and its indexes.
///
/// `normalized_user_name` is the only unique index; email, login provider,
/// role name and claim type indexes exist to serve lookups.
pub fn user_table_ddl(options: &IdentityOptions) -> String {
    let t = &options.user_table;
    let c = concurrently(options);
    let table = table_ddl(t);
    format!(
        "{table}DEFINE INDEX IF NOT EXISTS {t}_normalized_user_name ON TABLE {t} \
    COLUMNS normalized_user_name UNIQUE{c};
DEFINE INDEX IF NOT EXISTS {t}_normalized_email ON TABLE {t} \
    COLUMNS normalized_email{c};
DEFINE INDEX IF NOT EXISTS {t}_login_provider ON TABLE {t} \
    COLUMNS logins.login_provider{c};
DEFINE INDEX IF NOT EXISTS {t}_role_normalized_name ON TABLE {t} \
    COLUMNS roles.normalized_name{c};
DEFINE INDEX IF NOT EXISTS {t}_claim_type ON TABLE {t} \
    COLUMNS claims.claim_type{c};
DEFINE INDEX IF NOT EXISTS {t}_role_claim_type ON TABLE {t} \
    COLUMNS roles.claims.claim_type{c};
"
    )
}

/// DDL for the role table and its index.
pub fn role_table_ddl(options: &IdentityOptions) -> String {
    let t = &options.role_table;
    let c = concurrently(options);
    let table = table_ddl(t);
    format!(
        "{table}DEFINE INDEX IF NOT EXISTS {t}_normalized_name ON TABLE {t} \
    COLUMNS normalized_name UNIQUE{c};
"
    )
}

pub(crate) async fn ensure_user_table<C: Connection>(
    db: &Surreal<C>,
    options: &IdentityOptions,
) -> Result<(), DbError> {
    apply(db, &options.user_table, &user_table_ddl(options)).await
}

pub(crate) async fn ensure_role_table<C: Connection>(
    db: &Surreal<C>,
    options: &IdentityOptions,
) -> Result<(), DbError> {
    apply(db, &options.role_table, &role_table_ddl(options)).await
}

/// Defines both tables without any index.
pub(crate) async fn ensure_tables<C: Connection>(
    db: &Surreal<C>,
    options: &IdentityOptions,
) -> Result<(), DbError> {
    let ddl = format!(
        "{}{}",
        table_ddl(&options.user_table),
        table_ddl(&options.role_table)
    );
    db.query(ddl)
        .await?
        .check()
        .map_err(|e| DbError::Bootstrap(e.to_string()))?;

    info!(
        user_table = %options.user_table,
        role_table = %options.role_table,
        "Ensured tables without indexes"
    );
    Ok(())
}

async fn apply<C: Connection>(db: &Surreal<C>, table: &str, ddl: &str) -> Result<(), DbError> {
    db.query(ddl)
        .await?
        .check()
        .map_err(|e| DbError::Bootstrap(format!("table '{table}': {e}")))?;

    info!(table, "Ensured table and indexes");
    Ok(())
}

pub(crate) async fn drop_table<C: Connection>(db: &Surreal<C>, table: &str) -> Result<(), DbError> {
    db.query(format!("REMOVE TABLE IF EXISTS {table}"))
        .await?
        .check()
        .map_err(|e| DbError::Query(e.to_string()))?;

    info!(table, "Removed table");
    Ok(())
}

/// The part of `INFO FOR DB` listing table definitions.
#[derive(Debug, SurrealValue)]
struct DbInfo {
    tables: BTreeMap<String, String>,
}

/// The part of `INFO FOR TABLE` listing index definitions.
#[derive(Debug, SurrealValue)]
struct TableInfo {
    indexes: BTreeMap<String, String>,
}

pub(crate) async fn table_exists<C: Connection>(
    db: &Surreal<C>,
    table: &str,
) -> Result<bool, DbError> {
    let mut result = db.query("INFO FOR DB").await?;
    let info: Option<DbInfo> = result.take(0)?;
    Ok(info.is_some_and(|info| info.tables.contains_key(table)))
}

/// `index` is the full index name, see [`index_name`].
pub(crate) async fn index_exists<C: Connection>(
    db: &Surreal<C>,
    table: &str,
    index: &str,
) -> Result<bool, DbError> {
    if !table_exists(db, table).await? {
        return Ok(false);
    }
    let mut result = db.query(format!("INFO FOR TABLE {table}")).await?;
    let info: Option<TableInfo> = result.take(0)?;
    Ok(info.is_some_and(|info| info.indexes.contains_key(index)))
}

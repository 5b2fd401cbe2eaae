//! Shared handle the user and role stores operate on.

use std::sync::Arc;

use idvault_core::normalize::{CaseFold, Normalizer};
use surrealdb::{Connection, Surreal};
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::DbError;
use crate::schema;

/// Table names and bootstrap behaviour.
#[derive(Debug, Clone)]
pub struct IdentityOptions {
    /// Table holding user documents.
    pub user_table: String,
    /// Table holding the authoritative role documents.
    pub role_table: String,
    /// Define indexes on first store access. Tables are defined either way.
    pub create_indexes: bool,
    /// Build indexes in the background (`CONCURRENTLY`).
    pub concurrent_index_build: bool,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            user_table: "identity_user".into(),
            role_table: "identity_role".into(),
            create_indexes: false,
            concurrent_index_build: false,
        }
    }
}

/// Database handle, options and normalizer shared by both stores.
///
/// Cloning the underlying `Surreal` handle is cheap and safe across tasks,
/// so one context is normally wrapped in an `Arc` and handed to every store.
pub struct IdentityContext<C: Connection> {
    db: Surreal<C>,
    options: IdentityOptions,
    normalizer: Arc<dyn Normalizer>,
    bootstrap: OnceCell<()>,
}

impl<C: Connection> IdentityContext<C> {
    /// Table names are interpolated into statements, so they must be plain
    /// identifiers.
    pub fn new(db: Surreal<C>, options: IdentityOptions) -> Result<Self, DbError> {
        validate_table_name(&options.user_table)?;
        validate_table_name(&options.role_table)?;
        if options.user_table == options.role_table {
            return Err(DbError::InvalidTableName(options.role_table));
        }

        Ok(Self {
            db,
            options,
            normalizer: Arc::new(CaseFold),
            bootstrap: OnceCell::new(),
        })
    }

    /// Replaces the default [`CaseFold`] normalizer.
    pub fn with_normalizer(mut self, normalizer: impl Normalizer + 'static) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn db(&self) -> &Surreal<C> {
        &self.db
    }

    pub fn options(&self) -> &IdentityOptions {
        &self.options
    }

    pub fn user_table(&self) -> &str {
        &self.options.user_table
    }

    pub fn role_table(&self) -> &str {
        &self.options.role_table
    }

    pub fn normalize(&self, value: &str) -> String {
        self.normalizer.normalize(value)
    }

    /// Runs the bootstrap at most once per context. Tables are always
    /// defined; indexes only when `create_indexes` is set.
    pub(crate) async fn ready(&self) -> Result<(), DbError> {
        self.bootstrap
            .get_or_try_init(|| async {
                if !self.options.create_indexes {
                    return schema::ensure_tables(&self.db, &self.options).await;
                }
                info!(
                    user_table = %self.options.user_table,
                    role_table = %self.options.role_table,
                    "Bootstrapping identity tables and indexes"
                );
                self.ensure_user_table().await?;
                self.ensure_role_table().await
            })
            .await?;
        Ok(())
    }

    /// Defines the user table and its indexes. Safe to call repeatedly.
    pub async fn ensure_user_table(&self) -> Result<(), DbError> {
        schema::ensure_user_table(&self.db, &self.options).await
    }

    /// Defines the role table and its index. Safe to call repeatedly.
    pub async fn ensure_role_table(&self) -> Result<(), DbError> {
        schema::ensure_role_table(&self.db, &self.options).await
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        schema::table_exists(&self.db, table).await
    }

    /// Whether `table` carries an index with the given full name.
    pub async fn index_exists(&self, table: &str, index: &str) -> Result<bool, DbError> {
        validate_table_name(table)?;
        schema::index_exists(&self.db, table, index).await
    }

    /// Permanently removes the user table, its indexes and data.
    pub async fn drop_user_table(&self) -> Result<(), DbError> {
        schema::drop_table(&self.db, &self.options.user_table).await
    }

    /// Permanently removes the role table, its index and data.
    pub async fn drop_role_table(&self) -> Result<(), DbError> {
        schema::drop_table(&self.db, &self.options.role_table).await
    }
}

fn validate_table_name(name: &str) -> Result<(), DbError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DbError::InvalidTableName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_must_be_identifiers() {
        assert!(validate_table_name("identity_user").is_ok());
        assert!(validate_table_name("_users2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2users").is_err());
        assert!(validate_table_name("users; REMOVE TABLE x").is_err());
        assert!(validate_table_name("user-table").is_err());
    }

    #[test]
    fn default_options_do_not_bootstrap() {
        let options = IdentityOptions::default();
        assert!(!options.create_indexes);
        assert_ne!(options.user_table, options.role_table);
    }
}

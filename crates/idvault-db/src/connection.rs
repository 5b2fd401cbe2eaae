//! SurrealDB connection management and store wiring.

use std::sync::Arc;

use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::context::{IdentityContext, IdentityOptions};
use crate::error::DbError;
use crate::store::{SurrealRoleStore, SurrealUserStore};

/// Settings for the remote identity database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address (e.g., `127.0.0.1:8000`).
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "idvault".into(),
            database: "identity".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Owns a database handle and builds identity stores over it.
///
/// Production code uses [`DbManager::connect`]; any other engine (e.g. the
/// in-memory one) can be wrapped with [`DbManager::from_client`].
#[derive(Clone)]
pub struct DbManager<C: Connection = Client> {
    db: Surreal<C>,
}

impl DbManager<Client> {
    /// Connects over WebSocket, signs in as root and selects the configured
    /// namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to identity database"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Connected to identity database");
        Ok(Self { db })
    }
}

impl<C: Connection> DbManager<C> {
    /// Wraps a handle whose namespace and database are already selected.
    pub fn from_client(db: Surreal<C>) -> Self {
        Self { db }
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.db
    }

    pub fn identity_context(&self, options: IdentityOptions) -> Result<IdentityContext<C>, DbError> {
        IdentityContext::new(self.db.clone(), options)
    }

    /// User and role stores sharing one context, and so one bootstrap.
    pub fn stores(
        &self,
        options: IdentityOptions,
    ) -> Result<(SurrealUserStore<C>, SurrealRoleStore<C>), DbError> {
        let ctx = Arc::new(self.identity_context(options)?);
        Ok((SurrealUserStore::new(ctx.clone()), SurrealRoleStore::new(ctx)))
    }
}

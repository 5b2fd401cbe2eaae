//! SurrealDB implementation of [`RoleStore`].

use std::sync::Arc;

use idvault_core::error::{IdentityError, IdentityResult, require};
use idvault_core::models::{Claim, Role, generate_id};
use idvault_core::set;
use idvault_core::store::{Propagation, RoleStore};
use surrealdb::{Connection, Surreal};
use tracing::debug;

use super::DisposeFlag;
use super::propagation;
use crate::context::IdentityContext;
use crate::document::{RoleContent, RoleRowWithId};
use crate::error::{DbError, write_error};

const STORE: &str = "SurrealRoleStore";

/// SurrealDB implementation of the role store.
///
/// Writes to the role table are followed by a fan-out that refreshes the
/// snapshots embedded in user documents.
#[derive(Clone)]
pub struct SurrealRoleStore<C: Connection> {
    ctx: Arc<IdentityContext<C>>,
    disposed: DisposeFlag,
}

impl<C: Connection> SurrealRoleStore<C> {
    pub fn new(ctx: Arc<IdentityContext<C>>) -> Self {
        Self {
            ctx,
            disposed: DisposeFlag::default(),
        }
    }

    fn db(&self) -> &Surreal<C> {
        self.ctx.db()
    }

    fn normalize(&self, role: &mut Role) {
        let source = if role.normalized_name.is_empty() {
            &role.name
        } else {
            &role.normalized_name
        };
        role.normalized_name = self.ctx.normalize(source);
    }

    /// Whether another role already uses the normalized name.
    async fn name_taken(&self, role: &Role) -> IdentityResult<bool> {
        let mut result = self
            .db()
            .query(format!(
                "SELECT VALUE meta::id(id) FROM {roles} \
                 WHERE normalized_name = $normalized_name",
                roles = self.ctx.role_table()
            ))
            .bind(("normalized_name", role.normalized_name.clone()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        Ok(ids.iter().any(|id| *id != role.id))
    }

    async fn write(&self, role: &Role, statement: &str) -> IdentityResult<()> {
        let duplicate = || IdentityError::DuplicateRoleName {
            role_name: role.name.clone(),
        };

        self.db()
            .query(statement)
            .bind(("id", role.id.clone()))
            .bind(("content", RoleContent::from(role)))
            .await
            .map_err(|e| write_error(e, duplicate))?
            .check()
            .map_err(|e| write_error(e, duplicate))?;
        Ok(())
    }
}

impl<C: Connection> RoleStore for SurrealRoleStore<C> {
    async fn create(&self, role: &mut Role) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        require(&role.name, "role.name")?;
        self.ctx.ready().await?;

        if role.id.trim().is_empty() {
            role.id = generate_id();
        }
        self.normalize(role);

        if self.name_taken(role).await? {
            return Err(IdentityError::DuplicateRoleName {
                role_name: role.name.clone(),
            });
        }

        let statement = format!(
            "CREATE type::record('{roles}', $id) CONTENT $content",
            roles = self.ctx.role_table()
        );
        self.write(role, &statement).await?;

        debug!(role_id = %role.id, name = %role.name, "Created role");
        Ok(())
    }

    async fn update(&self, role: &mut Role) -> IdentityResult<Propagation> {
        self.disposed.check(STORE)?;
        require(&role.id, "role.id")?;
        require(&role.name, "role.name")?;
        self.ctx.ready().await?;

        self.normalize(role);
        if self.name_taken(role).await? {
            return Err(IdentityError::DuplicateRoleName {
                role_name: role.name.clone(),
            });
        }

        let statement = format!(
            "UPSERT type::record('{roles}', $id) CONTENT $content",
            roles = self.ctx.role_table()
        );
        self.write(role, &statement).await?;
        debug!(role_id = %role.id, name = %role.name, "Updated role");

        Ok(propagation::refresh_role(&self.ctx, role).await)
    }

    async fn delete(&self, role: &Role) -> IdentityResult<Propagation> {
        self.disposed.check(STORE)?;
        require(&role.id, "role.id")?;
        self.ctx.ready().await?;

        self.db()
            .query(format!(
                "DELETE type::record('{roles}', $id)",
                roles = self.ctx.role_table()
            ))
            .bind(("id", role.id.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        debug!(role_id = %role.id, "Deleted role");

        Ok(propagation::pull_role(&self.ctx, &role.id).await)
    }

    async fn find_by_id(&self, role_id: &str) -> IdentityResult<Option<Role>> {
        self.disposed.check(STORE)?;
        if role_id.trim().is_empty() {
            return Ok(None);
        }
        self.ctx.ready().await?;

        let mut result = self
            .db()
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM type::record('{roles}', $id)",
                roles = self.ctx.role_table()
            ))
            .bind(("id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(Role::from))
    }

    async fn find_by_normalized_name(&self, normalized_name: &str) -> IdentityResult<Option<Role>> {
        self.disposed.check(STORE)?;
        if normalized_name.trim().is_empty() {
            return Ok(None);
        }
        self.ctx.ready().await?;

        let normalized_name = self.ctx.normalize(normalized_name);
        Ok(fetch_by_normalized_name(&self.ctx, &normalized_name).await?)
    }

    async fn add_claim(&self, role: &mut Role, claim: Claim) -> IdentityResult<Propagation> {
        self.disposed.check(STORE)?;
        require(&claim.claim_type, "claim.claim_type")?;

        if !set::add_distinct(&mut role.claims, claim, Claim::matches) {
            return Ok(Propagation::default());
        }
        self.update(role).await
    }

    async fn remove_claim(&self, role: &mut Role, claim: &Claim) -> IdentityResult<Propagation> {
        self.disposed.check(STORE)?;
        require(&claim.claim_type, "claim.claim_type")?;

        if set::remove_matching(&mut role.claims, claim, Claim::matches) == 0 {
            return Ok(Propagation::default());
        }
        self.update(role).await
    }

    fn claims(&self, role: &Role) -> IdentityResult<Vec<Claim>> {
        self.disposed.check(STORE)?;
        Ok(role.claims.clone())
    }

    fn role_id(&self, role: &Role) -> IdentityResult<String> {
        self.disposed.check(STORE)?;
        Ok(role.id.clone())
    }

    fn role_name(&self, role: &Role) -> IdentityResult<String> {
        self.disposed.check(STORE)?;
        Ok(role.name.clone())
    }

    fn normalized_role_name(&self, role: &Role) -> IdentityResult<String> {
        self.disposed.check(STORE)?;
        Ok(role.normalized_name.clone())
    }

    fn set_role_name(&self, role: &mut Role, name: &str) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        role.name = name.to_string();
        role.normalized_name = self.ctx.normalize(name);
        Ok(())
    }

    fn set_normalized_role_name(&self, role: &mut Role, normalized_name: &str) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        role.normalized_name = self.ctx.normalize(normalized_name);
        Ok(())
    }

    fn dispose(&self) {
        self.disposed.dispose();
    }
}

/// Role lookup by an already normalized name, shared with the user store
/// for role membership.
pub(crate) async fn fetch_by_normalized_name<C: Connection>(
    ctx: &IdentityContext<C>,
    normalized_name: &str,
) -> Result<Option<Role>, DbError> {
    let mut result = ctx
        .db()
        .query(format!(
            "SELECT meta::id(id) AS record_id, * FROM {roles} \
             WHERE normalized_name = $normalized_name LIMIT 1",
            roles = ctx.role_table()
        ))
        .bind(("normalized_name", normalized_name.to_string()))
        .await?;

    let rows: Vec<RoleRowWithId> = result.take(0)?;
    Ok(rows.into_iter().next().map(Role::from))
}

//! SurrealDB implementation of [`UserStore`].
//!
//! A user is one document holding its claims, logins and full snapshots of
//! its roles. Claim, login and role membership operations mutate the
//! in-memory user and then rewrite only the changed array on the stored
//! record. Users that have no id yet are only mutated in memory.

use std::sync::Arc;

use idvault_core::error::{IdentityError, IdentityResult, require};
use idvault_core::models::{Claim, Login, User, generate_id};
use idvault_core::set;
use idvault_core::store::UserStore;
use surrealdb::{Connection, Surreal};
use tracing::debug;

use super::DisposeFlag;
use super::role::fetch_by_normalized_name;
use crate::context::IdentityContext;
use crate::document::{UserContent, UserRowWithId, claim_docs, login_docs, role_snapshots};
use crate::error::{DbError, write_error};

const STORE: &str = "SurrealUserStore";

/// SurrealDB implementation of the user store.
#[derive(Clone)]
pub struct SurrealUserStore<C: Connection> {
    ctx: Arc<IdentityContext<C>>,
    disposed: DisposeFlag,
}

impl<C: Connection> SurrealUserStore<C> {
    pub fn new(ctx: Arc<IdentityContext<C>>) -> Self {
        Self {
            ctx,
            disposed: DisposeFlag::default(),
        }
    }

    fn db(&self) -> &Surreal<C> {
        self.ctx.db()
    }

    /// Folds the normalized fields, deriving them from the display values
    /// when they are empty.
    fn normalize(&self, user: &mut User) {
        let source = if user.normalized_user_name.is_empty() {
            &user.user_name
        } else {
            &user.normalized_user_name
        };
        user.normalized_user_name = self.ctx.normalize(source);

        user.normalized_email = match user.normalized_email.as_deref() {
            Some(normalized) if !normalized.is_empty() => Some(self.ctx.normalize(normalized)),
            _ => user.email.as_deref().map(|email| self.ctx.normalize(email)),
        };
    }

    fn duplicate(user: &User) -> IdentityError {
        IdentityError::DuplicateUserName {
            user_name: user.user_name.clone(),
        }
    }

    /// Whether another user already uses the normalized user name.
    async fn name_taken(&self, user: &User) -> IdentityResult<bool> {
        let mut result = self
            .db()
            .query(format!(
                "SELECT VALUE meta::id(id) FROM {users} \
                 WHERE normalized_user_name = $normalized_user_name",
                users = self.ctx.user_table()
            ))
            .bind(("normalized_user_name", user.normalized_user_name.clone()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        Ok(ids.iter().any(|id| *id != user.id))
    }

    async fn write(&self, user: &User, statement: &str) -> IdentityResult<()> {
        self.db()
            .query(statement)
            .bind(("id", user.id.clone()))
            .bind(("content", UserContent::from(user)))
            .await
            .map_err(|e| write_error(e, || Self::duplicate(user)))?
            .check()
            .map_err(|e| write_error(e, || Self::duplicate(user)))?;
        Ok(())
    }

    fn set_statement(&self, field: &str) -> String {
        format!(
            "UPDATE type::record('{users}', $id) SET {field} = $value",
            users = self.ctx.user_table()
        )
    }

    async fn write_claims(&self, user: &User) -> IdentityResult<()> {
        if user.id.is_empty() {
            return Ok(());
        }
        self.ctx.ready().await?;
        self.db()
            .query(self.set_statement("claims"))
            .bind(("id", user.id.clone()))
            .bind(("value", claim_docs(&user.claims)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        debug!(user_id = %user.id, claims = user.claims.len(), "Wrote user claims");
        Ok(())
    }

    async fn write_logins(&self, user: &User) -> IdentityResult<()> {
        if user.id.is_empty() {
            return Ok(());
        }
        self.ctx.ready().await?;
        self.db()
            .query(self.set_statement("logins"))
            .bind(("id", user.id.clone()))
            .bind(("value", login_docs(&user.logins)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        debug!(user_id = %user.id, logins = user.logins.len(), "Wrote user logins");
        Ok(())
    }

    async fn write_roles(&self, user: &User) -> IdentityResult<()> {
        if user.id.is_empty() {
            return Ok(());
        }
        self.ctx.ready().await?;
        self.db()
            .query(self.set_statement("roles"))
            .bind(("id", user.id.clone()))
            .bind(("value", role_snapshots(&user.roles)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        debug!(user_id = %user.id, roles = user.roles.len(), "Wrote user roles");
        Ok(())
    }

    /// Runs a user query whose only parameter is `$value`.
    async fn select_users(&self, condition: &str, value: String) -> IdentityResult<Vec<User>> {
        self.ctx.ready().await?;
        let mut result = self
            .db()
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM {users} WHERE {condition}",
                users = self.ctx.user_table()
            ))
            .bind(("value", value))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}

impl<C: Connection> UserStore for SurrealUserStore<C> {
    async fn create(&self, user: &mut User) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        require(&user.user_name, "user.user_name")?;
        self.ctx.ready().await?;

        if user.id.trim().is_empty() {
            user.id = generate_id();
        }
        self.normalize(user);

        if self.name_taken(user).await? {
            return Err(Self::duplicate(user));
        }

        let statement = format!(
            "CREATE type::record('{users}', $id) CONTENT $content",
            users = self.ctx.user_table()
        );
        self.write(user, &statement).await?;

        debug!(user_id = %user.id, user_name = %user.user_name, "Created user");
        Ok(())
    }

    async fn update(&self, user: &mut User) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        require(&user.id, "user.id")?;
        require(&user.user_name, "user.user_name")?;
        self.ctx.ready().await?;

        self.normalize(user);
        if self.name_taken(user).await? {
            return Err(Self::duplicate(user));
        }

        let statement = format!(
            "UPSERT type::record('{users}', $id) CONTENT $content",
            users = self.ctx.user_table()
        );
        self.write(user, &statement).await?;

        debug!(user_id = %user.id, user_name = %user.user_name, "Updated user");
        Ok(())
    }

    async fn delete(&self, user: &User) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        require(&user.id, "user.id")?;
        self.ctx.ready().await?;

        self.db()
            .query(format!(
                "DELETE type::record('{users}', $id)",
                users = self.ctx.user_table()
            ))
            .bind(("id", user.id.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        debug!(user_id = %user.id, "Deleted user");
        Ok(())
    }

    async fn find_by_id(&self, user_id: &str) -> IdentityResult<Option<User>> {
        self.disposed.check(STORE)?;
        if user_id.trim().is_empty() {
            return Ok(None);
        }
        self.ctx.ready().await?;

        let mut result = self
            .db()
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM type::record('{users}', $id)",
                users = self.ctx.user_table()
            ))
            .bind(("id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(User::from))
    }

    async fn find_by_normalized_user_name(
        &self,
        normalized_user_name: &str,
    ) -> IdentityResult<Option<User>> {
        self.disposed.check(STORE)?;
        if normalized_user_name.trim().is_empty() {
            return Ok(None);
        }

        let users = self
            .select_users(
                "normalized_user_name = $value LIMIT 1",
                self.ctx.normalize(normalized_user_name),
            )
            .await?;
        Ok(users.into_iter().next())
    }

    async fn find_by_normalized_email(
        &self,
        normalized_email: &str,
    ) -> IdentityResult<Option<User>> {
        self.disposed.check(STORE)?;
        if normalized_email.trim().is_empty() {
            return Ok(None);
        }

        let users = self
            .select_users(
                "normalized_email = $value LIMIT 1",
                self.ctx.normalize(normalized_email),
            )
            .await?;
        Ok(users.into_iter().next())
    }

    fn user_id(&self, user: &User) -> IdentityResult<String> {
        self.disposed.check(STORE)?;
        Ok(user.id.clone())
    }

    fn user_name(&self, user: &User) -> IdentityResult<String> {
        self.disposed.check(STORE)?;
        Ok(user.user_name.clone())
    }

    fn normalized_user_name(&self, user: &User) -> IdentityResult<String> {
        self.disposed.check(STORE)?;
        Ok(user.normalized_user_name.clone())
    }

    fn email(&self, user: &User) -> IdentityResult<Option<String>> {
        self.disposed.check(STORE)?;
        Ok(user.email.clone())
    }

    fn normalized_email(&self, user: &User) -> IdentityResult<Option<String>> {
        self.disposed.check(STORE)?;
        Ok(user.normalized_email.clone())
    }

    fn set_user_name(&self, user: &mut User, user_name: &str) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        user.user_name = user_name.to_string();
        user.normalized_user_name = self.ctx.normalize(user_name);
        Ok(())
    }

    fn set_normalized_user_name(
        &self,
        user: &mut User,
        normalized_user_name: &str,
    ) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        user.normalized_user_name = self.ctx.normalize(normalized_user_name);
        Ok(())
    }

    fn set_email(&self, user: &mut User, email: Option<&str>) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        user.email = email.map(str::to_string);
        user.normalized_email = email.map(|e| self.ctx.normalize(e));
        Ok(())
    }

    fn set_normalized_email(
        &self,
        user: &mut User,
        normalized_email: Option<&str>,
    ) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        user.normalized_email = normalized_email.map(|e| self.ctx.normalize(e));
        Ok(())
    }

    fn claims(&self, user: &User) -> IdentityResult<Vec<Claim>> {
        self.disposed.check(STORE)?;
        Ok(user.all_claims())
    }

    async fn add_claims(&self, user: &mut User, claims: &[Claim]) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        for claim in claims {
            require(&claim.claim_type, "claim.claim_type")?;
        }

        let mut changed = false;
        for claim in claims {
            changed |= set::add_distinct(&mut user.claims, claim.clone(), Claim::matches);
        }
        if changed {
            self.write_claims(user).await?;
        }
        Ok(())
    }

    async fn remove_claims(&self, user: &mut User, claims: &[Claim]) -> IdentityResult<()> {
        self.disposed.check(STORE)?;

        let removed: usize = claims
            .iter()
            .map(|claim| set::remove_matching(&mut user.claims, claim, Claim::matches))
            .sum();
        if removed > 0 {
            self.write_claims(user).await?;
        }
        Ok(())
    }

    async fn replace_claim(
        &self,
        user: &mut User,
        claim: &Claim,
        new_claim: Claim,
    ) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        require(&new_claim.claim_type, "new_claim.claim_type")?;

        if set::remove_matching(&mut user.claims, claim, Claim::matches) == 0 {
            return Ok(());
        }
        set::add_distinct(&mut user.claims, new_claim, Claim::matches);
        self.write_claims(user).await
    }

    async fn users_for_claim(&self, claim: &Claim) -> IdentityResult<Vec<User>> {
        self.disposed.check(STORE)?;
        require(&claim.claim_type, "claim.claim_type")?;
        self.ctx.ready().await?;

        // `string::lowercase` and `fold_eq` fold identically, so the database
        // filter and `Claim::matches` accept the same users.
        let matching = "[WHERE string::lowercase(claim_type) = $claim_type \
                        AND string::lowercase(claim_value) = $claim_value]";
        let mut result = self
            .db()
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM {users} \
                 WHERE claims{matching} != [] \
                 OR roles[WHERE claims{matching} != []] != []",
                users = self.ctx.user_table()
            ))
            .bind(("claim_type", claim.claim_type.to_lowercase()))
            .bind(("claim_value", claim.claim_value.to_lowercase()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(User::from)
            .filter(|user| user.all_claims().iter().any(|c| c.matches(claim)))
            .collect())
    }

    fn logins(&self, user: &User) -> IdentityResult<Vec<Login>> {
        self.disposed.check(STORE)?;
        Ok(user.logins.clone())
    }

    async fn add_login(&self, user: &mut User, login: Login) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        require(&login.login_provider, "login.login_provider")?;
        require(&login.provider_key, "login.provider_key")?;

        match user.logins.iter_mut().find(|existing| existing.matches(&login)) {
            Some(existing) => {
                if existing.login_provider == login.login_provider
                    && existing.provider_key == login.provider_key
                    && existing.provider_display_name == login.provider_display_name
                {
                    return Ok(());
                }
                *existing = login;
            }
            None => user.logins.push(login),
        }
        self.write_logins(user).await
    }

    async fn remove_login(
        &self,
        user: &mut User,
        login_provider: &str,
        provider_key: &str,
    ) -> IdentityResult<()> {
        self.disposed.check(STORE)?;

        let before = user.logins.len();
        user.logins
            .retain(|login| !login.is_for(login_provider, provider_key));
        if user.logins.len() != before {
            self.write_logins(user).await?;
        }
        Ok(())
    }

    async fn find_by_login(
        &self,
        login_provider: &str,
        provider_key: &str,
    ) -> IdentityResult<Option<User>> {
        self.disposed.check(STORE)?;
        if login_provider.trim().is_empty() || provider_key.trim().is_empty() {
            return Ok(None);
        }
        self.ctx.ready().await?;

        let mut result = self
            .db()
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM {users} \
                 WHERE logins[WHERE string::lowercase(login_provider) = $login_provider \
                 AND string::lowercase(provider_key) = $provider_key] != []",
                users = self.ctx.user_table()
            ))
            .bind(("login_provider", login_provider.to_lowercase()))
            .bind(("provider_key", provider_key.to_lowercase()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(User::from).find(|user| {
            user.logins
                .iter()
                .any(|login| login.is_for(login_provider, provider_key))
        }))
    }

    async fn add_to_role(&self, user: &mut User, role_name: &str) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        require(role_name, "role_name")?;
        self.ctx.ready().await?;

        let normalized_name = self.ctx.normalize(role_name);
        let role = fetch_by_normalized_name(&self.ctx, &normalized_name)
            .await?
            .ok_or_else(|| IdentityError::RoleNotFound {
                role_name: role_name.to_string(),
            })?;

        // Membership is by id: an embedded snapshot may still carry an old
        // name if a fan-out missed this user.
        match user.roles.iter_mut().find(|embedded| embedded.id == role.id) {
            Some(embedded) if *embedded == role => return Ok(()),
            Some(embedded) => {
                debug!(user_id = %user.id, role_id = %role.id, "Refreshing stale role snapshot");
                *embedded = role;
            }
            None => {
                debug!(user_id = %user.id, role_id = %role.id, "Adding user to role");
                user.roles.push(role);
            }
        }
        self.write_roles(user).await
    }

    async fn remove_from_role(&self, user: &mut User, role_name: &str) -> IdentityResult<()> {
        self.disposed.check(STORE)?;
        require(role_name, "role_name")?;

        let normalized_name = self.ctx.normalize(role_name);
        let before = user.roles.len();
        user.roles.retain(|role| role.normalized_name != normalized_name);
        if user.roles.len() != before {
            self.write_roles(user).await?;
        }
        Ok(())
    }

    fn roles(&self, user: &User) -> IdentityResult<Vec<String>> {
        self.disposed.check(STORE)?;
        Ok(user.roles.iter().map(|role| role.name.clone()).collect())
    }

    fn is_in_role(&self, user: &User, role_name: &str) -> IdentityResult<bool> {
        self.disposed.check(STORE)?;
        let normalized_name = self.ctx.normalize(role_name);
        Ok(user.role_by_normalized_name(&normalized_name).is_some())
    }

    async fn users_in_role(&self, role_name: &str) -> IdentityResult<Vec<User>> {
        self.disposed.check(STORE)?;
        if role_name.trim().is_empty() {
            return Ok(Vec::new());
        }

        self.select_users(
            "roles.normalized_name CONTAINS $value",
            self.ctx.normalize(role_name),
        )
        .await
    }

    fn dispose(&self) {
        self.disposed.dispose();
    }
}

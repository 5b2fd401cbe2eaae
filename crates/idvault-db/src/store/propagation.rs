//! Fan-out of role changes into the snapshots embedded in user documents.
//!
//! The role record is written first and is the point of truth. Afterwards
//! every user that embeds the role gets its own single-record update,
//! issued concurrently. Each update rewrites only the matching `roles`
//! element and is evaluated server-side against the current document, so
//! concurrent edits to other fields or other roles of the same user are
//! not overwritten. There is no rollback: a failed user update leaves that
//! user with a stale snapshot, which is logged and counted in the returned
//! [`Propagation`].

use futures::future::join_all;
use idvault_core::models::Role;
use idvault_core::store::Propagation;
use surrealdb::Connection;
use tracing::{debug, warn};

use crate::context::IdentityContext;
use crate::document::RoleSnapshot;
use crate::error::DbError;

/// Replaces the embedded copy of `role` in every user that holds it.
pub(crate) async fn refresh_role<C: Connection>(
    ctx: &IdentityContext<C>,
    role: &Role,
) -> Propagation {
    let statement = format!(
        "UPDATE type::record('{users}', $user_id) SET \
         roles = array::map(roles, |$r| IF $r.id = $role_id {{ $role }} ELSE {{ $r }})",
        users = ctx.user_table()
    );
    fan_out(ctx, &role.id, &statement, Some(RoleSnapshot::from(role)), "refresh").await
}

/// Removes the embedded copy of the role from every user that holds it.
pub(crate) async fn pull_role<C: Connection>(
    ctx: &IdentityContext<C>,
    role_id: &str,
) -> Propagation {
    let statement = format!(
        "UPDATE type::record('{users}', $user_id) SET \
         roles = roles[WHERE id != $role_id]",
        users = ctx.user_table()
    );
    fan_out(ctx, role_id, &statement, None, "pull").await
}

/// Ids of the users whose embedded roles include `role_id`.
pub(crate) async fn referencing_users<C: Connection>(
    ctx: &IdentityContext<C>,
    role_id: &str,
) -> Result<Vec<String>, DbError> {
    let mut result = ctx
        .db()
        .query(format!(
            "SELECT VALUE meta::id(id) FROM {users} \
             WHERE roles.id CONTAINS $role_id",
            users = ctx.user_table()
        ))
        .bind(("role_id", role_id.to_string()))
        .await?;

    let ids: Vec<String> = result.take(0)?;
    Ok(ids)
}

async fn fan_out<C: Connection>(
    ctx: &IdentityContext<C>,
    role_id: &str,
    statement: &str,
    snapshot: Option<RoleSnapshot>,
    action: &'static str,
) -> Propagation {
    let user_ids = match referencing_users(ctx, role_id).await {
        Ok(ids) => ids,
        Err(err) => {
            warn!(role_id, action, error = %err, "Could not find users embedding role");
            return Propagation {
                lookup_failed: true,
                ..Propagation::default()
            };
        }
    };

    let writes = user_ids.iter().map(|user_id| {
        let mut query = ctx
            .db()
            .query(statement)
            .bind(("user_id", user_id.clone()))
            .bind(("role_id", role_id.to_string()));
        if let Some(snapshot) = &snapshot {
            query = query.bind(("role", snapshot.clone()));
        }
        async move {
            let outcome = query.await.and_then(|response| response.check());
            (user_id, outcome)
        }
    });

    let mut report = Propagation {
        matched: user_ids.len(),
        ..Propagation::default()
    };
    for (user_id, outcome) in join_all(writes).await {
        match outcome {
            Ok(_) => report.updated += 1,
            Err(err) => {
                report.failed += 1;
                warn!(role_id, user_id = %user_id, action, error = %err, "Embedded role update failed");
            }
        }
    }

    if report.is_complete() {
        debug!(role_id, action, users = report.matched, "Propagated role change");
    } else {
        warn!(
            role_id,
            action,
            matched = report.matched,
            failed = report.failed,
            "Role change only partially propagated"
        );
    }
    report
}

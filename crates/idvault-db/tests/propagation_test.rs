//! Integration tests for fanning role changes out to embedded snapshots.

use std::sync::Arc;

use idvault_core::models::{Claim, Role, User};
use idvault_core::store::{RoleStore, UserStore};
use idvault_db::{IdentityContext, IdentityOptions, SurrealRoleStore, SurrealUserStore};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

type Stores = (SurrealUserStore<Db>, SurrealRoleStore<Db>);

async fn setup_with_context() -> (Arc<IdentityContext<Db>>, Stores) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    let options = IdentityOptions {
        create_indexes: true,
        ..IdentityOptions::default()
    };
    let ctx = Arc::new(IdentityContext::new(db, options).unwrap());
    let stores = (
        SurrealUserStore::new(ctx.clone()),
        SurrealRoleStore::new(ctx.clone()),
    );
    (ctx, stores)
}

async fn setup() -> Stores {
    setup_with_context().await.1
}

/// Creates a user that holds every named role.
async fn user_with_roles(users: &SurrealUserStore<Db>, name: &str, roles: &[&str]) -> User {
    let mut user = User::new(name);
    users.create(&mut user).await.unwrap();
    for role in roles {
        users.add_to_role(&mut user, role).await.unwrap();
    }
    user
}

async fn stored(users: &SurrealUserStore<Db>, user: &User) -> User {
    users.find_by_id(&user.id).await.unwrap().unwrap()
}

#[tokio::test]
async fn rename_reaches_every_embedding_user() {
    let (users, roles) = setup().await;
    let mut r1 = Role::new("R1");
    roles.create(&mut r1).await.unwrap();

    let u1 = user_with_roles(&users, "U1", &["R1"]).await;
    let u2 = user_with_roles(&users, "U2", &["R1"]).await;
    let u3 = user_with_roles(&users, "U3", &[]).await;

    roles.set_role_name(&mut r1, "R2").unwrap();
    let report = roles.update(&mut r1).await.unwrap();
    assert_eq!(report.matched, 2);
    assert_eq!(report.updated, 2);
    assert!(report.is_complete());

    for user in [&u1, &u2] {
        let user = stored(&users, user).await;
        assert_eq!(users.roles(&user).unwrap(), vec!["R2".to_string()]);
        assert!(users.is_in_role(&user, "r2").unwrap());
        assert!(!users.is_in_role(&user, "r1").unwrap());
    }
    assert!(stored(&users, &u3).await.roles.is_empty());

    assert_eq!(users.users_in_role("R2").await.unwrap().len(), 2);
    assert!(users.users_in_role("R1").await.unwrap().is_empty());
}

#[tokio::test]
async fn refresh_leaves_other_roles_and_fields_untouched() {
    let (users, roles) = setup().await;
    let mut a = Role::new("a");
    let mut b = Role::new("b");
    roles.create(&mut a).await.unwrap();
    roles.create(&mut b).await.unwrap();

    let mut user = user_with_roles(&users, "holder", &["a", "b"]).await;
    users
        .add_claims(&mut user, &[Claim::new("own", "claim")])
        .await
        .unwrap();

    roles.set_role_name(&mut a, "a-renamed").unwrap();
    roles.update(&mut a).await.unwrap();

    let fetched = stored(&users, &user).await;
    assert_eq!(
        users.roles(&fetched).unwrap(),
        vec!["a-renamed".to_string(), "b".to_string()]
    );
    assert_eq!(fetched.claims, vec![Claim::new("own", "claim")]);
}

#[tokio::test]
async fn role_claim_changes_reach_user_claims() {
    let (users, roles) = setup().await;
    let mut role = Role::new("readers");
    roles.create(&mut role).await.unwrap();
    let user = user_with_roles(&users, "reader", &["readers"]).await;

    let claim = Claim::new("scope", "read");
    let report = roles.add_claim(&mut role, claim.clone()).await.unwrap();
    assert_eq!(report.updated, 1);

    let fetched = stored(&users, &user).await;
    assert_eq!(users.claims(&fetched).unwrap(), vec![claim.clone()]);
    assert_eq!(users.users_for_claim(&claim).await.unwrap().len(), 1);

    roles.remove_claim(&mut role, &claim).await.unwrap();
    let fetched = stored(&users, &user).await;
    assert!(users.claims(&fetched).unwrap().is_empty());
    assert!(users.users_for_claim(&claim).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_pulls_only_the_deleted_role() {
    let (users, roles) = setup().await;
    let mut keep = Role::new("keep");
    let mut dropped = Role::new("drop");
    roles.create(&mut keep).await.unwrap();
    roles.create(&mut dropped).await.unwrap();

    let u1 = user_with_roles(&users, "U1", &["keep", "drop"]).await;
    let u2 = user_with_roles(&users, "U2", &["drop"]).await;

    let report = roles.delete(&dropped).await.unwrap();
    assert_eq!(report.matched, 2);
    assert!(report.is_complete());

    assert_eq!(
        users.roles(&stored(&users, &u1).await).unwrap(),
        vec!["keep".to_string()]
    );
    assert!(stored(&users, &u2).await.roles.is_empty());
    assert!(roles.find_by_id(&dropped.id).await.unwrap().is_none());
    assert!(roles.find_by_id(&keep.id).await.unwrap().is_some());
}

#[tokio::test]
async fn unreferenced_role_changes_match_nobody() {
    let (users, roles) = setup().await;
    let mut lonely = Role::new("lonely");
    roles.create(&mut lonely).await.unwrap();
    user_with_roles(&users, "bystander", &[]).await;

    let report = roles
        .add_claim(&mut lonely, Claim::new("k", "v"))
        .await
        .unwrap();
    assert_eq!(report.matched, 0);
    assert_eq!(report.updated, 0);
    assert!(report.is_complete());
}

#[tokio::test]
async fn unchanged_claim_set_skips_propagation() {
    let (users, roles) = setup().await;
    let mut role = Role::new("stable");
    roles.create(&mut role).await.unwrap();
    roles
        .add_claim(&mut role, Claim::new("k", "v"))
        .await
        .unwrap();
    user_with_roles(&users, "member", &["stable"]).await;

    let report = roles
        .add_claim(&mut role, Claim::new("K", "V"))
        .await
        .unwrap();
    assert_eq!(report, Default::default());
}

#[tokio::test]
async fn role_writes_succeed_when_user_lookup_fails() {
    let (ctx, (users, roles)) = setup_with_context().await;
    let mut role = Role::new("R1");
    roles.create(&mut role).await.unwrap();
    user_with_roles(&users, "U1", &["R1"]).await;

    // Without the user table the fan-out cannot find embedding users.
    ctx.drop_user_table().await.unwrap();

    roles.set_role_name(&mut role, "R2").unwrap();
    let report = roles.update(&mut role).await.unwrap();
    assert!(report.lookup_failed);
    assert!(!report.is_complete());
    assert_eq!(report.updated, 0);

    let stored_role = roles.find_by_id(&role.id).await.unwrap().unwrap();
    assert_eq!(stored_role.name, "R2");
    assert_eq!(stored_role.normalized_name, "r2");

    let report = roles.delete(&role).await.unwrap();
    assert!(report.lookup_failed);
    assert!(roles.find_by_id(&role.id).await.unwrap().is_none());
}

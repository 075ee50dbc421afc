//! Group shares: per-recipient overrides, self-removal, cascade
//! deletion, and directory lifecycle cleanup.

mod support;

use sharehub_core::config::sharing::SharingPolicy;
use sharehub_core::error::ErrorKind;
use sharehub_core::types::id::{GroupId, UserId};
use sharehub_core::types::pagination::Paging;
use sharehub_core::types::permissions::SharePermissions;
use sharehub_entity::share::{Share, ShareType};
use sharehub_provider::provider::ShareProvider;

use support::{TestEnv, full_id, group_share, link_share, user_share};

async fn seeded_group_share(env: &TestEnv) -> Share {
    env.manager
        .create_share(group_share("a", "g0", 2, SharePermissions::ALL))
        .await
        .expect("group share")
}

async fn shares_with(env: &TestEnv, user: &str) -> Vec<Share> {
    env.manager
        .get_shared_with(&UserId::new(user), ShareType::Group, None, Paging::all())
        .await
        .expect("recipient lookup")
}

#[tokio::test]
async fn test_override_wins_over_inherited_group_values() {
    let env = TestEnv::new();
    env.seed();
    let share = seeded_group_share(&env).await;

    // u2 hides the share; a zero-permission override row appears.
    env.manager
        .delete_from_self(&share, &UserId::new("u2"))
        .await
        .expect("hide for u2");

    let u2_view = shares_with(&env, "u2").await;
    assert_eq!(u2_view.len(), 1);
    assert_eq!(u2_view[0].permissions, SharePermissions::NONE);

    // The canonical group values still reach u1.
    let u1_view = shares_with(&env, "u1").await;
    assert_eq!(u1_view.len(), 1);
    assert_eq!(u1_view[0].permissions, SharePermissions::ALL);
}

#[tokio::test]
async fn test_delete_from_self_is_idempotent_and_isolated() {
    let env = TestEnv::new();
    env.seed();
    let share = seeded_group_share(&env).await;

    // u1 customizes the target first, creating an override row.
    let mut moved = share.clone();
    moved.target = "/team-docs".to_string();
    env.manager
        .move_share(moved, &UserId::new("u1"))
        .await
        .expect("move for u1");

    env.manager
        .delete_from_self(&share, &UserId::new("u2"))
        .await
        .expect("first self-removal");
    env.manager
        .delete_from_self(&share, &UserId::new("u2"))
        .await
        .expect("second self-removal is a no-op");

    // Still exactly one override per recipient, and u1's is untouched.
    let children = env.provider.get_children(&share).await.expect("children");
    assert_eq!(children.len(), 2);

    let u1_view = shares_with(&env, "u1").await;
    assert_eq!(u1_view[0].target, "/team-docs");
    assert_eq!(u1_view[0].permissions, SharePermissions::ALL);
}

#[tokio::test]
async fn test_delete_from_self_validates_membership() {
    let env = TestEnv::new();
    env.seed();
    let share = seeded_group_share(&env).await;

    // b is not a member of g0.
    let err = env
        .manager
        .delete_from_self(&share, &UserId::new("b"))
        .await
        .expect_err("non-member");
    assert_eq!(err.kind, ErrorKind::Provider);

    // A vanished group is a provider-level error too.
    env.directory.remove_group("g0");
    let err = env
        .manager
        .delete_from_self(&share, &UserId::new("u2"))
        .await
        .expect_err("vanished group");
    assert_eq!(err.kind, ErrorKind::Provider);
}

#[tokio::test]
async fn test_deleting_group_share_removes_all_override_rows() {
    let env = TestEnv::new();
    env.seed();
    let share = seeded_group_share(&env).await;

    let mut moved = share.clone();
    moved.target = "/elsewhere".to_string();
    env.manager
        .move_share(moved, &UserId::new("u1"))
        .await
        .expect("override for u1");
    env.manager
        .delete_from_self(&share, &UserId::new("u2"))
        .await
        .expect("override for u2");
    assert_eq!(env.provider.get_children(&share).await.expect("children").len(), 2);

    env.manager.delete_share(&share).await.expect("delete");

    let err = env
        .manager
        .get_share_by_id(&full_id(&share), None)
        .await
        .expect_err("group row gone");
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(env.provider.get_children(&share).await.expect("children").is_empty());
    assert!(shares_with(&env, "u1").await.is_empty());
    assert!(shares_with(&env, "u2").await.is_empty());
}

#[tokio::test]
async fn test_move_share_is_recipient_scoped() {
    let env = TestEnv::new();
    env.seed();

    // User shares just update their target.
    let user = env
        .manager
        .create_share(user_share("a", "b", 3, SharePermissions::READ))
        .await
        .expect("user share");
    let mut moved = user.clone();
    moved.target = "/inbox/notes.txt".to_string();
    let err = env
        .manager
        .move_share(moved.clone(), &UserId::new("c"))
        .await
        .expect_err("only the recipient may move");
    assert_eq!(err.user_message(), "Invalid share recipient");
    let moved = env
        .manager
        .move_share(moved, &UserId::new("b"))
        .await
        .expect("recipient moves");
    assert_eq!(moved.target, "/inbox/notes.txt");

    // Group moves only affect the acting member.
    let group = seeded_group_share(&env).await;
    let mut moved = group.clone();
    moved.target = "/u1-docs".to_string();
    env.manager
        .move_share(moved, &UserId::new("u1"))
        .await
        .expect("u1 moves");
    assert_eq!(shares_with(&env, "u1").await[0].target, "/u1-docs");
    assert_eq!(shares_with(&env, "u2").await[0].target, group.target);

    // Link shares have no recipient to move for.
    let link = env
        .manager
        .create_share(link_share("a", 2, SharePermissions::READ))
        .await
        .expect("link share");
    let err = env
        .manager
        .move_share(link, &UserId::new("b"))
        .await
        .expect_err("links cannot move");
    assert_eq!(err.user_message(), "Cannot change target of link share");
}

#[tokio::test]
async fn test_restore_after_self_removal() {
    let env = TestEnv::new();
    env.seed();
    let share = seeded_group_share(&env).await;

    env.manager
        .delete_from_self(&share, &UserId::new("u2"))
        .await
        .expect("hide");
    assert_eq!(
        shares_with(&env, "u2").await[0].permissions,
        SharePermissions::NONE
    );

    let restored = env
        .manager
        .restore_share(&share, &UserId::new("u2"))
        .await
        .expect("restore");
    assert_eq!(restored.permissions, SharePermissions::ALL);
    assert_eq!(
        shares_with(&env, "u2").await[0].permissions,
        SharePermissions::ALL
    );
}

#[tokio::test]
async fn test_link_share_deletion_triggers_are_asymmetric() {
    let env = TestEnv::new();
    env.seed();
    env.tree.grant("b", 2, SharePermissions::ALL);

    // Link owned by a, initiated by b.
    let link = env
        .manager
        .create_share(link_share("b", 2, SharePermissions::READ))
        .await
        .expect("link by b");
    assert_eq!(link.share_owner.as_str(), "a");
    let token = link.token.clone().expect("token");

    // Deleting an unrelated account does not touch the link.
    env.manager
        .user_deleted(&UserId::new("c"))
        .await
        .expect("unrelated deletion");
    env.provider.get_by_token(&token).await.expect("link survives");

    let user = env
        .manager
        .create_share(user_share("b", "c", 2, SharePermissions::READ))
        .await
        .expect("user share by b");

    // Deleting the initiating account removes the link share but not
    // the user share, whose matching parties are a and c.
    env.manager
        .user_deleted(&UserId::new("b"))
        .await
        .expect("initiator deletion");
    let err = env.provider.get_by_token(&token).await.expect_err("link gone");
    assert_eq!(err.kind, ErrorKind::NotFound);
    env.manager
        .get_share_by_id(&full_id(&user), None)
        .await
        .expect("user share survives initiator deletion");
}

#[tokio::test]
async fn test_user_removed_from_group_drops_their_override() {
    let env = TestEnv::new();
    env.seed();
    let share = seeded_group_share(&env).await;

    env.manager
        .delete_from_self(&share, &UserId::new("u2"))
        .await
        .expect("override for u2");
    assert_eq!(env.provider.get_children(&share).await.expect("children").len(), 1);

    env.directory.remove_from_group("g0", "u2");
    env.manager
        .user_removed_from_group(&UserId::new("u2"), &GroupId::new("g0"))
        .await
        .expect("membership cleanup");

    assert!(env.provider.get_children(&share).await.expect("children").is_empty());
    assert!(shares_with(&env, "u2").await.is_empty());
}

#[tokio::test]
async fn test_group_deleted_cleans_shares_and_policy() {
    let env = TestEnv::with_policy(SharingPolicy {
        excluded_groups: vec![GroupId::new("g0")],
        ..SharingPolicy::default()
    });
    env.seed();
    // u1 is in the excluded group, so seed the share directly.
    let share = env
        .provider
        .create(group_share("a", "g0", 2, SharePermissions::ALL))
        .await
        .expect("group share");
    env.manager
        .delete_from_self(&share, &UserId::new("u2"))
        .await
        .expect("override");

    env.directory.remove_group("g0");
    env.manager
        .group_deleted(&GroupId::new("g0"))
        .await
        .expect("group cleanup");

    assert!(env.provider.get_children(&share).await.expect("children").is_empty());
    let err = env
        .manager
        .get_share_by_id(&full_id(&share), None)
        .await
        .expect_err("group share gone");
    assert_eq!(err.kind, ErrorKind::NotFound);

    // The deleted group no longer appears in the exclusion list.
    assert!(env.manager.policy().await.excluded_groups.is_empty());
}

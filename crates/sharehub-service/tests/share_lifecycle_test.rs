//! Share lifecycle: expiration policy boundaries, lazy expiry cleanup,
//! update semantics, and password verification.

mod support;

use chrono::{Duration, Utc};

use sharehub_core::config::sharing::{ExpirationPolicy, SharingPolicy};
use sharehub_core::error::ErrorKind;
use sharehub_core::types::id::UserId;
use sharehub_core::types::pagination::Paging;
use sharehub_core::types::permissions::SharePermissions;
use sharehub_entity::share::ShareType;
use sharehub_provider::provider::ShareProvider;

use support::{TestEnv, full_id, link_share, user_share};

fn enforced_policy(days: i64) -> SharingPolicy {
    SharingPolicy {
        internal_expiration: ExpirationPolicy {
            default_enabled: true,
            enforced: true,
            days,
        },
        ..SharingPolicy::default()
    }
}

#[tokio::test]
async fn test_expiration_in_the_past_is_rejected() {
    let env = TestEnv::with_policy(enforced_policy(3));
    env.seed();

    let mut share = user_share("a", "b", 3, SharePermissions::READ);
    share.expiration = Some(Utc::now() - Duration::days(1));

    let err = env.manager.create_share(share).await.expect_err("past date");
    assert_eq!(err.kind, ErrorKind::Policy);
    assert_eq!(err.user_message(), "Expiration date is in the past");
}

#[tokio::test]
async fn test_expiration_window_boundary() {
    let env = TestEnv::with_policy(enforced_policy(3));
    env.seed();

    // Exactly the maximum distance is accepted.
    let mut at_limit = user_share("a", "b", 3, SharePermissions::READ);
    at_limit.expiration = Some(Utc::now() + Duration::days(3));
    env.manager
        .create_share(at_limit)
        .await
        .expect("limit day accepted");

    // One day further is rejected.
    let mut beyond = user_share("a", "c", 3, SharePermissions::READ);
    beyond.expiration = Some(Utc::now() + Duration::days(4));
    let err = env.manager.create_share(beyond).await.expect_err("beyond limit");
    assert_eq!(err.kind, ErrorKind::Policy);
    assert_eq!(
        err.user_message(),
        "Cannot set expiration date more than 3 days in the future"
    );
}

#[tokio::test]
async fn test_default_expiration_applied_to_new_shares() {
    let env = TestEnv::with_policy(enforced_policy(3));
    env.seed();

    let created = env
        .manager
        .create_share(user_share("a", "b", 3, SharePermissions::READ))
        .await
        .expect("create without a date");

    let expiration = created.expiration.expect("default applied");
    let distance = expiration - Utc::now();
    assert!(distance > Duration::days(2) && distance <= Duration::days(4));
}

#[tokio::test]
async fn test_expired_share_is_deleted_on_lookup() {
    let env = TestEnv::new();
    env.seed();

    let created = env
        .manager
        .create_share(user_share("a", "b", 3, SharePermissions::READ))
        .await
        .expect("create");

    // Expire it behind the manager's back; providers do not re-validate.
    let mut expired = created.clone();
    expired.expiration = Some(Utc::now() - Duration::hours(1));
    env.provider
        .update(expired, None)
        .await
        .expect("backdoor expiry");

    let received = env
        .manager
        .get_shared_with(&UserId::new("b"), ShareType::User, None, Paging::all())
        .await
        .expect("lookup");
    assert!(received.is_empty());

    // The lookup deleted the row for good.
    let err = env
        .manager
        .get_share_by_id(&full_id(&created), None)
        .await
        .expect_err("share is gone");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_update_keeps_unchanged_password() {
    let env = TestEnv::new();
    env.seed();

    let mut draft = link_share("a", 2, SharePermissions::READ);
    draft.password = Some("mv!K3rn7-plover-Qz".to_string());
    let created = env.manager.create_share(draft).await.expect("create");
    let stored = created.password.clone().expect("hash");

    // Re-submitting the stored hash leaves the password untouched.
    let updated = env
        .manager
        .update_share(created.clone())
        .await
        .expect("update with hash");
    assert_eq!(updated.password.as_deref(), Some(stored.as_str()));

    // Re-submitting the matching plaintext also leaves it untouched.
    let mut same_plain = created.clone();
    same_plain.password = Some("mv!K3rn7-plover-Qz".to_string());
    let updated = env
        .manager
        .update_share(same_plain)
        .await
        .expect("update with plaintext");
    assert_eq!(updated.password.as_deref(), Some(stored.as_str()));

    // A new plaintext is rehashed.
    let mut new_plain = created.clone();
    new_plain.password = Some("Another-9-strong pass".to_string());
    let updated = env.manager.update_share(new_plain).await.expect("new password");
    let new_hash = updated.password.clone().expect("hash");
    assert_ne!(new_hash, stored);
    assert!(env
        .manager
        .check_password(&updated, Some("Another-9-strong pass"))
        .await
        .expect("verify"));
}

#[tokio::test]
async fn test_chat_password_toggle_requires_new_password() {
    let env = TestEnv::new();
    env.seed();

    let mut draft = link_share("a", 2, SharePermissions::READ);
    draft.password = Some("mv!K3rn7-plover-Qz".to_string());
    let created = env.manager.create_share(draft).await.expect("create");

    // Enabling the flag while reusing the existing password is refused.
    let mut toggle = created.clone();
    toggle.send_password_by_chat = true;
    let err = env.manager.update_share(toggle).await.expect_err("toggle on");
    assert_eq!(
        err.user_message(),
        "Cannot enable sending the password by chat without setting a new password"
    );

    // Enabling together with a fresh password works.
    let mut with_new = created.clone();
    with_new.send_password_by_chat = true;
    with_new.password = Some("Fresh-Chat pass 77!".to_string());
    let enabled = env.manager.update_share(with_new).await.expect("toggle with new");
    assert!(enabled.send_password_by_chat);

    // Disabling it without another fresh password is refused too.
    let mut toggle_off = enabled.clone();
    toggle_off.send_password_by_chat = false;
    let err = env
        .manager
        .update_share(toggle_off)
        .await
        .expect_err("toggle off");
    assert_eq!(
        err.user_message(),
        "Cannot disable sending the password by chat without setting a new password"
    );
}

#[tokio::test]
async fn test_update_cannot_change_share_type_or_recipient() {
    let env = TestEnv::new();
    env.seed();

    let created = env
        .manager
        .create_share(user_share("a", "b", 3, SharePermissions::READ))
        .await
        .expect("create");

    let mut retyped = created.clone();
    retyped.share_type = ShareType::Link;
    let err = env.manager.update_share(retyped).await.expect_err("type change");
    // The full id resolves to the persisted user share, so the type
    // mismatch is caught.
    assert_eq!(err.user_message(), "Cannot change share type");

    let group = env
        .manager
        .create_share(support::group_share("a", "g0", 2, SharePermissions::ALL))
        .await
        .expect("group share");
    let mut redirected = group.clone();
    redirected.shared_with = Some("g1".to_string());
    let err = env
        .manager
        .update_share(redirected)
        .await
        .expect_err("recipient change on group share");
    assert_eq!(
        err.user_message(),
        "Can only update recipient on user shares"
    );
}

#[tokio::test]
async fn test_check_password_rehashes_legacy_hash() {
    let env = TestEnv::new();
    env.seed();

    let mut draft = link_share("a", 2, SharePermissions::READ);
    draft.password = Some("mv!K3rn7-plover-Qz".to_string());
    let created = env.manager.create_share(draft).await.expect("create");

    // Swap in a legacy SHA-256 hash of "secret" behind the manager.
    let legacy = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b";
    let mut legacy_share = created.clone();
    legacy_share.password = Some(legacy.to_string());
    env.provider
        .update(legacy_share.clone(), None)
        .await
        .expect("backdoor legacy hash");

    assert!(!env
        .manager
        .check_password(&legacy_share, Some("wrong"))
        .await
        .expect("wrong candidate"));
    assert!(env
        .manager
        .check_password(&legacy_share, Some("secret"))
        .await
        .expect("correct candidate"));

    // The stored hash was transparently upgraded.
    let fetched = env
        .manager
        .get_share_by_id(&full_id(&created), None)
        .await
        .expect("fetch");
    let upgraded = fetched.password.clone().expect("hash present");
    assert!(upgraded.starts_with("$argon2id$"));
    assert!(env
        .manager
        .check_password(&fetched, Some("secret"))
        .await
        .expect("still valid"));
}

#[tokio::test]
async fn test_check_password_without_password_is_false() {
    let env = TestEnv::new();
    env.seed();

    let created = env
        .manager
        .create_share(link_share("a", 2, SharePermissions::READ))
        .await
        .expect("create without password");

    assert!(!env
        .manager
        .check_password(&created, Some("anything"))
        .await
        .expect("no stored password"));
    assert!(!env
        .manager
        .check_password(&created, None)
        .await
        .expect("no candidate"));
}

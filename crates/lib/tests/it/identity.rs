//! In-memory identity store: accounts, credentials and the event stream.

use marquee::{
    IdentityError,
    identity::{IdentityEventKind, IdentityStore, InMemoryIdentityStore},
};

use crate::helpers::*;

fn identity_err(err: marquee::Error) -> IdentityError {
    match err {
        marquee::Error::Identity(err) => err,
        other => panic!("Expected identity error, got {other:?}"),
    }
}

#[tokio::test]
async fn sign_up_normalizes_email_and_does_not_sign_in() {
    let store = identity_store();
    let identity = store.sign_up("  Jane@Acme.IO ", PASSWORD).await.unwrap();

    assert_eq!(identity.email, "jane@acme.io");
    assert_eq!(store.current_session().await.unwrap(), None);
    assert_eq!(store.find_identity("JANE@acme.io").await, Some(identity));
}

#[tokio::test]
async fn sign_up_rejections() {
    let store = identity_store();
    register(&store, "jane@acme.io").await;

    let err = identity_err(store.sign_up("jane@acme.io", PASSWORD).await.unwrap_err());
    assert!(matches!(err, IdentityError::AlreadyRegistered { .. }));
    assert!(err.is_conflict());

    let err = identity_err(store.sign_up("not-an-email", PASSWORD).await.unwrap_err());
    assert!(matches!(err, IdentityError::InvalidEmail { .. }));

    let err = identity_err(store.sign_up("bob@acme.io", "short").await.unwrap_err());
    assert!(matches!(err, IdentityError::WeakPassword { min_len: 6 }));

    assert_eq!(store.account_count().await, 1);
}

#[tokio::test]
async fn wrong_password_and_unknown_account_are_indistinguishable() {
    let store = identity_store();
    register(&store, "jane@acme.io").await;

    let wrong = identity_err(store.sign_in("jane@acme.io", "nope-nope").await.unwrap_err());
    let unknown = identity_err(store.sign_in("ghost@acme.io", PASSWORD).await.unwrap_err());
    assert!(matches!(wrong, IdentityError::InvalidCredentials));
    assert!(matches!(unknown, IdentityError::InvalidCredentials));
    assert!(wrong.is_auth_rejected());
}

#[tokio::test]
async fn unconfirmed_account_is_rejected_until_confirmed() {
    let store = InMemoryIdentityStore::with_clock(test_clock()).requiring_confirmation();
    register(&store, "jane@acme.io").await;

    let err = identity_err(store.sign_in("jane@acme.io", PASSWORD).await.unwrap_err());
    assert!(matches!(err, IdentityError::EmailNotConfirmed { .. }));
    assert!(err.is_auth_rejected());

    store.confirm_email("jane@acme.io").await.unwrap();
    store.sign_in("jane@acme.io", PASSWORD).await.unwrap();
}

#[tokio::test]
async fn events_are_delivered_in_order_to_every_subscriber() {
    let store = identity_store();
    let identity = register(&store, "jane@acme.io").await;
    let mut first = store.subscribe();
    let mut second = store.subscribe();

    store.sign_in("jane@acme.io", PASSWORD).await.unwrap();
    store.refresh_session();
    store.sign_out().await.unwrap();

    for subscription in [&mut first, &mut second] {
        let kinds: Vec<_> = std::iter::from_fn(|| subscription.try_recv())
            .map(|event| (event.kind, event.identity))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (IdentityEventKind::SignedIn, Some(identity.clone())),
                (IdentityEventKind::TokenRefreshed, Some(identity.clone())),
                (IdentityEventKind::SignedOut, None),
            ]
        );
    }
}

#[tokio::test]
async fn sign_out_without_session_emits_nothing() {
    let store = identity_store();
    let mut subscription = store.subscribe();
    store.sign_out().await.unwrap();
    assert!(subscription.try_recv().is_none());
}

#[tokio::test]
async fn unsubscribe_and_drop_detach() {
    let store = identity_store();
    let explicit = store.subscribe();
    let dropped = store.subscribe();
    assert_eq!(store.subscriber_count(), 2);

    explicit.unsubscribe();
    assert_eq!(store.subscriber_count(), 1);
    drop(dropped);
    assert_eq!(store.subscriber_count(), 0);
}

#[tokio::test]
async fn unavailable_store_reports_transport_errors() {
    let store = identity_store();
    register(&store, "jane@acme.io").await;
    store.set_unavailable(true);

    let err = identity_err(store.sign_in("jane@acme.io", PASSWORD).await.unwrap_err());
    assert!(err.is_transport_error());
    assert!(store.current_session().await.is_err());

    store.set_unavailable(false);
    store.sign_in("jane@acme.io", PASSWORD).await.unwrap();
}

#[tokio::test]
async fn accounts_survive_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identities.json");

    let store = identity_store();
    let identity = register(&store, "jane@acme.io").await;
    store.sign_in("jane@acme.io", PASSWORD).await.unwrap();
    store.save_to_file(&path).await.unwrap();

    let loaded = InMemoryIdentityStore::load_from_file(&path, test_clock())
        .await
        .unwrap();
    assert_eq!(loaded.find_identity("jane@acme.io").await, Some(identity));
    // Sessions are not persisted.
    assert_eq!(loaded.current_session().await.unwrap(), None);
    loaded.sign_in("jane@acme.io", PASSWORD).await.unwrap();
}

#[tokio::test]
async fn loading_missing_file_gives_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryIdentityStore::load_from_file(dir.path().join("none.json"), test_clock())
        .await
        .unwrap();
    assert_eq!(store.account_count().await, 0);
}

//! Capability derivation as seen through the session.

use marquee::{Capability, Role, capabilities_for};

use crate::helpers::*;

#[test]
fn hierarchy_is_nested() {
    let admin = capabilities_for(Role::Admin);
    let editor = capabilities_for(Role::Editor);
    let viewer = capabilities_for(Role::Viewer);

    assert!(admin.is_superset(&editor));
    assert!(editor.is_superset(&viewer));
    assert_eq!(admin.len(), Capability::ALL.len());
    assert_eq!(
        viewer.iter().collect::<Vec<_>>(),
        vec![Capability::ViewReports]
    );
}

#[test]
fn every_capability_is_granted_from_its_minimum_role_up() {
    for capability in Capability::ALL {
        for role in Role::ALL {
            assert_eq!(
                capabilities_for(role).contains(capability),
                role >= capability.minimum_role(),
                "{role} / {capability}"
            );
        }
    }
}

#[tokio::test]
async fn session_capabilities_follow_profile_role() {
    let identities = identity_store();
    let repository = tenant_repository();
    let identity = register(&identities, "viewer@acme.io").await;
    seed_tenant(&*repository, &identity, "Acme", "acme", Role::Viewer).await;

    let session = start_session(identities.clone(), repository.clone());
    assert!(session.capabilities().is_empty());

    session.sign_in("viewer@acme.io", PASSWORD).await.unwrap();
    let state = settle(&session).await;
    assert_eq!(state.role(), Some(Role::Viewer));
    assert!(state.capabilities().can_view_reports());
    assert!(!state.capabilities().can_manage_content());
    assert_eq!(session.capabilities(), capabilities_for(Role::Viewer));

    session.sign_out().await.unwrap();
    assert!(session.capabilities().is_empty());
}

#[tokio::test]
async fn role_change_is_picked_up_on_next_resolution() {
    let identities = identity_store();
    let repository = tenant_repository();
    let identity = register(&identities, "promoted@acme.io").await;
    seed_tenant(&*repository, &identity, "Acme", "acme", Role::Viewer).await;

    let session = start_session(identities.clone(), repository.clone());
    session.sign_in("promoted@acme.io", PASSWORD).await.unwrap();
    let before = settle(&session).await;
    assert!(!before.capabilities().can_manage_content());
    assert!(before.is_viewer() && !before.is_editor());
    session.sign_out().await.unwrap();

    repository
        .set_role(&identity.id, Role::Editor)
        .await
        .unwrap();

    session.sign_in("promoted@acme.io", PASSWORD).await.unwrap();
    let state = settle(&session).await;
    assert!(state.capabilities().can_manage_content());
    assert!(!state.capabilities().can_manage_users());
    assert!(state.is_editor() && state.is_viewer());
    assert!(!state.is_admin());
}

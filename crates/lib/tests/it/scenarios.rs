//! End-to-end account journeys.

use std::sync::Arc;

use marquee::{
    Capability, Clock, Company, FixedClock, Identity, Profile, Role, SessionConfig, SessionManager,
    SessionPhase, SubscriptionStatus, TenantRepository, TenantResolver, capabilities_for,
    tenant::InMemoryTenantRepository,
};

use crate::helpers::*;

fn company(id: &str, name: &str, slug: &str) -> Company {
    let now = FixedClock::default().now_datetime();
    Company {
        id: id.to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
        subscription_status: SubscriptionStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

fn profile(identity: &Identity, company_id: &str, role: Role) -> Profile {
    let now = FixedClock::default().now_datetime();
    Profile {
        id: identity.id.clone(),
        email: identity.email.clone(),
        company_id: company_id.to_string(),
        role,
        first_name: None,
        last_name: None,
        avatar_url: None,
        created_at: now,
        updated_at: now,
    }
}

fn resolver(repository: Arc<InMemoryTenantRepository>) -> TenantResolver {
    TenantResolver::new(repository, test_clock(), &SessionConfig::default())
}

/// Orphaned identity gets a trial company and an admin profile.
#[tokio::test]
async fn scenario_a_orphan_is_repaired() {
    let repository = tenant_repository();
    let u1 = Identity::new("u1", "jane@acme.io");

    let resolution = resolver(repository.clone()).resolve(&u1).await.unwrap();

    let company = resolution.company.expect("company created by repair");
    assert_eq!(company.name, "Empresa de jane");
    assert_eq!(company.subscription_status, SubscriptionStatus::Trial);
    assert_eq!(resolution.profile.id, "u1");
    assert_eq!(resolution.profile.role, Role::Admin);
    assert_eq!(resolution.profile.company_id, company.id);
    assert_eq!(repository.companies().await, vec![company]);
}

/// Editor with an existing company resolves to that pair and editor capabilities.
#[tokio::test]
async fn scenario_b_editor_resolves_existing_tenant() {
    let repository = tenant_repository();
    let u2 = Identity::new("u2", "editor@acme.io");
    repository
        .import_company(company("c9", "Acme", "acme"))
        .await
        .unwrap();
    repository
        .import_profile(profile(&u2, "c9", Role::Editor))
        .await
        .unwrap();

    let resolution = resolver(repository.clone()).resolve(&u2).await.unwrap();

    assert!(!resolution.repaired);
    assert_eq!(resolution.profile.role, Role::Editor);
    assert_eq!(resolution.company.map(|c| c.id).as_deref(), Some("c9"));

    let capabilities = capabilities_for(resolution.profile.role);
    assert_eq!(
        capabilities.iter().collect::<Vec<_>>(),
        vec![
            Capability::ManageContent,
            Capability::ManagePlaylists,
            Capability::ManageSchedules,
            Capability::ViewReports,
        ]
    );
    assert!(!capabilities.can_manage_users());
    assert!(!capabilities.can_manage_screens());
    assert_eq!(repository.companies().await.len(), 1);
}

/// A profile pointing at a missing company degrades the session without repair.
#[tokio::test]
async fn scenario_c_missing_company_degrades() {
    let identities = identity_store();
    let repository = tenant_repository();
    let u3 = register(&identities, "viewer@acme.io").await;
    let u3_profile = profile(&u3, "c-missing", Role::Viewer);
    repository.import_profile(u3_profile.clone()).await.unwrap();

    let resolution = resolver(repository.clone()).resolve(&u3).await.unwrap();
    assert_eq!(resolution.profile, u3_profile);
    assert_eq!(resolution.company, None);
    assert!(repository.companies().await.is_empty());

    // The session still reaches an authenticated state.
    let session = start_session(identities, repository.clone());
    session.sign_in("viewer@acme.io", PASSWORD).await.unwrap();
    let state = settle(&session).await;
    assert_eq!(state.phase, SessionPhase::Authenticated);
    assert_eq!(state.profile, Some(u3_profile));
    assert_eq!(state.company, None);
    assert!(state.is_degraded());
    assert!(state.capabilities().can_view_reports());
    assert!(repository.companies().await.is_empty());
}

/// Sign-up survives an unreachable setup step; first sign-in repairs the tenant.
#[tokio::test]
async fn scenario_d_sign_up_with_unreachable_setup_then_sign_in() {
    let identities = identity_store();
    let repository = tenant_repository();
    let setup = Arc::new(UnreachableSetup::default());
    let session = SessionManager::builder(identities.clone(), repository.clone())
        .clock(test_clock())
        .tenant_setup(setup.clone())
        .start();

    session
        .sign_up("jane@acme.io", PASSWORD, "Acme Signage")
        .await
        .unwrap();
    session.wait_for_tenant_setup().await;
    assert_eq!(setup.calls(), 1);
    assert!(repository.profiles().await.is_empty());

    session.sign_in("jane@acme.io", PASSWORD).await.unwrap();
    let state = settle(&session).await;

    let identity = state.identity.clone().unwrap();
    let profile = state.profile.clone().expect("profile repaired on sign-in");
    let company = state.company.clone().expect("company repaired on sign-in");
    assert_eq!(company.name, "Empresa de jane");
    assert_eq!(company.subscription_status, SubscriptionStatus::Trial);
    assert_eq!(profile.id, identity.id);
    assert_eq!(profile.role, Role::Admin);
    assert_eq!(profile.company_id, company.id);
    assert_eq!(state.capabilities(), capabilities_for(Role::Admin));
    assert_eq!(
        repository.get_profile_by_id(&identity.id).await.unwrap(),
        Some(profile)
    );
}

//! Tenant repository constraints, persistence and sign-up tenant setup.

use std::sync::Arc;

use marquee::{
    Identity, Role, SubscriptionStatus, TenantError, TenantRepository,
    tenant::{
        InMemoryTenantRepository, NewCompany, NewProfile, ProfileUpdate, RepositoryTenantSetup,
        TenantSetup, TenantSetupRequest,
    },
};

use crate::helpers::*;

fn request(identity: &Identity, company_name: &str) -> TenantSetupRequest {
    TenantSetupRequest {
        identity: identity.clone(),
        company_name: company_name.to_string(),
    }
}

#[tokio::test]
async fn setup_creates_trial_company_and_admin_profile() {
    let repository = tenant_repository();
    let setup = RepositoryTenantSetup::new(repository.clone(), test_clock());
    let identity = Identity::new("u-1", "ana@example.com");

    let (company, profile) = setup
        .setup_tenant(request(&identity, "Ana's Screens"))
        .await
        .unwrap();

    assert_eq!(company.name, "Ana's Screens");
    assert_eq!(company.slug, "ana-s-screens");
    assert_eq!(company.subscription_status, SubscriptionStatus::Trial);
    assert_eq!(profile.id, identity.id);
    assert_eq!(profile.company_id, company.id);
    assert_eq!(profile.role, Role::Admin);
    assert_eq!(
        repository.get_profile_by_id("u-1").await.unwrap(),
        Some(profile)
    );
}

#[tokio::test]
async fn setup_suffixes_a_taken_slug() {
    let repository = tenant_repository();
    let setup = RepositoryTenantSetup::new(repository.clone(), test_clock());

    let (first, _) = setup
        .setup_tenant(request(&Identity::new("u-1", "a@x.io"), "Acme"))
        .await
        .unwrap();
    let (second, _) = setup
        .setup_tenant(request(&Identity::new("u-2", "b@x.io"), "ACME"))
        .await
        .unwrap();

    assert_eq!(first.slug, "acme");
    assert!(second.slug.starts_with("acme-"));
    assert_ne!(first.id, second.id);
    assert_eq!(repository.companies().await.len(), 2);
}

#[tokio::test]
async fn setup_failure_creates_no_profile() {
    let repository = ScriptedRepository::new();
    repository.fail_company_insert(true);
    let setup = RepositoryTenantSetup::new(repository.clone(), test_clock());

    let err = setup
        .setup_tenant(request(&Identity::new("u-1", "a@x.io"), "Acme"))
        .await
        .unwrap_err();

    assert!(err.is_unavailable());
    assert_eq!(repository.profile_inserts(), 0);
    assert!(repository.inner.profiles().await.is_empty());
}

#[tokio::test]
async fn profile_must_reference_existing_company() {
    let repository = tenant_repository();
    let err = repository
        .insert_profile(NewProfile::admin("u-1", "a@x.io", "missing"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        marquee::Error::Tenant(TenantError::CompanyNotFound { .. })
    ));
}

#[tokio::test]
async fn update_of_missing_profile_is_not_found() {
    let repository = tenant_repository();
    let err = repository
        .update_profile("ghost", ProfileUpdate::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn unavailable_repository_fails_every_call() {
    let repository = tenant_repository();
    repository.set_unavailable(true);

    assert!(repository.get_profile_by_id("u-1").await.unwrap_err().is_unavailable());
    assert!(repository.get_company_by_id("c-1").await.unwrap_err().is_unavailable());
    assert!(
        repository
            .insert_company(NewCompany::trial("Acme", "acme"))
            .await
            .unwrap_err()
            .is_unavailable()
    );
}

#[tokio::test]
async fn records_survive_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tenants.json");

    let repository = tenant_repository();
    let identity = Identity::new("u-1", "a@x.io");
    let (company, profile) =
        seed_tenant(&*repository, &identity, "Acme", "acme", Role::Editor).await;
    repository.save_to_file(&path).await.unwrap();

    let loaded = InMemoryTenantRepository::load_from_file(&path, test_clock())
        .await
        .unwrap();
    assert_eq!(loaded.get_company_by_id(&company.id).await.unwrap(), Some(company));
    assert_eq!(loaded.get_profile_by_id("u-1").await.unwrap(), Some(profile));

    // Constraints still hold after loading.
    let err = loaded
        .insert_company(NewCompany::trial("Acme again", "acme"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn unsupported_persistence_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tenants.json");
    tokio::fs::write(&path, r#"{"_v": 9, "companies": {}, "profiles": {}}"#)
        .await
        .unwrap();

    let result = InMemoryTenantRepository::load_from_file(&path, Arc::new(marquee::SystemClock)).await;
    assert!(result.is_err());
}

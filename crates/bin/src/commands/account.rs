//! Account commands: signup, login, confirm and update-profile.

use marquee::{SessionManager, TenantRepository, tenant::ProfileUpdate};

use crate::cli::{ConfirmArgs, CredentialArgs, SignupArgs, UpdateProfileArgs};
use crate::output::{OutputFormat, print_session};
use crate::stores::Stores;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Run the `signup` command
pub async fn signup(stores: &Stores, args: &SignupArgs, format: OutputFormat) -> CommandResult {
    let session = stores.session();
    let credentials = &args.credentials;
    session
        .sign_up(&credentials.email, &credentials.password, &args.company)
        .await?;
    session.wait_for_tenant_setup().await;
    session.shutdown().await?;
    stores.save().await?;

    let identity = stores
        .identities
        .find_identity(&credentials.email)
        .await
        .ok_or("account missing after sign-up")?;
    let profile = stores.tenants.get_profile_by_id(&identity.id).await?;
    let company = match &profile {
        Some(profile) => stores.tenants.get_company_by_id(&profile.company_id).await?,
        None => None,
    };

    match format {
        OutputFormat::Human => {
            println!("Registered {} ({})", identity.email, identity.id);
            match company {
                Some(company) => println!("Company:  {} [{}]", company.name, company.slug),
                None => println!("Company:  pending, created on first login"),
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "identity": identity,
                "profile": profile,
                "company": company,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}

/// Run the `login` command
pub async fn login(stores: &Stores, args: &CredentialArgs, format: OutputFormat) -> CommandResult {
    let session = stores.session();
    let result = show_session(&session, args, format).await;
    // Self-repair may have written tenant records even if printing failed.
    finish(stores, &session).await?;
    result
}

async fn show_session(
    session: &SessionManager,
    args: &CredentialArgs,
    format: OutputFormat,
) -> CommandResult {
    session.sign_in(&args.email, &args.password).await?;
    let state = session.settled().await?;
    print_session(&state, format)?;
    Ok(())
}

/// Run the `confirm` command
pub async fn confirm(stores: &Stores, args: &ConfirmArgs, format: OutputFormat) -> CommandResult {
    stores.identities.confirm_email(&args.email).await?;
    stores.save().await?;
    match format {
        OutputFormat::Human => println!("Confirmed {}", args.email),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&serde_json::json!({ "confirmed": args.email }))?
            );
        }
    }
    Ok(())
}

/// Run the `update-profile` command
pub async fn update_profile(
    stores: &Stores,
    args: &UpdateProfileArgs,
    format: OutputFormat,
) -> CommandResult {
    let update = ProfileUpdate {
        email: args.profile_email.clone(),
        first_name: args.first_name.clone(),
        last_name: args.last_name.clone(),
        avatar_url: args.avatar_url.clone(),
    };
    if update.is_empty() {
        return Err("nothing to update; pass at least one profile field".into());
    }

    let session = stores.session();
    let result = apply_update(&session, &args.credentials, update, format).await;
    finish(stores, &session).await?;
    result
}

async fn apply_update(
    session: &SessionManager,
    credentials: &CredentialArgs,
    update: ProfileUpdate,
    format: OutputFormat,
) -> CommandResult {
    session
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    session.settled().await?;
    session.update_profile(update).await?;
    print_session(&session.snapshot(), format)?;
    Ok(())
}

/// Sign out, stop the session, and persist the stores.
async fn finish(stores: &Stores, session: &SessionManager) -> CommandResult {
    session.sign_out().await?;
    session.shutdown().await?;
    stores.save().await
}

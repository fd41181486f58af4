//! Store info command - shows data location, account and tenant counts.

use marquee::Role;

use crate::output::{OutputFormat, print_table};
use crate::stores::Stores;

/// Run the info command
pub async fn run(stores: &Stores, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let accounts = stores.identities.account_count().await;
    let companies = stores.tenants.companies().await;
    let profiles = stores.tenants.profiles().await;
    let data_dir = stores.data_dir().display().to_string();

    let members = |company_id: &str| {
        profiles
            .iter()
            .filter(|profile| profile.company_id == company_id)
            .count()
    };
    let admins = profiles
        .iter()
        .filter(|profile| profile.role == Role::Admin)
        .count();

    match format {
        OutputFormat::Human => {
            println!("Data dir:    {data_dir}");
            println!("Accounts:    {accounts}");
            println!("Companies:   {}", companies.len());
            println!("Profiles:    {} ({admins} admin)", profiles.len());
            if !companies.is_empty() {
                println!();
                let rows: Vec<Vec<String>> = companies
                    .iter()
                    .map(|company| {
                        vec![
                            company.slug.clone(),
                            company.name.clone(),
                            company.subscription_status.to_string(),
                            members(&company.id).to_string(),
                        ]
                    })
                    .collect();
                print_table(&["SLUG", "NAME", "STATUS", "MEMBERS"], &rows);
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "data_dir": data_dir,
                "accounts": accounts,
                "companies": companies.len(),
                "profiles": profiles.len(),
                "admins": admins,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    Ok(())
}

//! Role capability listing.

use marquee::{Capability, Role, capabilities_for};

use crate::cli::CapabilitiesArgs;
use crate::output::{OutputFormat, print_table};

/// Run the `capabilities` command
pub fn run(args: &CapabilitiesArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let roles: Vec<Role> = match args.role {
        Some(role) => vec![role],
        None => Role::ALL.to_vec(),
    };

    match format {
        OutputFormat::Human => {
            let mut headers = vec!["CAPABILITY"];
            headers.extend(roles.iter().map(|role| role.as_str()));
            let rows: Vec<Vec<String>> = Capability::ALL
                .iter()
                .map(|capability| {
                    let mut row = vec![capability.to_string()];
                    row.extend(roles.iter().map(|role| {
                        match capabilities_for(*role).contains(*capability) {
                            true => "yes".to_string(),
                            false => "-".to_string(),
                        }
                    }));
                    row
                })
                .collect();
            print_table(&headers, &rows);
        }
        OutputFormat::Json => {
            let mut value = serde_json::Map::new();
            for role in &roles {
                value.insert(
                    role.to_string(),
                    serde_json::to_value(capabilities_for(*role))?,
                );
            }
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}

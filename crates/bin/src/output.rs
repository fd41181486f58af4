//! Output formatting helpers for human-readable and JSON output.

use marquee::SessionState;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Print a table with aligned columns in human-readable format.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    println!("{}", aligned(headers, &widths));
    for row in rows {
        println!("{}", aligned(row, &widths));
    }
}

fn aligned<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Print a session snapshot and the capabilities derived from it.
pub fn print_session(state: &SessionState, format: OutputFormat) -> serde_json::Result<()> {
    match format {
        OutputFormat::Human => {
            let identity = state
                .identity
                .as_ref()
                .map(|identity| format!("{} ({})", identity.email, identity.id))
                .unwrap_or_else(|| "-".to_string());
            println!("Identity:      {identity}");
            match &state.profile {
                Some(profile) => {
                    println!("Name:          {}", profile.display_name());
                    println!("Role:          {}", profile.role);
                }
                None => println!("Profile:       unavailable"),
            }
            match &state.company {
                Some(company) => {
                    println!("Company:       {} [{}]", company.name, company.slug);
                    println!("Subscription:  {}", company.subscription_status);
                }
                None => println!("Company:       unavailable"),
            }
            let capabilities: Vec<&str> = state
                .capabilities()
                .iter()
                .map(|capability| capability.as_str())
                .collect();
            println!(
                "Capabilities:  {}",
                if capabilities.is_empty() {
                    "none".to_string()
                } else {
                    capabilities.join(", ")
                }
            );
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "session": state,
                "degraded": state.is_degraded(),
                "tiers": {
                    "admin": state.is_admin(),
                    "editor": state.is_editor(),
                    "viewer": state.is_viewer(),
                },
                "capabilities": state.capabilities(),
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }
    Ok(())
}

/*!
 * Identity and sender inspection
 */

use anyhow::Result;
use colored::*;
use idreg_core::IdentityRegistry;

use super::render::format_timestamp;

pub async fn show_identity<R: IdentityRegistry>(registry: &R, name: &str) -> Result<()> {
    let identity = match registry.get_identity(name).await? {
        Some(identity) => identity,
        None => {
            println!("{}", format!("{} is available", name).yellow());
            return Ok(());
        }
    };

    println!("{}", format!("=== {} ===", identity.name).bold().cyan());
    let state = if identity.enabled {
        "enabled".green()
    } else {
        "disabled".red()
    };
    println!("  State: {}", state);
    println!(
        "  Domain: {}",
        identity.domain.as_deref().unwrap_or("-")
    );
    println!("  Created: {}", format_timestamp(identity.created_at));
    println!("  Updated: {}", format_timestamp(identity.updated_at));
    println!("  Revision: {}", identity.revision);

    let members = registry.list_members(name).await?;
    println!("\n{}", "Members:".bold());
    for membership in members {
        println!(
            "  {} {} (joined {})",
            membership.user_sender,
            membership.membership_type.to_string().cyan(),
            format_timestamp(membership.joined_at)
        );
    }

    Ok(())
}

pub async fn show_sender<R: IdentityRegistry>(registry: &R, sender: &str) -> Result<()> {
    let user = match registry.get_user(sender).await? {
        Some(user) => user,
        None => {
            println!("{}", format!("{} is unknown", sender).yellow());
            return Ok(());
        }
    };

    println!("{}", format!("=== {} ===", user.sender).bold().cyan());
    println!(
        "  Primary identity: {}",
        user.primary_identity_name.as_deref().unwrap_or("-")
    );
    println!("  First seen: {}", format_timestamp(user.created_at));

    let memberships = registry.list_memberships_for_sender(sender).await?;
    println!("\n{}", "Memberships:".bold());
    if memberships.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for membership in memberships {
        println!(
            "  {} {}",
            membership.identity_name,
            membership.membership_type.to_string().cyan()
        );
    }

    Ok(())
}

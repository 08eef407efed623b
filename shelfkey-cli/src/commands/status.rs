//! Status command - show how stored catalog secrets are protected

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status(&ctx.config_store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Catalog Secret Status".bold());
    println!();

    let encryption = match &status.encryption.algorithm {
        Some(algorithm) if status.encryption.enabled => algorithm.green().to_string(),
        _ => "disabled (plaintext)".yellow().to_string(),
    };
    let key = if status.encryption.key_on_file { "on file" } else { "none" };
    println!("Encryption: {}", encryption);
    println!("Key: {}", key);
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Records", "With credentials", "Plaintext", "Encrypted"]);
    for (name, counts) in [("Users", &status.accounts), ("Cards", &status.cards)] {
        table.add_row(vec![
            name.to_string(),
            counts.total.to_string(),
            counts.plaintext.to_string(),
            counts.encrypted.to_string(),
        ]);
    }
    println!("{}", table);

    if status.has_stray_plaintext() {
        println!();
        output::warning("Some secrets are still stored in plaintext.");
        let algorithm = status.encryption.algorithm.as_deref().unwrap_or("aes");
        println!(
            "  Run {} to encrypt them.",
            format!("shelfkey rotate {}", algorithm).bold()
        );
    }

    Ok(())
}

//! Configuration view: `boardcard config`.

use console::style;

use boardcard::config::Settings;

fn or_unset(value: Option<&str>) -> String {
    value
        .map(str::to_string)
        .unwrap_or_else(|| style("(not set)").dim().to_string())
}

pub fn cmd_config(settings: &Settings) {
    println!();
    println!("Boardcard Configuration");
    println!("=======================");
    println!();

    match &settings.source {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: {}", style("none (using defaults)").dim()),
    }
    println!();

    println!("[relay]");
    println!("  port = {}", settings.relay.port);
    println!("  client_url = \"{}\"", settings.relay.client_url);
    println!();

    println!("[platform]");
    println!("  api_url = \"{}\"", settings.api_url);
    println!("  api_version = \"{}\"", settings.api_version);
    println!("  api_key = {}", or_unset(settings.masked_api_key().as_deref()));
    println!("  board_id = {}", or_unset(settings.board_id.as_deref()));
    println!("  item_id = {}", or_unset(settings.item_id.as_deref()));
    println!();

    println!("[drive]");
    println!("  relay_url = \"{}\"", settings.proxy_url);
    println!(
        "  google_client_id = {}",
        or_unset(settings.google_client_id.as_deref())
    );
    println!(
        "  google_client_secret = {}",
        if settings.google_client_secret.is_some() {
            "(set)".to_string()
        } else {
            or_unset(None)
        }
    );
    println!();

    println!("[[fields]]");
    for entry in settings.field_map.entries() {
        println!("  {} = \"{}\"", entry.key, entry.title);
    }

    if !settings.type_overrides.is_empty() {
        println!();
        println!("[types]");
        for (title, kind) in &settings.type_overrides {
            println!("  \"{}\" = \"{}\"", title, kind);
        }
    }
    println!();
}

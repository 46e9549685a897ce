//! Item card commands: `show`, `edit`, `status`, `delete`.

use std::sync::Arc;

use anyhow::{Result, bail};
use console::style;
use dialoguer::{Confirm, Select};

use boardcard::board::api::MondayClient;
use boardcard::board::query::StatusLabel;
use boardcard::board::store::ItemStore;
use boardcard::card::ItemCard;
use boardcard::config::Settings;
use boardcard::errors::PlatformError;
use boardcard::ui::{ConsoleNotifier, Notice, Notifier, render_card, styled_status};

const ITEM_ID_MISSING: &str = "Item ID not found";

/// Build a card for the configured item and load it.
pub(crate) async fn open_card(settings: &Settings) -> Result<ItemCard> {
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    let Some(item_id) = settings.item_id.clone() else {
        notifier.notify(Notice::error(ITEM_ID_MISSING));
        bail!("{} (pass --item or set ITEM_ID)", ITEM_ID_MISSING);
    };
    let Some(api_key) = settings.api_key.clone() else {
        return Err(PlatformError::MissingApiKey.into());
    };

    let api = MondayClient::new(api_key)
        .with_api_url(&settings.api_url)
        .with_api_version(&settings.api_version);
    let store = ItemStore::new(Arc::new(api), notifier);

    let mut card = ItemCard::new(
        store,
        Arc::new(settings.mapper()),
        item_id.clone(),
        settings.board_id.clone(),
    );
    if !card.load().await {
        bail!("Item {} could not be loaded", item_id);
    }
    Ok(card)
}

fn print_card(card: &ItemCard) {
    if let Some(item) = card.item() {
        println!();
        print!("{}", render_card(&item.name, &card.display_fields()));
        println!();
    }
}

fn require_board(settings: &Settings) -> Result<()> {
    if settings.board_id.is_none() {
        bail!("Board ID not found (pass --board or set BOARD_ID)");
    }
    Ok(())
}

pub async fn cmd_show(settings: &Settings, json: bool) -> Result<()> {
    let card = open_card(settings).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&card.display_fields())?);
    } else {
        print_card(&card);
    }
    Ok(())
}

pub async fn cmd_edit(settings: &Settings, key: &str, value: &str) -> Result<()> {
    require_board(settings)?;
    let mut card = open_card(settings).await?;

    if !card.begin_edit(key) {
        match card.field(key) {
            Some(field) if field.is_file() => bail!("'{}' is a file field and can't be edited", key),
            _ => bail!("Field '{}' is not on this item", key),
        }
    }

    let unchanged = card.pending().is_some_and(|edit| edit.value == value);
    card.change(value);
    if unchanged {
        card.escape();
        println!("{} is already '{}'", key, value);
        return Ok(());
    }

    if !card.commit().await {
        bail!("Field '{}' was not saved", key);
    }
    print_card(&card);
    Ok(())
}

pub async fn cmd_status(settings: &Settings, label: Option<&str>) -> Result<()> {
    require_board(settings)?;
    let mut card = open_card(settings).await?;

    let label = match label {
        Some(label) => label.to_string(),
        None => {
            let current = card.status().unwrap_or_default();
            let options: Vec<String> = StatusLabel::ALL.iter().map(|l| styled_status(l.as_str())).collect();
            let default = StatusLabel::ALL
                .iter()
                .position(|l| l.as_str() == current)
                .unwrap_or(0);
            let choice = tokio::task::block_in_place(|| {
                Select::new()
                    .with_prompt("Status")
                    .items(&options)
                    .default(default)
                    .interact_opt()
            })?;
            match choice {
                Some(index) => StatusLabel::ALL[index].as_str().to_string(),
                None => {
                    println!("Status unchanged");
                    return Ok(());
                }
            }
        }
    };

    if !card.change_status(&label).await {
        bail!("Status was not changed");
    }
    println!(
        "Status: {}",
        styled_status(&card.status().unwrap_or_default())
    );
    Ok(())
}

pub async fn cmd_delete(settings: &Settings, yes: bool) -> Result<()> {
    let mut card = open_card(settings).await?;
    let name = card.item().map(|i| i.name.clone()).unwrap_or_default();

    if !yes {
        let prompt = format!(
            "Delete '{}'? You won't be able to revert this!",
            style(&name).bold()
        );
        let confirm = tokio::task::block_in_place(|| {
            Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
                .unwrap_or(false)
        });
        if !confirm {
            println!("Delete cancelled");
            return Ok(());
        }
    }

    if !card.delete().await {
        bail!("Item was not deleted");
    }
    Ok(())
}

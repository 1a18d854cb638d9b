use std::io::Read;

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use promptlib_store::{Prompt, PromptFilter};

use crate::debounce::debounce;
use crate::popup::Popup;

const PREVIEW_CHARS: usize = 60;

pub async fn handle_list(popup: &mut Popup, json: bool) -> Result<()> {
    let prompts = load(popup, PromptFilter::default()).await?;
    print_prompts(&prompts, json)
}

pub async fn handle_search(
    popup: &mut Popup,
    query: Option<String>,
    modality: Option<String>,
    json: bool,
) -> Result<()> {
    let filter = PromptFilter::from_inputs(
        query.as_deref().unwrap_or_default(),
        modality.as_deref().unwrap_or_default(),
    );
    let prompts = load(popup, filter).await?;
    print_prompts(&prompts, json)
}

/// Search through the popup; a failed load is an error rather than stale results.
async fn load(popup: &mut Popup, filter: PromptFilter) -> Result<Vec<Prompt>> {
    let prompts = popup.search(filter).await.to_vec();
    if popup.is_stale() {
        anyhow::bail!("Failed to load prompts");
    }
    Ok(prompts)
}

pub async fn handle_add(
    popup: &mut Popup,
    text: String,
    modality: String,
    tags: Option<String>,
    json: bool,
) -> Result<()> {
    let text = if text == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read prompt from stdin")?;
        buf
    } else {
        text
    };

    let saved = popup
        .save(&text, &modality, tags.as_deref().unwrap_or_default())
        .await;

    match saved {
        Some(prompt) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&prompt)?);
            } else {
                println!("{}", prompt.id);
            }
            Ok(())
        }
        None => anyhow::bail!("Prompt was not saved"),
    }
}

pub async fn handle_copy(popup: &mut Popup, id: Option<String>) -> Result<()> {
    let prompt = resolve_prompt(popup, id, "Select a prompt to copy").await?;

    if popup.copy(&prompt).await {
        Ok(())
    } else {
        anyhow::bail!("Prompt was not copied")
    }
}

pub async fn handle_remove(popup: &mut Popup, id: Option<String>, yes: bool) -> Result<()> {
    let (id, label) = match id {
        Some(id) => match find_prompt(popup, &id).await? {
            Some(prompt) => {
                let label = prompt.preview(PREVIEW_CHARS);
                (prompt.id, label)
            }
            // Unknown ids go through anyway; deleting them is a no-op.
            None => (id.clone(), id),
        },
        None => {
            let prompt = pick_prompt(popup, "Select a prompt to delete").await?;
            let label = prompt.preview(PREVIEW_CHARS);
            (prompt.id, label)
        }
    };

    popup.request_delete(id);

    let confirmed = yes
        || dialoguer::Confirm::new()
            .with_prompt(format!("Delete \"{}\"? This cannot be undone.", label))
            .default(false)
            .interact()?;

    if confirmed {
        if popup.confirm_delete().await.is_none() {
            anyhow::bail!("Prompt was not deleted");
        }
    } else {
        popup.cancel_delete();
    }

    Ok(())
}

/// Search as queries arrive on stdin, one per line, coalescing bursts.
pub async fn handle_live(
    popup: &mut Popup,
    modality: Option<String>,
    quiet: std::time::Duration,
    json: bool,
) -> Result<()> {
    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let modality = modality.unwrap_or_default();
    let mut queries = debounce(rx, quiet);

    while let Some(query) = queries.recv().await {
        let results = popup
            .search(PromptFilter::from_inputs(query.trim(), &modality))
            .await
            .to_vec();

        if !json {
            println!("{} {}", "?".bright_blue(), query.trim().bold());
        }
        print_prompts(&results, json)?;
    }

    Ok(())
}

pub fn handle_modalities(modalities: &[String]) {
    for modality in modalities {
        println!("{}", modality);
    }
}

async fn resolve_prompt(popup: &mut Popup, id: Option<String>, title: &str) -> Result<Prompt> {
    match id {
        Some(id) => find_prompt(popup, &id)
            .await?
            .with_context(|| format!("No prompt with id {}", id)),
        None => pick_prompt(popup, title).await,
    }
}

/// Look a prompt up by full id, or by an id prefix that matches exactly one prompt.
async fn find_prompt(popup: &Popup, id: &str) -> Result<Option<Prompt>> {
    let prompts = popup.store().list_all().await?;

    if let Some(exact) = prompts.iter().find(|p| p.id == id) {
        return Ok(Some(exact.clone()));
    }

    let mut matches = prompts.into_iter().filter(|p| p.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(Some(only)),
        (Some(_), Some(_)) => anyhow::bail!("Id prefix {} matches several prompts", id),
        _ => Ok(None),
    }
}

async fn pick_prompt(popup: &mut Popup, title: &str) -> Result<Prompt> {
    let prompts = load(popup, PromptFilter::default()).await?;
    if prompts.is_empty() {
        anyhow::bail!("No prompts found.");
    }

    let items: Vec<String> = prompts.iter().map(picker_label).collect();

    let selection = dialoguer::FuzzySelect::new()
        .with_prompt(title)
        .items(&items)
        .default(0)
        .interact()?;

    Ok(prompts[selection].clone())
}

fn picker_label(prompt: &Prompt) -> String {
    let tags = if prompt.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", prompt.tags.join(", "))
    };
    format!(
        "{:6} | {}{}",
        prompt.modality,
        prompt.preview(PREVIEW_CHARS),
        tags
    )
}

fn print_prompts(prompts: &[Prompt], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(prompts)?);
        return Ok(());
    }

    if prompts.is_empty() {
        println!("{}", "No prompts found".dimmed());
        println!(
            "{}",
            "Try a different search or add a new prompt".dimmed()
        );
        return Ok(());
    }

    for prompt in prompts {
        let short_id: String = prompt.id.chars().take(8).collect();
        println!(
            "{}  {}  {}",
            short_id.dimmed(),
            format!("{:6}", prompt.modality).cyan(),
            prompt.preview(PREVIEW_CHARS)
        );
        if !prompt.tags.is_empty() {
            let tags: Vec<String> = prompt
                .tags
                .iter()
                .map(|t| format!("#{}", t))
                .collect();
            println!("          {}", tags.join(" ").bright_black());
        }
    }

    Ok(())
}

//! `easyai prompt` and `easyai prompts`

use std::collections::HashMap;

use anyhow::{bail, Result};
use colored::Colorize;

use crate::config::{Config, Settings};
use crate::models::prompt::PromptMeta;
use crate::models::provider::Provider;
use crate::services::{playground_service, prompt_service, template_service};
use crate::state::AppState;

use super::{format, playground};

/// What `easyai prompts` should do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    List,
    Create(String),
    Edit(String),
    Delete(String),
    Search(String),
}

/// Fill `{{input}}` with `input` when the prompt has that placeholder and no
/// explicit value was given; otherwise append it after a blank line.
fn apply_input(content: &str, input: Option<String>, vars: &mut HashMap<String, String>) -> String {
    let Some(input) = input else {
        return content.to_string();
    };
    let has_placeholder = template_service::detect_variables(content).iter().any(|v| v == "input");
    if has_placeholder && !vars.contains_key("input") {
        vars.insert("input".to_string(), input);
        content.to_string()
    } else {
        format!("{}\n\n{}", content.trim_end(), input)
    }
}

/// Run a saved prompt once and print the result.
pub async fn run_prompt(
    config: &Config,
    reference: &str,
    model: Option<String>,
    input: Option<String>,
    vars: Vec<(String, String)>,
    provider: Option<Provider>,
) -> Result<()> {
    let prompt = prompt_service::find(&config.workspace.prompts_dir(), reference).await?;
    let mut vars: HashMap<String, String> = vars.into_iter().collect();
    let content = apply_input(&prompt.content, input, &mut vars);

    let missing = template_service::missing_variables(&content, &vars);
    if !missing.is_empty() {
        format::warn(format!("unfilled variables: {}", missing.join(", ")));
    }

    let model = model
        .or(prompt.model.clone())
        .unwrap_or_else(|| Settings::load(&config.workspace).default_model);
    println!(
        "{} {}/{} with {}",
        "Running".cyan(),
        prompt.category,
        prompt.name,
        model.bold()
    );

    let state = AppState::new(config.clone())?;
    let completion = playground_service::run(&state, &model, provider, &content, &vars)
        .await
        .map_err(playground::with_hint)?;
    playground::print_completion(&model, &completion);
    Ok(())
}

/// Split `category/name`, validating both halves.
fn parse_reference(reference: &str) -> Result<(String, String)> {
    let Some((category, name)) = reference.split_once('/') else {
        bail!("expected category/name, got `{reference}`");
    };
    prompt_service::validate_segment("category", category)?;
    prompt_service::validate_segment("name", name)?;
    Ok((category.to_string(), name.to_string()))
}

fn edit_in_editor(message: &str, initial: &str) -> Result<String> {
    let text = inquire::Editor::new(message)
        .with_predefined_text(initial)
        .with_file_extension(".md")
        .prompt()?;
    Ok(text)
}

fn meta_from_flags(base: PromptMeta, model: Option<String>, description: Option<String>) -> Option<PromptMeta> {
    if model.is_none() && description.is_none() {
        return None;
    }
    Some(PromptMeta {
        description: description.or(base.description),
        model: model.or(base.model),
    })
}

pub async fn run(
    config: &Config,
    action: Action,
    content: Option<String>,
    model: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let root = config.workspace.prompts_dir();
    match action {
        Action::List => {
            let prompts = prompt_service::list(&root).await?;
            print_prompts(&prompts);
        }
        Action::Search(query) => {
            let prompts = prompt_service::search(prompt_service::list(&root).await?, &query);
            print_prompts(&prompts);
        }
        Action::Create(reference) => {
            let (category, name) = parse_reference(&reference)?;
            if prompt_service::read(&root, &category, &name).await.is_ok() {
                bail!("prompt {category}/{name} already exists, use --edit");
            }
            let content = match content {
                Some(c) => c,
                None => edit_in_editor(&format!("Content for {category}/{name}:"), "")?,
            };
            let meta = meta_from_flags(PromptMeta::default(), model, description);
            prompt_service::write(&root, &category, &name, &content, meta.as_ref()).await?;
            format::success(format!("created {category}/{name}"));
        }
        Action::Edit(reference) => {
            let existing = prompt_service::find(&root, &reference).await?;
            let content = match content {
                Some(c) => c,
                None => edit_in_editor(
                    &format!("Edit {}/{}:", existing.category, existing.name),
                    &existing.content,
                )?,
            };
            let base = PromptMeta {
                description: existing.description.clone(),
                model: existing.model.clone(),
            };
            let meta = meta_from_flags(base, model, description);
            prompt_service::write(&root, &existing.category, &existing.name, &content, meta.as_ref()).await?;
            format::success(format!("updated {}/{}", existing.category, existing.name));
        }
        Action::Delete(reference) => {
            let existing = prompt_service::find(&root, &reference).await?;
            prompt_service::delete(&root, &existing.category, &existing.name).await?;
            format::success(format!("deleted {}/{}", existing.category, existing.name));
        }
    }
    Ok(())
}

fn print_prompts(prompts: &[crate::models::prompt::PromptTemplate]) {
    if prompts.is_empty() {
        println!("No prompts found. Create one with `easyai prompts --create category/name`.");
        return;
    }
    let rows: Vec<Vec<String>> = prompts
        .iter()
        .map(|p| {
            vec![
                p.category.clone(),
                p.name.clone(),
                p.variables.join(", "),
                p.model.clone().unwrap_or_default(),
                format::preview(p.description.as_deref().unwrap_or(""), 40),
            ]
        })
        .collect();
    format::print_table(&["CATEGORY", "NAME", "VARIABLES", "MODEL", "DESCRIPTION"], &rows);
    println!("\n{} prompt(s)", prompts.len());
}

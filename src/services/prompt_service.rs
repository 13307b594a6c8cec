use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs;

use crate::error::AppError;
use crate::models::prompt::{PromptMeta, PromptTemplate};
use crate::services::template_service;

/// Content length kept in listings.
pub const PREVIEW_CHARS: usize = 200;

/// Category and name must each be one plain path segment.
pub fn validate_segment(kind: &str, value: &str) -> Result<(), AppError> {
    let bad = value.trim().is_empty()
        || value == "."
        || value.contains("..")
        || value.contains(['/', '\\', '\0']);
    if bad {
        return Err(AppError::BadRequest(format!("invalid prompt {kind}: {value:?}")));
    }
    Ok(())
}

fn prompt_paths(root: &Path, category: &str, name: &str) -> Result<(PathBuf, PathBuf), AppError> {
    validate_segment("category", category)?;
    validate_segment("name", name)?;
    let dir = root.join(category);
    Ok((dir.join(format!("{name}.md")), dir.join(format!("{name}.json"))))
}

async fn read_meta(path: &Path) -> PromptMeta {
    match fs::read_to_string(path).await {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed prompt metadata {}: {}", path.display(), e);
            PromptMeta::default()
        }),
        Err(_) => PromptMeta::default(),
    }
}

async fn modified_at(path: &Path) -> Option<String> {
    let modified = fs::metadata(path).await.ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified).to_rfc3339_opts(SecondsFormat::Millis, true))
}

async fn load(md_path: &Path, meta_path: &Path, category: &str, name: &str) -> std::io::Result<PromptTemplate> {
    let content = fs::read_to_string(md_path).await?;
    let meta = read_meta(meta_path).await;
    Ok(PromptTemplate {
        name: name.to_string(),
        category: category.to_string(),
        variables: template_service::detect_variables(&content),
        content,
        description: meta.description,
        model: meta.model,
        updated_at: modified_at(md_path).await,
    })
}

async fn sorted_entries(dir: &Path) -> std::io::Result<Vec<fs::DirEntry>> {
    let mut entries = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        entries.push(entry);
    }
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

/// Every prompt under `<root>/<category>/<name>.md`, sorted by category then
/// name. Files directly under the root and non-markdown files are ignored.
pub async fn list(root: &Path) -> Result<Vec<PromptTemplate>, AppError> {
    if !fs::try_exists(root).await? {
        return Ok(Vec::new());
    }

    let mut prompts = Vec::new();
    for category in sorted_entries(root).await? {
        if !category.file_type().await?.is_dir() {
            continue;
        }
        let category_name = category.file_name().to_string_lossy().into_owned();
        for file in sorted_entries(&category.path()).await? {
            let path = file.path();
            if !file.file_type().await?.is_file() || path.extension().is_none_or(|ext| ext != "md") {
                continue;
            }
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            match load(&path, &path.with_extension("json"), &category_name, &name).await {
                Ok(prompt) => prompts.push(prompt),
                Err(e) => tracing::warn!("Skipping unreadable prompt {}: {}", path.display(), e),
            }
        }
    }
    Ok(prompts)
}

/// Same as [`list`] with content cut down for previews.
pub async fn list_previews(root: &Path) -> Result<Vec<PromptTemplate>, AppError> {
    let mut prompts = list(root).await?;
    for p in &mut prompts {
        if let Some((idx, _)) = p.content.char_indices().nth(PREVIEW_CHARS) {
            p.content.truncate(idx);
            p.content.push_str("...");
        }
    }
    Ok(prompts)
}

pub async fn read(root: &Path, category: &str, name: &str) -> Result<PromptTemplate, AppError> {
    let (md, meta) = prompt_paths(root, category, name)?;
    match load(&md, &meta, category, name).await {
        Ok(prompt) => Ok(prompt),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::NotFound(format!("prompt {category}/{name} not found")))
        }
        Err(e) => Err(e.into()),
    }
}

/// Create or overwrite a prompt. Metadata is only written when given; an
/// existing sidecar is left alone otherwise.
pub async fn write(
    root: &Path,
    category: &str,
    name: &str,
    content: &str,
    meta: Option<&PromptMeta>,
) -> Result<(), AppError> {
    let (md, meta_path) = prompt_paths(root, category, name)?;
    if let Some(parent) = md.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&md, content).await?;

    if let Some(meta) = meta {
        if meta.is_empty() {
            remove_if_exists(&meta_path).await?;
        } else {
            let raw = serde_json::to_string_pretty(meta).map_err(anyhow::Error::from)?;
            fs::write(&meta_path, raw).await?;
        }
    }
    Ok(())
}

/// Delete a prompt and its metadata. Absent files are not an error.
pub async fn delete(root: &Path, category: &str, name: &str) -> Result<(), AppError> {
    let (md, meta) = prompt_paths(root, category, name)?;
    remove_if_exists(&md).await?;
    remove_if_exists(&meta).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Case-insensitive substring match over name, category, description and content.
pub fn search(prompts: Vec<PromptTemplate>, query: &str) -> Vec<PromptTemplate> {
    let q = query.to_lowercase();
    prompts
        .into_iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&q)
                || p.category.to_lowercase().contains(&q)
                || p.content.to_lowercase().contains(&q)
                || p.description.as_ref().is_some_and(|d| d.to_lowercase().contains(&q))
        })
        .collect()
}

/// Find by `category/name` or by bare name (first match in listing order).
pub async fn find(root: &Path, reference: &str) -> Result<PromptTemplate, AppError> {
    if let Some((category, name)) = reference.split_once('/') {
        return read(root, category, name).await;
    }
    list(root)
        .await?
        .into_iter()
        .find(|p| p.name == reference)
        .ok_or_else(|| AppError::NotFound(format!("prompt {reference} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips_content() {
        let dir = tempfile::tempdir().unwrap();
        let content = "Summarise {{topic}} for {{audience}}.\n\nBe brief about {{topic}}.";
        write(dir.path(), "writing", "summary", content, None).await.unwrap();

        let prompt = read(dir.path(), "writing", "summary").await.unwrap();
        assert_eq!(prompt.content, content);
        assert_eq!(prompt.variables, vec!["topic", "audience"]);
        assert!(prompt.model.is_none());
    }

    #[tokio::test]
    async fn sidecar_metadata_is_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let meta = PromptMeta {
            description: Some("Code review".into()),
            model: Some("claude-3-haiku".into()),
        };
        write(dir.path(), "coding", "review", "Review this", Some(&meta)).await.unwrap();
        let prompt = read(dir.path(), "coding", "review").await.unwrap();
        assert_eq!(prompt.model.as_deref(), Some("claude-3-haiku"));
        assert_eq!(prompt.description.as_deref(), Some("Code review"));

        // Rewriting without metadata keeps the sidecar.
        write(dir.path(), "coding", "review", "Review this again", None).await.unwrap();
        assert!(read(dir.path(), "coding", "review").await.unwrap().model.is_some());
    }

    #[tokio::test]
    async fn list_walks_one_level_and_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b", "two", "2", None).await.unwrap();
        write(dir.path(), "a", "one", "1", None).await.unwrap();
        std::fs::write(dir.path().join("stray.md"), "x").unwrap();
        std::fs::write(dir.path().join("a").join("notes.txt"), "x").unwrap();
        std::fs::create_dir_all(dir.path().join("a").join("nested")).unwrap();
        std::fs::write(dir.path().join("a").join("nested").join("deep.md"), "x").unwrap();

        let prompts = list(dir.path()).await.unwrap();
        let names: Vec<_> = prompts.iter().map(|p| format!("{}/{}", p.category, p.name)).collect();
        assert_eq!(names, vec!["a/one", "b/two"]);
    }

    #[tokio::test]
    async fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list(&dir.path().join("nope")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn previews_are_truncated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "long", "text", &"x".repeat(500), None).await.unwrap();
        let prompts = list_previews(dir.path()).await.unwrap();
        assert_eq!(prompts[0].content.len(), PREVIEW_CHARS + 3);
    }

    #[tokio::test]
    async fn missing_prompt_is_not_found_and_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read(dir.path(), "none", "here").await,
            Err(AppError::NotFound(_))
        ));
        delete(dir.path(), "none", "here").await.unwrap();

        write(dir.path(), "c", "gone", "bye", None).await.unwrap();
        delete(dir.path(), "c", "gone").await.unwrap();
        assert!(matches!(read(dir.path(), "c", "gone").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        for (c, n) in [("..", "x"), ("a", "../x"), ("a/b", "x"), ("", "x")] {
            assert!(matches!(
                write(dir.path(), c, n, "x", None).await,
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn find_by_name_or_path_and_search() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "coding", "review", "Look at the diff", None).await.unwrap();
        write(dir.path(), "writing", "poem", "Write a poem", None).await.unwrap();

        assert_eq!(find(dir.path(), "poem").await.unwrap().category, "writing");
        assert_eq!(find(dir.path(), "coding/review").await.unwrap().name, "review");

        let hits = search(list(dir.path()).await.unwrap(), "DIFF");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "review");
    }
}

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::validation::{slugify, validate_slug};
use crate::models::{
    EbookChapter, EbookChapterSummary, ExtractedChapter, ImportChapterRequest,
    DEFAULT_CHAPTER_SELECTOR,
};

const CHAPTER_COLUMNS: &str = "id, slug, title, position, content_html, content_text, word_count, source_selector, created_at, updated_at";

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("Invalid CSS selector '{0}'")]
    InvalidSelector(String),
    #[error("Selector '{0}' matched nothing in the document")]
    NoMatch(String),
    #[error("Matched element has no text content")]
    EmptyContent,
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Pull the first element matching `selector` out of an HTML document.
///
/// The title is the first `h1` inside the match, falling back to the document
/// `<title>`; it is empty when neither exists.
pub fn extract_chapter(html: &str, selector: &str) -> Result<ExtractedChapter, ExtractError> {
    let selector_text = selector.trim();
    let content_selector =
        Selector::parse(selector_text).map_err(|_| ExtractError::InvalidSelector(selector_text.to_string()))?;

    let document = Html::parse_document(html);
    let element = document
        .select(&content_selector)
        .next()
        .ok_or_else(|| ExtractError::NoMatch(selector_text.to_string()))?;

    let content_text = collapse_text(element);
    if content_text.is_empty() {
        return Err(ExtractError::EmptyContent);
    }

    let title = first_text(element, "h1")
        .or_else(|| first_text(document.root_element(), "title"))
        .unwrap_or_default();

    Ok(ExtractedChapter {
        title,
        content_html: element.inner_html().trim().to_string(),
        content_text,
    })
}

fn first_text(scope: ElementRef<'_>, tag: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;
    scope
        .select(&selector)
        .next()
        .map(collapse_text)
        .filter(|text| !text.is_empty())
}

fn collapse_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Default, Serialize)]
pub struct DirectoryImportReport {
    pub imported: Vec<String>,
    pub failed: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone)]
pub struct EbookService {
    db: PgPool,
}

impl EbookService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Extract and upsert a chapter keyed by slug
    pub async fn import(&self, request: ImportChapterRequest) -> AppResult<EbookChapter> {
        validate_slug(&request.slug).map_err(|e| AppError::Validation(e.to_string()))?;

        let selector = request
            .selector
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_CHAPTER_SELECTOR);
        let extracted = extract_chapter(&request.html, selector)?;

        let title = if extracted.title.is_empty() {
            request.slug.replace('-', " ")
        } else {
            extracted.title.clone()
        };

        let sql = format!(
            r#"
            INSERT INTO ebook_chapters
                (id, slug, title, position, content_html, content_text, word_count, source_selector)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (slug)
            DO UPDATE SET title = EXCLUDED.title,
                          position = EXCLUDED.position,
                          content_html = EXCLUDED.content_html,
                          content_text = EXCLUDED.content_text,
                          word_count = EXCLUDED.word_count,
                          source_selector = EXCLUDED.source_selector,
                          updated_at = NOW()
            RETURNING {}
            "#,
            CHAPTER_COLUMNS
        );

        let chapter = sqlx::query_as::<_, EbookChapter>(&sql)
            .bind(Uuid::new_v4())
            .bind(&request.slug)
            .bind(title)
            .bind(request.position.unwrap_or(0))
            .bind(&extracted.content_html)
            .bind(&extracted.content_text)
            .bind(extracted.word_count())
            .bind(selector)
            .fetch_one(&self.db)
            .await?;

        tracing::info!(slug = %chapter.slug, words = chapter.word_count, "Imported ebook chapter");
        Ok(chapter)
    }

    /// Import every `*.html` file in `dir`; slug from the file stem, position from the sorted order
    pub async fn import_directory(&self, dir: &Path, selector: Option<&str>) -> AppResult<DirectoryImportReport> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| AppError::Validation(format!("Cannot read {}: {}", dir.display(), e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Internal(e.into()))?
        {
            let path = entry.path();
            let is_html = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
            if is_html {
                files.push(path);
            }
        }
        files.sort();

        let mut report = DirectoryImportReport::default();
        for (index, path) in files.into_iter().enumerate() {
            let slug = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(slugify)
                .unwrap_or_default();

            let html = match tokio::fs::read_to_string(&path).await {
                Ok(html) => html,
                Err(e) => {
                    report.failed.push((path, e.to_string()));
                    continue;
                }
            };

            let request = ImportChapterRequest {
                slug,
                html,
                selector: selector.map(str::to_string),
                position: Some(index as i32 + 1),
            };

            match self.import(request).await {
                Ok(chapter) => report.imported.push(chapter.slug),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    pub async fn list(&self) -> AppResult<Vec<EbookChapterSummary>> {
        let chapters = sqlx::query_as::<_, EbookChapterSummary>(
            "SELECT slug, title, position, word_count, updated_at FROM ebook_chapters ORDER BY position, slug",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(chapters)
    }

    pub async fn get(&self, slug: &str) -> AppResult<EbookChapter> {
        let sql = format!("SELECT {} FROM ebook_chapters WHERE slug = $1", CHAPTER_COLUMNS);
        sqlx::query_as::<_, EbookChapter>(&sql)
            .bind(slug)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound("Ebook chapter"))
    }

    pub async fn delete(&self, slug: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM ebook_chapters WHERE slug = $1")
            .bind(slug)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Ebook chapter"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"
        <html>
          <head><title>Top Tier Men | Mindset</title></head>
          <body>
            <nav>Home | Ebook</nav>
            <article class="chapter">
              <h1>Chapter 1:   Discipline</h1>
              <p>Discipline is   choosing what you want most
                 over what you want now.</p>
              <p>Train <strong>daily</strong>.</p>
            </article>
          </body>
        </html>
    "#;

    #[test]
    fn test_extract_default_selector() {
        let chapter = extract_chapter(PAGE, DEFAULT_CHAPTER_SELECTOR).unwrap();

        assert_eq!(chapter.title, "Chapter 1: Discipline");
        assert_eq!(
            chapter.content_text,
            "Chapter 1: Discipline Discipline is choosing what you want most over what you want now. Train daily ."
        );
        assert!(chapter.content_html.starts_with("<h1>"));
        assert!(!chapter.content_html.contains("<nav>"));
        assert_eq!(chapter.word_count(), 18);
    }

    #[test]
    fn test_extract_falls_back_to_document_title() {
        let html = "<html><head><title>Nutrition basics</title></head><body><div id=\"c\"><p>Eat protein.</p></div></body></html>";
        let chapter = extract_chapter(html, "#c").unwrap();
        assert_eq!(chapter.title, "Nutrition basics");
        assert_eq!(chapter.content_text, "Eat protein.");
    }

    #[test]
    fn test_extract_presence_checks() {
        assert_eq!(
            extract_chapter(PAGE, "div[").unwrap_err(),
            ExtractError::InvalidSelector("div[".to_string())
        );
        assert_eq!(
            extract_chapter(PAGE, "section.missing").unwrap_err(),
            ExtractError::NoMatch("section.missing".to_string())
        );
        assert_eq!(
            extract_chapter("<article>   </article>", "article").unwrap_err(),
            ExtractError::EmptyContent
        );
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_CHAPTER_SELECTOR: &str = "article";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EbookChapter {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub position: i32,
    pub content_html: String,
    pub content_text: String,
    pub word_count: i32,
    pub source_selector: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chapter list entry without the content bodies
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EbookChapterSummary {
    pub slug: String,
    pub title: String,
    pub position: i32,
    pub word_count: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ImportChapterRequest {
    pub slug: String,
    pub html: String,
    pub selector: Option<String>,
    pub position: Option<i32>,
}

/// Result of pulling a chapter out of an HTML document
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedChapter {
    pub title: String,
    pub content_html: String,
    pub content_text: String,
}

impl ExtractedChapter {
    pub fn word_count(&self) -> i32 {
        self.content_text.split_whitespace().count() as i32
    }
}

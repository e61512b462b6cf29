use anyhow::{anyhow, Result};
use regex::Regex;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
    })
}

fn slug_regex() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug regex is valid"))
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(anyhow!("Email cannot be empty"));
    }

    if email.len() > 255 {
        return Err(anyhow!("Email cannot be longer than 255 characters"));
    }

    if !email_regex().is_match(email) {
        return Err(anyhow!("Invalid email format"));
    }

    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 120 {
        return Err(anyhow!("Slug must be between 1 and 120 characters"));
    }

    if !slug_regex().is_match(slug) {
        return Err(anyhow!("Slug may only contain lowercase letters, digits and single dashes"));
    }

    Ok(())
}

/// Turn a file stem or title into a slug, e.g. `"Chapter 01 - Mindset"` -> `"chapter-01-mindset"`
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Clamp list pagination the same way for every listing endpoint
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (limit.unwrap_or(50).clamp(1, 100), offset.unwrap_or(0).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("member@toptiermen.eu").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("spaces in@example.com").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Chapter 01 - Mindset"), "chapter-01-mindset");
        assert_eq!(slugify("  __Discipline__ "), "discipline");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert!(validate_slug(&slugify("Hoofdstuk 3: Voeding & Kracht")).is_ok());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("mindset").is_ok());
        assert!(validate_slug("Mindset").is_err());
        assert!(validate_slug("double--dash").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(None, None), (50, 0));
        assert_eq!(page_bounds(Some(500), Some(-3)), (100, 0));
        assert_eq!(page_bounds(Some(0), Some(20)), (1, 20));
    }
}

//! Deterministic file names and public paths for downloaded renditions.
//!
//! `<key>-<handle>-<photoId>-w<width>[x<height>].<ext>`, e.g.
//! `hero-jdoe-p1-w1920x1080.webp`. The same photo at the same size always
//! lands on the same path, so reruns overwrite rather than accumulate.
//!
//! Every part comes from the mapping or the provider's JSON, so each one is
//! reduced to `[A-Za-z0-9_-]` before it reaches a path. A name can never
//! contain a separator or `..`.

use crate::pipeline::provider::{PhotoRecord, Rendition};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://").unwrap());
static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_-]+").unwrap());
static RE_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());
static RE_NOT_FILE_SAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").unwrap());

/// Reduce a free-form author handle to `[a-z0-9_-]`.
pub fn sanitize_part(s: &str) -> String {
    let lower = s.to_lowercase();
    let s = RE_SCHEME.replace_all(&lower, "");
    let s = RE_UNSAFE.replace_all(&s, "-");
    let s = RE_DASHES.replace_all(&s, "-");
    s.trim_matches('-').to_string()
}

/// Reduce a key or photo id to `[A-Za-z0-9_-]`, keeping case.
pub fn file_part(s: &str) -> String {
    let s = RE_NOT_FILE_SAFE.replace_all(s, "-");
    let s = RE_DASHES.replace_all(&s, "-");
    s.trim_matches('-').to_string()
}

/// The handle used in file names: username, falling back to display name.
pub fn author_slug(photo: &PhotoRecord) -> String {
    let raw = photo
        .author_handle
        .as_deref()
        .filter(|h| !h.is_empty())
        .or(photo.author_name.as_deref())
        .unwrap_or("");
    sanitize_part(raw)
}

/// File name for a placement's rendition.
pub fn image_filename(key: &str, photo: &PhotoRecord, rendition: &Rendition) -> String {
    let size = match rendition.height {
        Some(h) => format!("w{}x{}", rendition.width, h),
        None => format!("w{}", rendition.width),
    };
    format!(
        "{}-{}-{}-{}.{}",
        file_part(key),
        author_slug(photo),
        file_part(&photo.id),
        size,
        file_part(&rendition.extension)
    )
}

/// Public URL path written into the document: `<prefix>/images/<file>`.
pub fn web_path(public_prefix: &str, filename: &str) -> String {
    let prefix = public_prefix.replace('\\', "/");
    format!("{}/images/{}", prefix.trim_end_matches('/'), filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(handle: Option<&str>, name: Option<&str>) -> PhotoRecord {
        PhotoRecord {
            id: "p1".into(),
            raw_url: "https://images.example.com/p1".into(),
            description: None,
            alt_description: None,
            author_name: name.map(Into::into),
            author_handle: handle.map(Into::into),
            page_url: None,
            download_location: "https://api.example.com/photos/p1/download".into(),
        }
    }

    fn rendition(width: u32, height: Option<u32>) -> Rendition {
        Rendition {
            bytes: Vec::new(),
            width,
            height,
            extension: "webp".into(),
        }
    }

    #[test]
    fn sanitize_strips_scheme_and_symbols() {
        assert_eq!(sanitize_part("https://Some.Site/Jane"), "some-site-jane");
        assert_eq!(sanitize_part("--Ana  María--"), "ana-mar-a");
        assert_eq!(sanitize_part("john_doe-99"), "john_doe-99");
        assert_eq!(sanitize_part(""), "");
    }

    #[test]
    fn filename_with_and_without_height() {
        let p = photo(Some("jdoe"), Some("Jane Doe"));
        assert_eq!(
            image_filename("hero", &p, &rendition(1920, Some(1080))),
            "hero-jdoe-p1-w1920x1080.webp"
        );
        assert_eq!(
            image_filename("hero", &p, &rendition(800, None)),
            "hero-jdoe-p1-w800.webp"
        );
    }

    #[test]
    fn provider_id_cannot_leave_images_dir() {
        let mut p = photo(Some("jdoe"), None);
        p.id = "x/../../../escaped".into();
        let name = image_filename("hero", &p, &rendition(10, Some(10)));
        assert_eq!(name, "hero-jdoe-x-escaped-w10x10.webp");
        assert!(!name.contains('/') && !name.contains(".."));

        p.id = r"..\..\evil".into();
        let name = image_filename("../hero", &p, &rendition(10, None));
        assert_eq!(name, "hero-jdoe-evil-w10.webp");
    }

    #[test]
    fn file_part_keeps_case_of_real_ids() {
        assert_eq!(file_part("Ys-DBJeX0nE"), "Ys-DBJeX0nE");
        assert_eq!(file_part("hero_2"), "hero_2");
        assert_eq!(file_part("../.."), "");
    }

    #[test]
    fn slug_falls_back_to_display_name() {
        assert_eq!(author_slug(&photo(None, Some("Jane Doe"))), "jane-doe");
        assert_eq!(author_slug(&photo(Some(""), Some("Jane"))), "jane");
        assert_eq!(author_slug(&photo(None, None)), "");
    }

    #[test]
    fn web_path_joins_prefix() {
        assert_eq!(web_path("/prefix", "a.webp"), "/prefix/images/a.webp");
        assert_eq!(web_path("/prefix/", "a.webp"), "/prefix/images/a.webp");
        assert_eq!(web_path("", "a.webp"), "/images/a.webp");
    }
}

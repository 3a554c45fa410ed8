//! In-place document patching for one placement.
//!
//! The document is never parsed into a tree. We scan for opening tags, pick
//! the first one that matches, rebuild just that tag's text through
//! [`crate::pipeline::attrs`], and splice it back. Bytes outside the matched
//! tag are left exactly as they were.
//!
//! Per placement `K`, in order:
//!
//! 1. **Bind** — if no tag carries `data-image-key="K"` yet but one has
//!    `id="K"`, mark that tag (`data-image-key`, plus `data-image-target="bg"`
//!    for background placements). Later runs find it by the marker.
//! 2. **Image** — first `<img data-image-key="K">`: set `src`, `loading`,
//!    `width`/`height`, and `alt` only when it is missing or blank.
//! 3. **Background** — first tag with `data-image-key="K"` and
//!    `data-image-target="bg"`: replace the `background-*` declarations in its
//!    inline style, leaving other declarations alone.
//!
//! Steps 2 and 3 are skipped when no tag matches.

use crate::mapping::TargetKind;
use crate::pipeline::attrs::{read_attribute, remove_attribute, set_style_property, upsert_attribute};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use tracing::{debug, warn};

/// Marker binding a tag to a placement key.
pub const KEY_ATTR: &str = "data-image-key";
/// Marker naming the target kind of a bound tag.
pub const TARGET_ATTR: &str = "data-image-target";
/// `TARGET_ATTR` value for background holders.
pub const TARGET_BG: &str = "bg";

static RE_OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z][A-Za-z0-9:-]*)\b[^>]*>").unwrap());

/// Everything the patcher needs to know about one placement.
#[derive(Debug, Clone)]
pub struct PatchTarget<'a> {
    pub key: &'a str,
    pub web_path: &'a str,
    pub alt_text: &'a str,
    pub width: u32,
    pub height: Option<u32>,
    pub target: TargetKind,
}

/// Which tags a placement touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatchOutcome {
    pub annotated: bool,
    pub image_rewritten: bool,
    pub background_rewritten: bool,
}

impl PatchOutcome {
    /// True once the document points at the new image.
    pub fn image_referenced(&self) -> bool {
        self.image_rewritten || self.background_rewritten
    }

    /// Why the image ended up unreferenced, or `None` if it is referenced.
    pub fn miss_message(&self, key: &str) -> Option<String> {
        if self.image_referenced() {
            return None;
        }
        Some(if self.annotated {
            format!(
                "bound id=\"{key}\" but it is neither an <img> nor a background holder; \
                 image not referenced"
            )
        } else {
            format!(
                "no tag with {KEY_ATTR}=\"{key}\" or id=\"{key}\" found; document unchanged"
            )
        })
    }
}

/// Byte range of the first opening tag for which `pred(name, tag)` holds.
fn find_tag(html: &str, pred: impl Fn(&str, &str) -> bool) -> Option<Range<usize>> {
    RE_OPEN_TAG
        .captures_iter(html)
        .find(|caps| pred(&caps[1], &caps[0]))
        .and_then(|caps| caps.get(0))
        .map(|m| m.range())
}

fn has_marker(tag: &str, key: &str) -> bool {
    read_attribute(tag, KEY_ATTR).as_deref() == Some(key)
}

fn is_background(tag: &str) -> bool {
    read_attribute(tag, TARGET_ATTR).is_some_and(|t| t.eq_ignore_ascii_case(TARGET_BG))
}

/// Step 1: bind the tag with `id="key"` unless the key is already bound.
pub fn annotate_marker(html: &mut String, key: &str, target: TargetKind) -> bool {
    if find_tag(html, |_, tag| has_marker(tag, key)).is_some() {
        return false;
    }
    let Some(range) = find_tag(html, |_, tag| read_attribute(tag, "id").as_deref() == Some(key)) else {
        return false;
    };

    let mut tag = upsert_attribute(&html[range.clone()], KEY_ATTR, key);
    if target == TargetKind::BackgroundHolder {
        tag = upsert_attribute(&tag, TARGET_ATTR, TARGET_BG);
    }
    html.replace_range(range, &tag);
    debug!("Bound id=\"{}\" to placement", key);
    true
}

/// Step 2: rewrite the first `<img>` bound to the key.
pub fn rewrite_image(html: &mut String, t: &PatchTarget<'_>) -> bool {
    let Some(range) = find_tag(html, |name, tag| {
        name.eq_ignore_ascii_case("img") && has_marker(tag, t.key)
    }) else {
        debug!("{}: no <img> bound, skipping image rewrite", t.key);
        return false;
    };

    let mut tag = upsert_attribute(&html[range.clone()], "src", t.web_path);
    let has_alt = read_attribute(&tag, "alt").is_some_and(|a| !a.trim().is_empty());
    if !has_alt {
        tag = upsert_attribute(&tag, "alt", t.alt_text);
    }
    tag = upsert_attribute(&tag, "loading", "lazy");
    tag = upsert_attribute(&tag, "width", &t.width.to_string());
    if let Some(h) = t.height {
        tag = upsert_attribute(&tag, "height", &h.to_string());
    }
    html.replace_range(range, &tag);
    true
}

/// Step 3: rewrite the inline style of the first background holder bound to the key.
pub fn rewrite_background(html: &mut String, t: &PatchTarget<'_>) -> bool {
    let Some(range) = find_tag(html, |_, tag| has_marker(tag, t.key) && is_background(tag)) else {
        debug!("{}: no background holder bound, skipping background rewrite", t.key);
        return false;
    };

    let original = &html[range.clone()];
    let style = read_attribute(original, "style").unwrap_or_default();
    let style = set_style_property(&style, "background-image", &format!("url('{}')", t.web_path));
    let style = set_style_property(&style, "background-size", "cover");
    let style = set_style_property(&style, "background-position", "center");
    let style = set_style_property(&style, "background-repeat", "no-repeat");

    let tag = upsert_attribute(&remove_attribute(original, "style"), "style", &style);
    html.replace_range(range, &tag);
    true
}

/// Run all three steps for one placement.
pub fn apply_placement(html: &mut String, t: &PatchTarget<'_>) -> PatchOutcome {
    let outcome = PatchOutcome {
        annotated: annotate_marker(html, t.key, t.target),
        image_rewritten: rewrite_image(html, t),
        background_rewritten: rewrite_background(html, t),
    };
    if let Some(msg) = outcome.miss_message(t.key) {
        warn!("{}: {}", t.key, msg);
    }
    outcome
}

//! Rust-side meta tag extraction over serialized HTML
//!
//! Used when in-page evaluation is unavailable (the page refused script
//! evaluation, or the execution context was torn down mid-call). Produces the
//! same tags, in the same order, as [`META_TAGS_SCRIPT`](super::js_scripts::META_TAGS_SCRIPT).

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::schema::MetaTag;
use super::targets::{OPEN_GRAPH_SELECTOR, Source, TARGETS};

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!("Invalid extraction selector {}: {:?}", css, e);
            None
        }
    }
}

fn read(element: ElementRef<'_>, source: Source) -> String {
    match source {
        Source::Text => element.text().collect::<String>().trim().to_string(),
        Source::Attr(name) => element.value().attr(name).unwrap_or_default().to_string(),
    }
}

/// Extract meta tags from a full HTML document
pub fn extract_meta_tags_from_html(html: &str) -> Vec<MetaTag> {
    let document = Html::parse_document(html);
    let mut tags = Vec::new();

    for target in TARGETS {
        let Some(sel) = selector(target.selector) else {
            continue;
        };
        if let Some(element) = document.select(&sel).next() {
            tags.push(MetaTag::new(target.name, read(element, target.source)));
        }
    }

    if let Some(og) = selector(OPEN_GRAPH_SELECTOR) {
        for element in document.select(&og) {
            let property = element.value().attr("property").unwrap_or_default();
            tags.push(MetaTag::new(property, read(element, Source::Attr("content"))));
        }
    }

    tags
}

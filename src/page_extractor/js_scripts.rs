//! Scripts evaluated inside the rendered document
//!
//! The meta tag script is a fixed contract with the rendering engine: it must
//! return `[{ name, content }]` with the four single-valued targets first, in
//! the order of [`TARGETS`](super::targets::TARGETS), followed by every
//! `og:*` property in document order. Keep it in sync with the HTML fallback
//! in [`html`](super::html).

/// Bumped whenever the shape or ordering of the script output changes
pub const META_TAGS_SCRIPT_VERSION: u32 = 1;

/// Meta tag extraction, schema version 1
pub const META_TAGS_SCRIPT: &str = r#"(() => {
  const tags = [];
  const text = (el) => (el.textContent || '').trim();
  const attr = (el, name) => el.getAttribute(name) || '';

  const title = document.querySelector('title');
  if (title) tags.push({ name: 'title', content: text(title) });

  const description = document.querySelector('meta[name="description"]');
  if (description) tags.push({ name: 'description', content: attr(description, 'content') });

  const canonical = document.querySelector('link[rel="canonical"]');
  if (canonical) tags.push({ name: 'canonical', content: attr(canonical, 'href') });

  const h1 = document.querySelector('h1');
  if (h1) tags.push({ name: 'h1', content: text(h1) });

  document.querySelectorAll('meta[property^="og:"]').forEach((el) => {
    tags.push({ name: attr(el, 'property'), content: attr(el, 'content') });
  });

  return tags;
})()"#;

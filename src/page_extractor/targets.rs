/// Where a target's content is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Trimmed text content of the element
    Text,
    /// Value of the named attribute (empty when absent)
    Attr(&'static str),
}

/// A single-valued extraction target
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub name: &'static str,
    pub selector: &'static str,
    pub source: Source,
}

/// Single-valued targets in output order
pub const TARGETS: [Target; 4] = [
    Target {
        name: "title",
        selector: "title",
        source: Source::Text,
    },
    Target {
        name: "description",
        selector: r#"meta[name="description"]"#,
        source: Source::Attr("content"),
    },
    Target {
        name: "canonical",
        selector: r#"link[rel="canonical"]"#,
        source: Source::Attr("href"),
    },
    Target {
        name: "h1",
        selector: "h1",
        source: Source::Text,
    },
];

/// Multi-valued Open Graph properties, emitted in document order after `TARGETS`
pub const OPEN_GRAPH_SELECTOR: &str = r#"meta[property^="og:"]"#;

//! HTML to text extraction
//!
//! Extraction is a pure function of the HTML and the configured rules, so the
//! same document always yields the same text.

use crate::config::ExtractRule;
use crate::url::DomainSet;
use scraper::{ElementRef, Html, Selector};

/// Elements whose text is never part of the content
const NOISE_SELECTOR: &str = "script, style, nav, footer, header, noscript, meta, link";

/// Text and title pulled out of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    domains: DomainSet,
    selectors: Vec<Selector>,
}

/// Turns HTML into cleaned text
#[derive(Debug, Clone)]
pub struct TextExtractor {
    rules: Vec<CompiledRule>,
    noise: Option<Selector>,
    title: Option<Selector>,
}

impl TextExtractor {
    /// Compiles the per-domain rules
    ///
    /// Invalid selectors are skipped with a warning; configuration validation
    /// rejects them before a run starts.
    pub fn new(rules: &[ExtractRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| CompiledRule {
                domains: DomainSet::new([&rule.domain]),
                selectors: rule
                    .selectors
                    .iter()
                    .filter_map(|s| match Selector::parse(s) {
                        Ok(selector) => Some(selector),
                        Err(e) => {
                            tracing::warn!("Ignoring invalid selector '{}': {:?}", s, e);
                            None
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            rules,
            noise: Selector::parse(NOISE_SELECTOR).ok(),
            title: Selector::parse("title").ok(),
        }
    }

    /// Extracts the title and the readable text of `html` fetched from `url`
    pub fn extract(&self, url: &str, html: &str) -> ExtractedPage {
        let mut document = Html::parse_document(html);
        let title = self.extract_title(&document);

        if let Some(noise) = &self.noise {
            let ids: Vec<_> = document.select(noise).map(|el| el.id()).collect();
            for id in ids {
                if let Some(mut node) = document.tree.get_mut(id) {
                    node.detach();
                }
            }
        }

        let root = self
            .rule_match(url, &document)
            .unwrap_or_else(|| document.root_element());
        let text = clean_text(&root.text().collect::<Vec<_>>().join("\n"));

        ExtractedPage { title, text }
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        let selector = self.title.as_ref()?;
        document
            .select(selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// First element matched by the first matching selector of a rule for `url`
    fn rule_match<'a>(&self, url: &str, document: &'a Html) -> Option<ElementRef<'a>> {
        self.rules
            .iter()
            .filter(|rule| rule.domains.matches_url(url))
            .flat_map(|rule| rule.selectors.iter())
            .find_map(|selector| document.select(selector).next())
    }
}

/// Trims every line and drops the empty ones
pub fn clean_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

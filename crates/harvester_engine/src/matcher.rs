use serde::{Deserialize, Serialize};

/// TRACES organic-operator directory.
pub const DEFAULT_SEARCH_URL: &str =
    "https://webgate.ec.europa.eu/tracesnt/directory/publication/organic-operator/index";

/// One strategy for locating an element on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Matcher {
    /// Any element matching a CSS selector.
    Css(String),
    /// Elements matching a CSS selector whose text contains `text`
    /// (case-insensitive).
    CssText { css: String, text: String },
    /// Any link, button or inline element whose text contains the given text
    /// (case-insensitive).
    Text(String),
    /// Links whose target path ends with the suffix (case-insensitive).
    HrefSuffix(String),
}

impl Matcher {
    pub fn css(selector: &str) -> Self {
        Matcher::Css(selector.to_string())
    }

    pub fn css_text(css: &str, text: &str) -> Self {
        Matcher::CssText {
            css: css.to_string(),
            text: text.to_string(),
        }
    }

    pub fn text(text: &str) -> Self {
        Matcher::Text(text.to_string())
    }

    pub fn href_suffix(suffix: &str) -> Self {
        Matcher::HrefSuffix(suffix.to_string())
    }
}

/// Locators describing the target interface. Each list is tried in order and
/// the first hit wins, so supporting a new page variant means adding entries
/// here rather than touching the retrieval flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetProfile {
    pub search_url: String,
    /// Query argument carrying the identifier on the search URL. `None`
    /// always goes through the search form.
    pub query_param: Option<String>,
    pub consent_matchers: Vec<Matcher>,
    pub search_input_matchers: Vec<Matcher>,
    pub search_button_matchers: Vec<Matcher>,
    /// Anything whose presence means a result list is shown.
    pub results_matchers: Vec<Matcher>,
    pub row_matcher: Matcher,
    /// Fallback "open record" controls when no row text matches.
    pub view_matchers: Vec<Matcher>,
    /// Text matchers first, link-target suffix last.
    pub document_matchers: Vec<Matcher>,
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            query_param: Some("search".to_string()),
            consent_matchers: vec![
                Matcher::css_text("button", "Accept all"),
                Matcher::css_text("button", "Accept only essential"),
                Matcher::css_text("button", "I accept"),
                Matcher::css_text("a", "Accept"),
                Matcher::css("#cookie-consent-banner button"),
            ],
            search_input_matchers: vec![
                Matcher::css("input#search"),
                Matcher::css("input[name='search']"),
                Matcher::css("input[placeholder*='Search']"),
                Matcher::css("input[type='search']"),
                Matcher::css("input[type='text']"),
            ],
            search_button_matchers: vec![
                Matcher::css_text("button", "Search"),
                Matcher::css("input[type='submit']"),
                Matcher::css("button[type='submit']"),
            ],
            results_matchers: vec![
                Matcher::css("table tbody tr"),
                Matcher::css("[role='row']"),
                Matcher::css(".search-results"),
            ],
            row_matcher: Matcher::css("table tbody tr"),
            view_matchers: vec![
                Matcher::css_text("button", "View"),
                Matcher::css_text("a", "View"),
            ],
            document_matchers: vec![
                Matcher::text("PDF certificate"),
                Matcher::text("Certificate (PDF)"),
                Matcher::text("Download PDF"),
                Matcher::href_suffix(".pdf"),
            ],
        }
    }
}

impl TargetProfile {
    /// Search URL with the identifier attached as query argument, when the
    /// profile has one.
    pub fn direct_search_url(&self, identifier: &str) -> Option<String> {
        let param = self.query_param.as_deref()?;
        let mut url = url::Url::parse(&self.search_url).ok()?;
        url.query_pairs_mut().append_pair(param, identifier);
        Some(url.into())
    }
}

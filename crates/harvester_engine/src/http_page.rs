use std::collections::BTreeMap;
use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use futures_util::StreamExt;
use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_DISPOSITION;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use url::Url;

use crate::matcher::Matcher;
use crate::page::{Page, PageElement};
use crate::types::{Download, PageError};

/// Elements considered by [`Matcher::Text`].
const TEXT_CANDIDATES: &str =
    "a, button, input[type='submit'], input[type='button'], label, span";

/// Input types that never contribute a form field.
const NON_FIELD_INPUTS: &[&str] = &["submit", "button", "reset", "image", "file"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_ms: u64,
    pub redirect_limit: usize,
    /// How often `wait_for` re-fetches the current document.
    pub poll_interval_ms: u64,
    pub max_download_bytes: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            redirect_limit: 10,
            poll_interval_ms: 500,
            max_download_bytes: 50 * 1024 * 1024,
            user_agent: concat!("harvester/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSettings {
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Snapshot of an element taken when it was located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpElement {
    tag: String,
    text: String,
    name: Option<String>,
    value: Option<String>,
    target: Option<Url>,
    form: Option<FormSpec>,
    location: Location,
}

/// Where an element sits in one loaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Location {
    /// Bumped on every load, so elements of an older document resolve to nothing.
    generation: u64,
    /// Position in document order.
    index: usize,
}

impl HttpElement {
    /// Where activating the element navigates to, if it is (or wraps) a link.
    pub fn target(&self) -> Option<&Url> {
        self.target.as_ref()
    }
}

impl PageElement for HttpElement {
    fn text(&self) -> &str {
        &self.text
    }

    fn is_link(&self) -> bool {
        self.target.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormSpec {
    action: Url,
    post: bool,
    fields: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct LoadedDocument {
    url: Url,
    html: String,
}

/// [`Page`] over plain HTTP: documents are fetched with one cookie-keeping
/// client and matchers run against the parsed markup. No scripts are run.
pub struct HttpPage {
    client: reqwest::Client,
    settings: HttpSettings,
    document: Option<LoadedDocument>,
    generation: u64,
    filled: BTreeMap<String, String>,
}

impl HttpPage {
    pub fn new(settings: HttpSettings) -> Result<Self, PageError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| PageError::Navigation(err.to_string()))?;
        Ok(Self {
            client,
            settings,
            document: None,
            generation: 0,
            filled: BTreeMap::new(),
        })
    }

    fn base_url(&self) -> Result<&Url, PageError> {
        self.document
            .as_ref()
            .map(|doc| &doc.url)
            .ok_or(PageError::NoPage)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
        what: &str,
    ) -> Result<reqwest::Response, PageError> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, what))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PageError::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }

    async fn load(
        &mut self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
        what: &str,
    ) -> Result<(), PageError> {
        let response = self.send(request, timeout, what).await?;
        let url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|err| map_reqwest_error(err, what))?;
        engine_trace!("loaded {} ({} bytes)", url, html.len());
        self.document = Some(LoadedDocument { url, html });
        self.generation += 1;
        self.filled.clear();
        Ok(())
    }

    async fn reload(&mut self, timeout: Duration) -> Result<(), PageError> {
        let url = self.base_url()?.clone();
        let filled = std::mem::take(&mut self.filled);
        let result = self
            .load(self.client.get(url), timeout, "reloading page")
            .await;
        self.filled = filled;
        result
    }

    async fn submit(&mut self, element: &HttpElement, form: &FormSpec, timeout: Duration) -> Result<(), PageError> {
        let mut fields = form.fields.clone();
        for (name, value) in &self.filled {
            match fields.iter_mut().find(|(field, _)| field == name) {
                Some(existing) => existing.1 = value.clone(),
                None => fields.push((name.clone(), value.clone())),
            }
        }
        if let Some(name) = &element.name {
            fields.push((name.clone(), element.value.clone().unwrap_or_default()));
        }

        engine_debug!("submitting form to {} with {} fields", form.action, fields.len());
        let request = if form.post {
            self.client.post(form.action.clone()).form(&fields)
        } else {
            let mut action = form.action.clone();
            action.set_query(None);
            action.query_pairs_mut().extend_pairs(fields.iter());
            self.client.get(action)
        };
        self.load(request, timeout, "submitting form").await
    }

    fn collect(&self, matcher: &Matcher) -> Vec<HttpElement> {
        let Some(doc) = &self.document else {
            return Vec::new();
        };
        let html = Html::parse_document(&doc.html);
        let order = document_order(&html);
        matching_elements(&html, matcher)
            .into_iter()
            .filter(is_visible)
            .map(|el| snapshot(el, &doc.url, locate(&order, el, self.generation)))
            .collect()
    }
}

#[async_trait::async_trait]
impl Page for HttpPage {
    type Element = HttpElement;

    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), PageError> {
        let parsed = Url::parse(url).map_err(|err| PageError::Navigation(err.to_string()))?;
        let request = self.client.get(parsed);
        self.load(request, timeout, "loading page").await
    }

    fn find_first_visible(&self, matchers: &[Matcher]) -> Option<HttpElement> {
        matchers
            .iter()
            .find_map(|matcher| self.collect(matcher).into_iter().next())
    }

    fn find_all(&self, matcher: &Matcher) -> Vec<HttpElement> {
        self.collect(matcher)
    }

    fn find_within(&self, scope: &HttpElement, matchers: &[Matcher]) -> Option<HttpElement> {
        let doc = self.document.as_ref()?;
        if scope.location.generation != self.generation {
            return None;
        }
        let html = Html::parse_document(&doc.html);
        let order = document_order(&html);
        let root = order.get(scope.location.index)?.id();
        matchers.iter().find_map(|matcher| {
            matching_elements(&html, matcher)
                .into_iter()
                .filter(|el| el.ancestors().any(|node| node.id() == root))
                .find(is_visible)
                .map(|el| snapshot(el, &doc.url, locate(&order, el, self.generation)))
        })
    }

    fn fill(&mut self, element: &HttpElement, value: &str) -> Result<(), PageError> {
        let name = element.name.clone().ok_or_else(|| {
            PageError::Element(format!("<{}> has no name to fill", element.tag))
        })?;
        self.filled.insert(name, value.to_string());
        Ok(())
    }

    async fn click(&mut self, element: &HttpElement, timeout: Duration) -> Result<(), PageError> {
        if let Some(target) = element.target.clone() {
            let request = self.client.get(target);
            return self.load(request, timeout, "following link").await;
        }
        if let Some(form) = element.form.clone() {
            return self.submit(element, &form, timeout).await;
        }
        engine_debug!("click on <{}> has no effect without scripts", element.tag);
        Ok(())
    }

    async fn wait_for(
        &mut self,
        matchers: &[Matcher],
        timeout: Duration,
    ) -> Result<HttpElement, PageError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(found) = self.find_first_visible(matchers) {
                return Ok(found);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(PageError::Timeout("waiting for results".to_string()));
            }
            tokio::time::sleep(self.settings.poll_interval().min(deadline - now)).await;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if !remaining.is_zero() {
                if let Err(err) = self.reload(remaining).await {
                    engine_debug!("reload while waiting failed: {}", err);
                }
            }
        }
    }

    async fn download(
        &mut self,
        element: &HttpElement,
        timeout: Duration,
    ) -> Result<Download, PageError> {
        let target = element.target.clone().ok_or_else(|| {
            PageError::Element(format!("<{}> does not lead to a document", element.tag))
        })?;
        let response = self
            .send(self.client.get(target.clone()), timeout, "downloading document")
            .await?;

        let max_bytes = self.settings.max_download_bytes;
        if response.content_length().is_some_and(|len| len > max_bytes) {
            return Err(PageError::TooLarge { max_bytes });
        }

        let suggested_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition)
            .or_else(|| filename_from_url(response.url()));

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(err, "downloading document"))?;
            if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(PageError::TooLarge { max_bytes });
            }
            bytes.extend_from_slice(&chunk);
        }

        engine_debug!("downloaded {} bytes from {}", bytes.len(), target);
        Ok(Download {
            suggested_name,
            bytes,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error, what: &str) -> PageError {
    if err.is_timeout() {
        return PageError::Timeout(what.to_string());
    }
    PageError::Navigation(err.to_string())
}

fn matching_elements<'a>(html: &'a Html, matcher: &Matcher) -> Vec<ElementRef<'a>> {
    match matcher {
        Matcher::Css(css) => select(html, css).collect(),
        Matcher::CssText { css, text } => select(html, css)
            .filter(|el| contains_text(&element_text(*el), text))
            .collect(),
        Matcher::Text(text) => select(html, TEXT_CANDIDATES)
            .filter(|el| contains_text(&element_text(*el), text))
            .collect(),
        Matcher::HrefSuffix(suffix) => select(html, "a[href]")
            .filter(|el| {
                el.attr("href")
                    .map(|href| href_path(href).to_ascii_lowercase())
                    .is_some_and(|path| path.ends_with(&suffix.to_ascii_lowercase()))
            })
            .collect(),
    }
}

fn select<'a>(html: &'a Html, css: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let selector = match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(err) => {
            engine_debug!("skipping invalid selector {:?}: {:?}", css, err);
            None
        }
    };
    selector
        .into_iter()
        .flat_map(move |selector| html.select(&selector).collect::<Vec<_>>())
}

fn href_path(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

fn contains_text(haystack: &str, needle: &str) -> bool {
    let needle = collapse_whitespace(needle).to_lowercase();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef) -> String {
    if el.value().name() == "input" {
        return collapse_whitespace(el.attr("value").unwrap_or_default());
    }
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn is_visible(el: &ElementRef) -> bool {
    if el.value().name() == "input" && el.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")) {
        return false;
    }
    std::iter::once(*el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .all(|node| !hides(node))
}

fn hides(el: ElementRef) -> bool {
    if el.attr("hidden").is_some() {
        return true;
    }
    if el.attr("aria-hidden").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
        return true;
    }
    el.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn document_order(html: &Html) -> Vec<ElementRef<'_>> {
    html.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn locate(order: &[ElementRef], el: ElementRef, generation: u64) -> Location {
    let index = order
        .iter()
        .position(|other| other.id() == el.id())
        .unwrap_or(usize::MAX);
    Location { generation, index }
}

fn snapshot(el: ElementRef, base: &Url, location: Location) -> HttpElement {
    let tag = el.value().name().to_ascii_lowercase();
    HttpElement {
        text: element_text(el),
        name: el.attr("name").map(str::to_string),
        value: el.attr("value").map(str::to_string),
        target: link_target(el, base),
        form: enclosing_form(el, base),
        tag,
        location,
    }
}

fn link_target(el: ElementRef, base: &Url) -> Option<Url> {
    let own = el.attr("href").or_else(|| el.attr("data-href"));
    let raw = own.or_else(|| {
        Selector::parse("a[href], [data-href]").ok().and_then(|sel| {
            el.select(&sel)
                .next()
                .and_then(|child| child.attr("href").or_else(|| child.attr("data-href")))
        })
    })?;
    resolve_url(raw, base)
}

fn resolve_url(reference: &str, base: &Url) -> Option<Url> {
    let trimmed = reference.trim();
    let lower = trimmed.to_ascii_lowercase();
    if trimmed.is_empty() || lower.starts_with('#') || lower.starts_with("javascript:") {
        return None;
    }
    base.join(trimmed).ok()
}

fn enclosing_form(el: ElementRef, base: &Url) -> Option<FormSpec> {
    let form = el
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|node| node.value().name() == "form")?;

    let action = form
        .attr("action")
        .filter(|a| !a.trim().is_empty())
        .and_then(|a| base.join(a.trim()).ok())
        .unwrap_or_else(|| base.clone());
    let post = form
        .attr("method")
        .is_some_and(|m| m.eq_ignore_ascii_case("post"));

    let fields: Vec<(String, String)> = Selector::parse("input[name]")
        .map(|sel| {
            form.select(&sel)
                .filter(|input| {
                    let kind = input.attr("type").unwrap_or("text").to_ascii_lowercase();
                    if NON_FIELD_INPUTS.contains(&kind.as_str()) {
                        return false;
                    }
                    if kind == "checkbox" || kind == "radio" {
                        return input.attr("checked").is_some();
                    }
                    true
                })
                .filter_map(|input| {
                    let name = input.attr("name")?;
                    Some((name.to_string(), input.attr("value").unwrap_or_default().to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    Some(FormSpec {
        action,
        post,
        fields,
    })
}

fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';').map(str::trim) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value.trim().trim_matches('"');
                let encoded = encoded
                    .split_once("''")
                    .map_or(encoded, |(_, rest)| rest);
                let decoded = decode_component(encoded);
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
            "filename" => {
                let value = value.trim().trim_matches('"');
                if !value.is_empty() {
                    plain = Some(value.to_string());
                }
            }
            _ => {}
        }
    }
    plain
}

fn filename_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(decode_component)
}

fn decode_component(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

use std::time::Duration;

use crate::matcher::Matcher;
use crate::types::{Download, PageError};

/// Something located on a page.
pub trait PageElement {
    /// Visible text, whitespace collapsed.
    fn text(&self) -> &str;

    /// Whether activating the element leads to another resource.
    fn is_link(&self) -> bool;
}

/// Browser-style automation of one page session. Cookies and other session
/// state persist across calls.
#[async_trait::async_trait]
pub trait Page: Send {
    type Element: PageElement + Clone + Send + Sync;

    /// Loads `url`, waiting at most `timeout` for the document.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), PageError>;

    /// First visible element hit by the first matcher that hits anything.
    fn find_first_visible(&self, matchers: &[Matcher]) -> Option<Self::Element>;

    /// Every visible element the matcher hits, in document order.
    fn find_all(&self, matcher: &Matcher) -> Vec<Self::Element>;

    /// Like [`Page::find_first_visible`], restricted to descendants of
    /// `scope`. Nothing is found once the page has moved on.
    fn find_within(&self, scope: &Self::Element, matchers: &[Matcher]) -> Option<Self::Element>;

    /// Types `value` into a text input.
    fn fill(&mut self, element: &Self::Element, value: &str) -> Result<(), PageError>;

    /// Activates an element (follows its link or submits its form).
    async fn click(&mut self, element: &Self::Element, timeout: Duration) -> Result<(), PageError>;

    /// Waits until one of the matchers hits a visible element.
    async fn wait_for(
        &mut self,
        matchers: &[Matcher],
        timeout: Duration,
    ) -> Result<Self::Element, PageError>;

    /// Triggers the element and captures the resulting file transfer.
    async fn download(
        &mut self,
        element: &Self::Element,
        timeout: Duration,
    ) -> Result<Download, PageError>;
}

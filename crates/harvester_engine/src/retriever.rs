use std::path::Path;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use harvester_core::{text_matches, Identifier};

use crate::matcher::TargetProfile;
use crate::page::{Page, PageElement};
use crate::persist::DownloadStore;
use crate::types::{PageError, RetrievalOutcome};

/// Looks up one identifier on the target directory and saves its
/// certificate document.
pub struct CertificateRetriever<P: Page> {
    page: P,
    profile: TargetProfile,
}

impl<P: Page> CertificateRetriever<P> {
    pub fn new(page: P, profile: TargetProfile) -> Self {
        Self { page, profile }
    }

    /// Runs the full lookup for `identifier`. Every failure ends up in the
    /// returned outcome; `timeout` bounds each individual wait.
    pub async fn fetch_one(
        &mut self,
        identifier: &Identifier,
        out_dir: &Path,
        timeout: Duration,
    ) -> RetrievalOutcome {
        match self.try_fetch(identifier, out_dir, timeout).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_timeout() => {
                engine_debug!("{}: {}", identifier, err);
                RetrievalOutcome::TimedOut
            }
            Err(err) => RetrievalOutcome::Failed(err.to_string()),
        }
    }

    async fn try_fetch(
        &mut self,
        identifier: &Identifier,
        out_dir: &Path,
        timeout: Duration,
    ) -> Result<RetrievalOutcome, PageError> {
        let id = identifier.as_str();
        let landing = self
            .profile
            .direct_search_url(id)
            .unwrap_or_else(|| self.profile.search_url.clone());
        self.page.goto(&landing, timeout).await?;

        self.dismiss_consent(timeout).await;

        if self
            .page
            .find_first_visible(&self.profile.results_matchers)
            .is_none()
        {
            if let Some(failure) = self.search_manually(id, timeout).await? {
                return Ok(failure);
            }
        }

        match self
            .page
            .wait_for(&self.profile.results_matchers, timeout)
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_timeout() => return Ok(RetrievalOutcome::TimedOut),
            Err(err) => return Err(err),
        }

        let Some(record) = self.pick_record(id) else {
            return Ok(RetrievalOutcome::NotFound);
        };
        self.page.click(&record, timeout).await?;

        let Some(document) = self.find_document() else {
            return Ok(RetrievalOutcome::NotFound);
        };
        let download = self.page.download(&document, timeout).await?;

        match DownloadStore::new(out_dir).save(id, &download) {
            Ok(path) => Ok(RetrievalOutcome::Downloaded(path)),
            Err(err) => Ok(RetrievalOutcome::Failed(err.to_string())),
        }
    }

    /// Clicks the first visible consent control, if any. Never fails.
    async fn dismiss_consent(&mut self, timeout: Duration) {
        let Some(button) = self.page.find_first_visible(&self.profile.consent_matchers) else {
            return;
        };
        if let Err(err) = self.page.click(&button, timeout).await {
            engine_warn!("ignoring consent banner failure: {}", err);
        }
    }

    /// Fills the search box and submits it. Returns an outcome when the
    /// search form cannot be found.
    async fn search_manually(
        &mut self,
        id: &str,
        timeout: Duration,
    ) -> Result<Option<RetrievalOutcome>, PageError> {
        let Some(input) = self
            .page
            .find_first_visible(&self.profile.search_input_matchers)
        else {
            return Ok(Some(RetrievalOutcome::Failed(
                "search input not found".to_string(),
            )));
        };
        self.page.fill(&input, id)?;

        let Some(button) = self
            .page
            .find_first_visible(&self.profile.search_button_matchers)
        else {
            return Ok(Some(RetrievalOutcome::Failed(
                "search button not found".to_string(),
            )));
        };
        self.page.click(&button, timeout).await?;
        Ok(None)
    }

    /// The view control of the row whose text contains the identifier (the
    /// row itself when it has none), else the first view control on the page.
    fn pick_record(&self, id: &str) -> Option<P::Element> {
        let row = self
            .page
            .find_all(&self.profile.row_matcher)
            .into_iter()
            .find(|row| text_matches(row.text(), id));
        match row {
            Some(row) => Some(
                self.page
                    .find_within(&row, &self.profile.view_matchers)
                    .unwrap_or(row),
            ),
            None => self.page.find_first_visible(&self.profile.view_matchers),
        }
    }

    /// First linked hit, trying the document matchers in order.
    fn find_document(&self) -> Option<P::Element> {
        self.profile.document_matchers.iter().find_map(|matcher| {
            self.page
                .find_all(matcher)
                .into_iter()
                .find(|element| element.is_link())
        })
    }
}

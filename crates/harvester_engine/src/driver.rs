use std::path::Path;
use std::time::Duration;

use engine_logging::engine_debug;
use harvester_core::Identifier;

use crate::http_page::{HttpPage, HttpSettings};
use crate::matcher::TargetProfile;
use crate::retriever::CertificateRetriever;
use crate::types::{PageError, RetrievalOutcome};

/// Opens retrieval sessions. One session is used for a whole job.
#[async_trait::async_trait]
pub trait RetrievalDriver: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn RetrievalSession>, PageError>;
}

#[async_trait::async_trait]
pub trait RetrievalSession: Send {
    async fn fetch_one(
        &mut self,
        identifier: &Identifier,
        out_dir: &Path,
        timeout: Duration,
    ) -> RetrievalOutcome;

    /// Releases the session. Errors are swallowed.
    async fn close(&mut self) {}
}

/// Sessions backed by [`HttpPage`].
#[derive(Debug, Clone, Default)]
pub struct HttpDriver {
    profile: TargetProfile,
    settings: HttpSettings,
}

impl HttpDriver {
    pub fn new(profile: TargetProfile, settings: HttpSettings) -> Self {
        Self { profile, settings }
    }
}

#[async_trait::async_trait]
impl RetrievalDriver for HttpDriver {
    async fn open_session(&self) -> Result<Box<dyn RetrievalSession>, PageError> {
        let page = HttpPage::new(self.settings.clone())?;
        engine_debug!("opened http session for {}", self.profile.search_url);
        Ok(Box::new(HttpSession {
            retriever: CertificateRetriever::new(page, self.profile.clone()),
        }))
    }
}

struct HttpSession {
    retriever: CertificateRetriever<HttpPage>,
}

#[async_trait::async_trait]
impl RetrievalSession for HttpSession {
    async fn fetch_one(
        &mut self,
        identifier: &Identifier,
        out_dir: &Path,
        timeout: Duration,
    ) -> RetrievalOutcome {
        self.retriever.fetch_one(identifier, out_dir, timeout).await
    }
}

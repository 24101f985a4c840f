//! Search-and-merge orchestration.
//!
//! A lookup runs through fixed stages: native ids first, then ISBN or
//! catalog id, then title searches, then publication searches. Each
//! stage contributes candidate detail URLs with a relevance rank, the
//! candidates are deduplicated, and one worker thread per candidate
//! fetches and merges the records. The abort flag is checked between
//! stages and between channel polls, never mid-fetch.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::Caches;
use crate::config::{SearchConfig, SearchOperator};
use crate::covers;
use crate::error::{Error, Result};
use crate::fetch::{FetchConfig, Fetcher};
use crate::listing::{self, SimpleSearchFilter};
use crate::merge::merge;
use crate::parse::Document;
use crate::publication::parse_publication;
use crate::query;
use crate::record::{
    BookRecord, ID_CATALOG, ID_PUBLICATION, ID_TITLE, RELEVANCE_EXACT, RELEVANCE_ISBN,
    RELEVANCE_OTHER, Relevance, SearchStub,
};
use crate::series;
use crate::site::{Site, id_from_url};
use crate::text::{author_tokens, strip_record_marker, title_tokens};
use crate::title::parse_title;

/// Delay between successive worker starts, throttling the upstream.
const WORKER_STAGGER: Duration = Duration::from_millis(100);

/// How long one channel poll waits before re-checking the abort flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Leading marker on a title requesting an exact-match search.
const EXACT_MARKER: char = '=';

/// What the caller knows about the book being looked up.
#[derive(Debug, Clone, Default)]
pub struct IdentifyRequest {
    pub title: Option<String>,
    pub authors: Vec<String>,
    /// Known identifiers, e.g. `isbn`, `isfdb`, `isfdb-title`.
    pub identifiers: BTreeMap<String, String>,
}

/// One candidate detail URL awaiting a worker.
#[derive(Debug, Clone)]
struct Candidate {
    url: String,
    relevance: Relevance,
}

/// A metadata lookup session.
///
/// # Example
///
/// ```rust,no_run
/// use fabula_core::{Client, IdentifyRequest, SearchConfig};
///
/// let client = Client::new(SearchConfig::default()).unwrap();
/// let request = IdentifyRequest {
///     title: Some("The End of Eternity".to_string()),
///     authors: vec!["Isaac Asimov".to_string()],
///     ..Default::default()
/// };
/// for record in client.identify(&request).unwrap() {
///     println!("{} ({:?})", record.title, record.publisher);
/// }
/// ```
pub struct Client {
    config: SearchConfig,
    site: Site,
    fetcher: Fetcher,
    caches: Arc<Caches>,
    abort: Arc<AtomicBool>,
}

impl Client {
    pub fn new(config: SearchConfig) -> Result<Self> {
        Self::with_caches(config, Arc::new(Caches::new()))
    }

    /// Creates a client sharing caches restored from an earlier session.
    pub fn with_caches(config: SearchConfig, caches: Arc<Caches>) -> Result<Self> {
        let fetcher =
            Fetcher::new(FetchConfig { timeout: config.timeout_secs, ..FetchConfig::default() })?;
        let site = Site::new(&config.base_url);
        Ok(Self { config, site, fetcher, caches, abort: Arc::new(AtomicBool::new(false)) })
    }

    /// The shared abort flag. Setting it stops the pipeline at the next
    /// stage or poll boundary; in-flight fetches are not interrupted.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    fn aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    /// Runs the full lookup pipeline and returns merged records sorted
    /// by relevance.
    ///
    /// Per-candidate failures are logged and dropped; the call itself
    /// only fails on invalid configuration. An empty result is valid.
    pub fn identify(&self, request: &IdentifyRequest) -> Result<Vec<BookRecord>> {
        let (title, operator) = self.query_title(request);
        let author = request
            .authors
            .first()
            .map(|a| author_tokens(a).join(" "))
            .unwrap_or_default();

        let candidates = self.gather_candidates(request, &title, &author, operator)?;
        if candidates.is_empty() {
            info!("no candidates found");
            return Ok(Vec::new());
        }
        Ok(self.dispatch(candidates))
    }

    /// The title to search for, with the exact-match marker stripped.
    ///
    /// A record marker left over from an earlier lookup is removed
    /// first, so feeding a result title back in works.
    fn query_title(&self, request: &IdentifyRequest) -> (String, SearchOperator) {
        let raw = request.title.as_deref().unwrap_or_default();
        let title = strip_record_marker(raw);
        match title.strip_prefix(EXACT_MARKER) {
            Some(rest) => (rest.trim_start().to_string(), SearchOperator::ExactMatch),
            None => (title, self.config.search_operator),
        }
    }

    fn gather_candidates(
        &self,
        request: &IdentifyRequest,
        title: &str,
        author: &str,
        operator: SearchOperator,
    ) -> Result<Vec<Candidate>> {
        // A native id is authoritative; nothing else is searched.
        if let Some(id) = request.identifiers.get(ID_PUBLICATION) {
            return Ok(vec![Candidate {
                url: self.site.publication_url(id),
                relevance: RELEVANCE_EXACT,
            }]);
        }
        if let Some(id) = request.identifiers.get(ID_TITLE) {
            return Ok(vec![Candidate {
                url: self.site.title_url(id),
                relevance: RELEVANCE_EXACT,
            }]);
        }

        let mut candidates = Vec::new();
        let quota = self.config.max_results;

        let isbn = request
            .identifiers
            .get("isbn")
            .or_else(|| request.identifiers.get(ID_CATALOG));
        if let Some(isbn) = isbn {
            if !self.aborted() {
                self.search_by_isbn(isbn, &mut candidates);
            }
        }

        let search_terms = title_tokens(title).join(" ");
        if self.config.search_titles
            && !search_terms.is_empty()
            && candidates.len() < quota
            && !self.aborted()
        {
            self.search_title_records(&search_terms, title, author, operator, &mut candidates);
        }
        if self.config.search_publications
            && !search_terms.is_empty()
            && candidates.len() < quota
            && !self.aborted()
        {
            self.search_publication_records(&search_terms, title, author, operator, &mut candidates);
        }

        let mut unique: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            match unique.iter_mut().find(|c| c.url == candidate.url) {
                Some(existing) => {
                    existing.relevance = existing.relevance.min(candidate.relevance);
                }
                None => unique.push(candidate),
            }
        }
        unique.sort_by_key(|c| c.relevance);
        unique.truncate(quota);
        Ok(unique)
    }

    fn search_by_isbn(&self, isbn: &str, candidates: &mut Vec<Candidate>) {
        let url = query::publications_by_isbn(&self.site, isbn);
        let (doc, location) = match self.fetch_doc(&url) {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(%err, "ISBN search failed");
                return;
            }
        };
        // A single hit redirects straight to the publication page.
        if self.site.is_publication_url(&location) {
            candidates.push(Candidate { url: location, relevance: RELEVANCE_ISBN });
            return;
        }
        match listing::publication_stubs(&doc) {
            Ok(stubs) => {
                for stub in stubs {
                    if let Some(url) = stub.url {
                        candidates.push(Candidate {
                            url: self.site.absolute(&url),
                            relevance: RELEVANCE_ISBN,
                        });
                    }
                }
            }
            Err(err) => warn!(%err, "ISBN result list unreadable"),
        }
    }

    /// Title search stage. Every matching title is fetched and fanned
    /// out into one candidate per linked publication; titles without
    /// publications become candidates themselves.
    fn search_title_records(
        &self,
        search_terms: &str,
        query_title: &str,
        author: &str,
        operator: SearchOperator,
        candidates: &mut Vec<Candidate>,
    ) {
        let mut stubs = match self.title_search_stubs(search_terms, author, operator) {
            Ok(stubs) => stubs,
            Err(err) => {
                warn!(%err, "title search failed");
                return;
            }
        };
        stubs.sort_by(|a, b| a.date.cmp(&b.date));

        for stub in stubs {
            if self.aborted() || candidates.len() >= self.config.max_results {
                break;
            }
            let Some(url) = stub.url else { continue };
            let url = self.site.absolute(&url);
            let relevance = if listing::exact_title_match(&stub.title, query_title) {
                RELEVANCE_EXACT
            } else {
                RELEVANCE_OTHER
            };
            if let Err(err) = self.fan_out_title(&url, relevance, candidates) {
                warn!(%err, url, "title candidate dropped");
            }
        }
    }

    fn fan_out_title(
        &self,
        url: &str,
        relevance: Relevance,
        candidates: &mut Vec<Candidate>,
    ) -> Result<()> {
        let (doc, location) = self.fetch_doc(url)?;
        let record = parse_title(&doc, &location, &|_| None)?;
        if record.publication_ids.is_empty() {
            candidates.push(Candidate { url: location, relevance });
            return Ok(());
        }
        for publication_id in &record.publication_ids {
            self.caches.remember_title_id(publication_id, &record.id);
            candidates.push(Candidate {
                url: self.site.publication_url(publication_id),
                relevance,
            });
        }
        Ok(())
    }

    fn title_search_stubs(
        &self,
        search_terms: &str,
        author: &str,
        operator: SearchOperator,
    ) -> Result<Vec<SearchStub>> {
        let url = query::titles_by_title_author(&self.site, search_terms, author, operator);
        let (doc, _) = self.fetch_doc(&url)?;
        if !listing::advanced_search_refused(&doc) {
            return listing::title_stubs(&doc, &self.config.target_language);
        }

        info!("advanced search refused, retrying through simple search");
        let url = query::simple_title_search(&self.site, search_terms);
        let (doc, location) = self.fetch_doc(&url)?;
        if let Some(stub) = listing::single_title_redirect(&doc, &location) {
            return Ok(vec![stub]);
        }
        let filter = SimpleSearchFilter {
            exact_title: Some(search_terms.to_string()),
            author: (!author.is_empty()).then(|| author.to_string()),
        };
        listing::simple_title_stubs(&doc, &self.config.target_language, &filter)
    }

    fn search_publication_records(
        &self,
        search_terms: &str,
        query_title: &str,
        author: &str,
        operator: SearchOperator,
        candidates: &mut Vec<Candidate>,
    ) {
        let url = query::publications_by_title_author(&self.site, search_terms, author, operator);
        let (doc, location) = match self.fetch_doc(&url) {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(%err, "publication search failed");
                return;
            }
        };
        if listing::advanced_search_refused(&doc) {
            // The simple endpoint only searches titles; this stage has
            // no fallback.
            info!("advanced search refused, skipping publication stage");
            return;
        }
        if self.site.is_publication_url(&location) {
            candidates.push(Candidate { url: location, relevance: RELEVANCE_EXACT });
            return;
        }
        match listing::publication_stubs(&doc) {
            Ok(stubs) => {
                for stub in stubs {
                    if candidates.len() >= self.config.max_results {
                        break;
                    }
                    let Some(url) = stub.url else { continue };
                    let relevance = if listing::exact_title_match(&stub.title, query_title) {
                        RELEVANCE_EXACT
                    } else {
                        RELEVANCE_OTHER
                    };
                    candidates.push(Candidate { url: self.site.absolute(&url), relevance });
                }
            }
            Err(err) => warn!(%err, "publication result list unreadable"),
        }
    }

    /// Spawns one worker per candidate and collects their records.
    fn dispatch(&self, candidates: Vec<Candidate>) -> Vec<BookRecord> {
        let (sender, receiver) = mpsc::channel();

        for (n, candidate) in candidates.into_iter().enumerate() {
            if self.aborted() {
                debug!("abort observed, not starting further workers");
                break;
            }
            if n > 0 {
                thread::sleep(WORKER_STAGGER);
            }
            let worker = Worker {
                fetcher: self.fetcher.clone(),
                config: self.config.clone(),
                site: self.site.clone(),
                caches: Arc::clone(&self.caches),
                candidate,
            };
            let sender = sender.clone();
            thread::spawn(move || match worker.run() {
                Ok(record) => {
                    let _ = sender.send(record);
                }
                Err(err) => warn!(%err, url = %worker.candidate.url, "candidate dropped"),
            });
        }
        drop(sender);

        let mut records = Vec::new();
        loop {
            if self.aborted() {
                debug!("abort observed, returning collected records");
                break;
            }
            match receiver.recv_timeout(POLL_INTERVAL) {
                Ok(record) => records.push(record),
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        records.sort_by_key(|record| record.relevance);
        records
    }

    /// Resolves cover image URLs for a book.
    ///
    /// Order of preference: a cover cached for the publication id, the
    /// cover gallery of a known title id, and finally a full identify
    /// run whose results supply title ids and per-publication covers.
    pub fn find_covers(&self, request: &IdentifyRequest) -> Result<Vec<String>> {
        if let Some(publication_id) = request.identifiers.get(ID_PUBLICATION) {
            if let Some(url) = self.caches.cached_cover_url(&cover_key(publication_id)) {
                return Ok(vec![url]);
            }
        }
        if let Some(title_id) = request.identifiers.get(ID_TITLE) {
            return covers::fetch_title_covers(&self.fetcher, &self.config, title_id);
        }

        let mut urls: Vec<String> = Vec::new();
        for record in self.identify(request)? {
            if urls.len() >= self.config.max_covers {
                break;
            }
            if let Some(title_id) = record.title_id() {
                match covers::fetch_title_covers(&self.fetcher, &self.config, title_id) {
                    Ok(gallery) => {
                        for url in gallery {
                            if !urls.contains(&url) {
                                urls.push(url);
                            }
                        }
                        continue;
                    }
                    Err(err) => warn!(%err, title_id, "cover gallery fetch failed"),
                }
            }
            if let Some(url) = record.cover_url {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }
        urls.truncate(self.config.max_covers);
        Ok(urls)
    }

    fn fetch_doc(&self, url: &str) -> Result<(Document, String)> {
        let page = self.fetcher.get(url)?;
        Ok((Document::parse_bytes(&page.bytes)?, page.url))
    }
}

fn cover_key(publication_id: &str) -> String {
    format!("{ID_PUBLICATION}:{publication_id}")
}

/// One detail-fetch task.
///
/// Owns a clone of the fetcher so no connection state is shared with
/// sibling workers.
struct Worker {
    fetcher: Fetcher,
    config: SearchConfig,
    site: Site,
    caches: Arc<Caches>,
    candidate: Candidate,
}

impl Worker {
    fn run(&self) -> Result<BookRecord> {
        let url = &self.candidate.url;
        if self.site.is_publication_url(url) {
            self.run_publication(url)
        } else if self.site.is_title_url(url) {
            self.run_title(url)
        } else {
            Err(Error::UnrecognisedUrl(url.clone()))
        }
    }

    fn run_publication(&self, url: &str) -> Result<BookRecord> {
        let (doc, location) = self.fetch_doc(url)?;
        let resolver = self.series_resolver();
        let publication = parse_publication(&doc, &location, &self.config, &resolver)?;

        let title = self.owning_title(&publication);
        if let Some(cover) = &publication.cover_url {
            self.caches.remember_cover_url(&cover_key(&publication.id), cover);
        }
        Ok(merge(Some(publication), title, &self.config, self.candidate.relevance))
    }

    fn run_title(&self, url: &str) -> Result<BookRecord> {
        let (doc, location) = self.fetch_doc(url)?;
        let resolver = self.series_resolver();
        let title = parse_title(&doc, &location, &resolver)?;
        Ok(merge(None, Some(title), &self.config, self.candidate.relevance))
    }

    /// Finds the title record owning a publication: cache first, then
    /// the page's embedded title link, then an exact title search. The
    /// adopted title must list this publication.
    fn owning_title(
        &self,
        publication: &crate::record::PublicationRecord,
    ) -> Option<crate::record::TitleRecord> {
        let publication_id = publication.id.as_str();
        let title_id = self
            .caches
            .cached_title_id(publication_id)
            .or_else(|| publication.title_id.clone())
            .or_else(|| self.title_id_by_exact_search(publication))?;

        let (doc, location) = self.fetch_doc(&self.site.title_url(&title_id)).ok()?;
        let resolver = self.series_resolver();
        let title = match parse_title(&doc, &location, &resolver) {
            Ok(title) => title,
            Err(err) => {
                warn!(%err, title_id, "owning title unreadable");
                return None;
            }
        };
        if !title.publication_ids.is_empty()
            && !title.publication_ids.contains(&publication_id.to_string())
        {
            debug!(title_id, publication_id, "title does not list this publication");
            return None;
        }
        self.caches.remember_title_id(publication_id, &title.id);
        Some(title)
    }

    fn title_id_by_exact_search(
        &self,
        publication: &crate::record::PublicationRecord,
    ) -> Option<String> {
        let record_type = publication.record_type.as_deref()?;
        let author = publication
            .author_string
            .as_deref()
            .map(|a| a.trim_end_matches(" (Editor)"))
            .unwrap_or_default();
        let url = query::titles_by_exact_title(
            &self.site,
            &strip_record_marker(&publication.title),
            author,
            record_type,
        );
        let (doc, _) = self.fetch_doc(&url).ok()?;
        let stubs = listing::title_stubs(&doc, &self.config.target_language).ok()?;
        for stub in stubs {
            if !listing::exact_title_match(&stub.title, &publication.title) {
                continue;
            }
            if let Some(id) = stub.url.as_deref().and_then(id_from_url) {
                return Some(id);
            }
        }
        None
    }

    fn series_resolver(&self) -> impl Fn(&str) -> Option<String> + '_ {
        move |href: &str| {
            if self.site.is_author_url(href) {
                return None;
            }
            let url = self.site.absolute(href);
            match series::resolve_display_name(&self.fetcher, &self.config, &url) {
                Ok(name) => name,
                Err(err) => {
                    warn!(%err, url, "series page unreadable");
                    None
                }
            }
        }
    }

    fn fetch_doc(&self, url: &str) -> Result<(Document, String)> {
        let page = self.fetcher.get(url)?;
        Ok((Document::parse_bytes(&page.bytes)?, page.url))
    }
}

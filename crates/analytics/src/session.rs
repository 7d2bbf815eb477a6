//! Per-user dashboard state.
//!
//! One [`Session`] per user context owns everything the views share: the
//! current page, the cleaned snapshot, the imported watchlist and the
//! workbook cache. Views receive it by reference.

use std::path::Path;
use std::sync::Arc;

use axes_core::{AxesSnapshot, BestQuote, Config, Result};
use axes_ingestion::{LoaderStats, RawTable, Watchlist, WorkbookLoader};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crossref::{cross_reference, CrossMode};
use crate::pipeline::{now, try_load};

/// Dashboard pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Page {
    #[default]
    #[serde(rename = "accueil")]
    Home,
    #[serde(rename = "portfolio")]
    Portfolio,
    #[serde(rename = "filtrer_les_axes")]
    FilterAxes,
    #[serde(rename = "chercher_emetteur")]
    IssuerSearch,
    #[serde(rename = "Whichlist")]
    Watchlist,
    #[serde(rename = "flux")]
    Flow,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Home,
        Page::Portfolio,
        Page::FilterAxes,
        Page::IssuerSearch,
        Page::Watchlist,
        Page::Flow,
    ];

    /// Routing key of the page.
    pub fn key(self) -> &'static str {
        match self {
            Page::Home => "accueil",
            Page::Portfolio => "portfolio",
            Page::FilterAxes => "filtrer_les_axes",
            Page::IssuerSearch => "chercher_emetteur",
            Page::Watchlist => "Whichlist",
            Page::Flow => "flux",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

/// Serializable view of a session.
#[derive(Debug, Serialize)]
struct SessionView<'a> {
    page: Page,
    snapshot: Option<&'a AxesSnapshot>,
    watchlist: Option<&'a Watchlist>,
}

/// State of one dashboard session.
#[derive(Debug, Default)]
pub struct Session {
    page: Page,
    snapshot: Option<AxesSnapshot>,
    watchlist: Option<Watchlist>,
    loader: WorkbookLoader,
    last_error: Option<String>,
}

impl Session {
    /// Fresh session on the home page with nothing loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and clean the configured runs sheet.
    ///
    /// A source failure leaves an empty snapshot and is kept in
    /// [`Session::last_error`]. Unchanged files are served from the cache.
    pub fn load(&mut self, config: &Config) -> &AxesSnapshot {
        let now = now();
        let snapshot = match try_load(&mut self.loader, config, now) {
            Ok(snapshot) => {
                self.last_error = None;
                snapshot
            }
            Err(e) => {
                warn!(error = %e, "axes load failed, continuing with an empty snapshot");
                self.last_error = Some(e.to_string());
                AxesSnapshot::empty(now)
            }
        };
        self.snapshot.insert(snapshot)
    }

    /// Replace the snapshot, e.g. with one cleaned elsewhere.
    pub fn set_snapshot(&mut self, snapshot: AxesSnapshot) {
        self.snapshot = Some(snapshot);
    }

    /// Snapshot of the last load, if any.
    pub fn snapshot(&self) -> Option<&AxesSnapshot> {
        self.snapshot.as_ref()
    }

    /// Best quotes of the last load; empty before any load.
    pub fn best(&self) -> &[BestQuote] {
        match &self.snapshot {
            Some(snapshot) => &snapshot.best,
            None => &[],
        }
    }

    /// Error message of the last failed load.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Raw trades sheet, through the same cache.
    pub fn trades_table(&mut self, config: &Config) -> Result<Arc<RawTable>> {
        self.loader
            .load_sheet(&config.source.workbook, &config.source.trades_sheet)
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn navigate(&mut self, page: Page) {
        info!(from = self.page.key(), to = page.key(), "navigate");
        self.page = page;
    }

    /// Import a headerless watchlist workbook and keep it for the session.
    pub fn import_watchlist(&mut self, path: impl AsRef<Path>) -> Result<&Watchlist> {
        let table = self.loader.load_headerless(path)?;
        let watchlist = Watchlist::from_table(&table)?;
        info!(isins = watchlist.isins.len(), tickers = watchlist.tickers.len(), "watchlist imported");
        Ok(&*self.watchlist.insert(watchlist))
    }

    pub fn set_watchlist(&mut self, watchlist: Watchlist) {
        self.watchlist = Some(watchlist);
    }

    pub fn clear_watchlist(&mut self) {
        self.watchlist = None;
    }

    pub fn watchlist(&self) -> Option<&Watchlist> {
        self.watchlist.as_ref()
    }

    /// Best quotes matching the session watchlist; empty without one.
    pub fn cross_reference(&self, mode: CrossMode) -> Vec<BestQuote> {
        match &self.watchlist {
            Some(watchlist) => cross_reference(self.best(), watchlist, mode),
            None => Vec::new(),
        }
    }

    pub fn loader_stats(&self) -> LoaderStats {
        self.loader.stats()
    }

    /// Drop cached workbooks so the next load re-reads the source.
    pub fn clear_cache(&mut self) {
        self.loader.clear();
    }

    /// JSON dump of page, snapshot and watchlist.
    pub fn to_json(&self) -> Result<String> {
        let view = SessionView {
            page: self.page,
            snapshot: self.snapshot.as_ref(),
            watchlist: self.watchlist.as_ref(),
        };
        Ok(serde_json::to_string(&view)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_navigation() {
        let mut session = Session::new();
        assert_eq!(session.page(), Page::Home);
        session.navigate(Page::Flow);
        assert_eq!(session.page(), Page::Flow);
        assert_eq!(Page::from_key("Whichlist"), Some(Page::Watchlist));
        assert_eq!(Page::from_key("nowhere"), None);
    }

    #[test]
    fn test_failed_load_is_empty_with_error() {
        let mut session = Session::new();
        let mut config = Config::default();
        config.source.workbook = "/nonexistent/BDD_axes.xlsx".into();
        assert!(session.load(&config).is_empty());
        assert!(session.last_error().is_some());
        assert!(session.best().is_empty());
    }

    #[test]
    fn test_watchlist_lifecycle() {
        let mut session = Session::new();
        assert!(session.cross_reference(CrossMode::Isin).is_empty());
        session.set_watchlist(Watchlist {
            isins: BTreeSet::from(["XS1".to_string()]),
            tickers: BTreeSet::new(),
        });
        assert!(session.watchlist().is_some());
        session.clear_watchlist();
        assert!(session.watchlist().is_none());
    }

    #[test]
    fn test_load_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BDD_axes.xlsx");
        let mut book = umya_spreadsheet::new_file();
        let ws = book.get_sheet_mut(&0).unwrap();
        ws.set_name("Runs");
        let header = ["ImportDateTime", "ISIN", "Dealer", "IA_Offer_Price", "IA_Offer_YLD", "IA_Offer_QTY"];
        let row = ["2024-03-01 09:30:00", "XS1", "GS", "99.5", "4.1", "250"];
        for (c, (h, v)) in header.iter().zip(row.iter()).enumerate() {
            ws.get_cell_mut((c as u32 + 1, 1)).set_value(h.to_string());
            ws.get_cell_mut((c as u32 + 1, 2)).set_value(v.to_string());
        }
        umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();

        let mut config = Config::default();
        config.source.workbook = path;
        let mut session = Session::new();
        assert_eq!(session.load(&config).best.len(), 1);
        assert_eq!(session.load(&config).full_axes.len(), 1);
        assert_eq!(session.loader_stats().hits, 1);
        assert_eq!(session.loader_stats().misses, 1);

        session.set_watchlist(Watchlist {
            isins: BTreeSet::from(["XS1".to_string()]),
            tickers: BTreeSet::new(),
        });
        assert_eq!(session.cross_reference(CrossMode::Isin).len(), 1);

        let json = session.to_json().unwrap();
        assert!(json.contains("\"page\":\"accueil\""));
        assert!(json.contains("XS1"));
    }
}

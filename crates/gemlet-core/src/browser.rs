//! Main browser state container
//!
//! Every inbound operation runs one request to completion, commits the
//! result to the active tab and reports through the [`UiSink`]. Failures
//! become messages; the document on screen stays as it was.

use gemlet_document::Document;
use gemlet_navigation::{
    with_query, NavOutcome, NavigationEngine, NavigationError, RedirectPolicy, Target,
};
use gemlet_storage::{Database, KnownHosts};
use gemlet_tabs::TabSet;
use gemlet_transport::{AcceptAnyTrust, Connector, TlsConnector, TrustStore};
use url::Url;

use crate::config::{CertPolicy, Config};
use crate::error::CoreError;
use crate::ui::{Severity, UiSink};
use crate::Result;

const HOMEPAGE_KEY: &str = "homepage";
const AUTO_REDIRECT_KEY: &str = "auto_redirect";
const MAX_REDIRECTS_KEY: &str = "max_redirects";

/// A navigation that stopped to ask the user something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    /// Answer with [`Browser::submit_input`]
    Input {
        url: Url,
        prompt: String,
        sensitive: bool,
    },
    /// Confirm with [`Browser::follow_redirect`]
    Redirect { from: Url, to: Url },
}

/// What an inbound navigation call ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowStatus {
    /// A document is now current in the active tab
    Committed,
    NeedsInput,
    NeedsRedirectConfirmation,
    /// Reported through the sink; nothing changed
    Failed,
}

#[derive(Debug, Clone, Copy)]
enum Commit {
    Add,
    Replace,
}

pub struct Browser {
    config: Config,
    db: Database,
    engine: NavigationEngine,
    tabs: TabSet,
    pending: Option<Pending>,
    ui: Box<dyn UiSink>,
}

impl Browser {
    /// Open the database named by `config` and connect over TLS.
    pub fn new(config: Config, ui: Box<dyn UiSink>) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&config.database_path)?;
        let connector =
            TlsConnector::with_timeouts(Some(config.connect_timeout()), config.read_timeout())?;

        Ok(Self::with_connector(config, db, Box::new(connector), ui))
    }

    /// Build around an existing database and connector.
    pub fn with_connector(
        config: Config,
        db: Database,
        connector: Box<dyn Connector>,
        ui: Box<dyn UiSink>,
    ) -> Self {
        let trust: Box<dyn TrustStore> = match config.cert_policy {
            CertPolicy::Tofu => Box::new(KnownHosts::new(db.clone())),
            CertPolicy::AcceptAny => Box::new(AcceptAnyTrust),
        };
        let engine = NavigationEngine::new(connector, trust).with_redirect_policy(RedirectPolicy {
            auto_follow: config.auto_redirect,
            max_redirects: config.max_redirects,
        });

        Self {
            config,
            db,
            engine,
            tabs: TabSet::new(),
            pending: None,
            ui,
        }
    }

    /// Apply settings stored in the database over the config file.
    pub fn initialize(&mut self) -> Result<()> {
        if let Some(homepage) = self.db.get_setting(HOMEPAGE_KEY)? {
            self.config.homepage = homepage;
        }
        if let Some(auto) = self.db.get_parsed_setting::<bool>(AUTO_REDIRECT_KEY)? {
            self.config.auto_redirect = auto;
        }
        if let Some(max) = self.db.get_parsed_setting::<u8>(MAX_REDIRECTS_KEY)? {
            self.config.max_redirects = max;
        }
        self.apply_redirect_policy();

        tracing::info!(homepage = %self.config.homepage, "Browser initialized");
        Ok(())
    }

    // === Navigation ===

    pub fn open_homepage(&mut self) -> FollowStatus {
        let homepage = self.config.homepage.clone();
        self.follow(&homepage)
    }

    /// Navigate to a URL, or to a numbered link on the current page.
    pub fn follow(&mut self, input: &str) -> FollowStatus {
        let current = self.current_document().map(|doc| doc.url().clone());

        let target = match Target::parse(input, current.as_ref()) {
            Ok(target) => target,
            Err(e) => return self.fail(e.into()),
        };

        let url = match target {
            Target::Url(url) => url,
            Target::Link(number) => {
                let link = self
                    .current_document()
                    .and_then(|doc| doc.link(number))
                    .map(|link| link.url.clone());
                match link {
                    Some(url) => url,
                    None => return self.fail(NavigationError::NoSuchLink(number).into()),
                }
            }
        };

        self.navigate(url, Commit::Add)
    }

    /// Answer the pending input prompt.
    pub fn submit_input(&mut self, text: &str) -> FollowStatus {
        match self.pending.take() {
            Some(Pending::Input { url, .. }) => self.navigate(with_query(&url, text), Commit::Add),
            other => {
                self.pending = other;
                self.fail(CoreError::NoPendingInput)
            }
        }
    }

    /// Follow the redirect waiting for confirmation.
    pub fn follow_redirect(&mut self) -> FollowStatus {
        match self.pending.take() {
            Some(Pending::Redirect { to, .. }) => self.navigate(to, Commit::Add),
            other => {
                self.pending = other;
                self.fail(CoreError::NoPendingRedirect)
            }
        }
    }

    /// Drop a pending prompt or redirect.
    pub fn cancel_pending(&mut self) {
        if self.pending.take().is_some() {
            self.ui.on_message(Severity::Info, "Cancelled");
        }
    }

    /// Fetch the current page again, replacing it in history.
    pub fn reload(&mut self) -> FollowStatus {
        match self.current_document().map(|doc| doc.url().clone()) {
            Some(url) => self.navigate(url, Commit::Replace),
            None => {
                self.ui.on_message(Severity::Info, "Nothing to reload");
                FollowStatus::Failed
            }
        }
    }

    pub fn history_back(&mut self) -> bool {
        self.pending = None;
        let moved = self.tabs.active_mut().back().is_some();
        self.report_move(moved, "Already at the oldest page")
    }

    pub fn history_forward(&mut self) -> bool {
        self.pending = None;
        let moved = self.tabs.active_mut().forward().is_some();
        self.report_move(moved, "Already at the newest page")
    }

    // === Tab operations ===

    /// Open a tab after the active one, optionally navigating it.
    pub fn new_tab(&mut self, url: Option<&str>) -> Option<FollowStatus> {
        self.pending = None;
        self.tabs.add_session();
        self.ui.on_document_changed();

        url.map(|url| self.follow(url))
    }

    /// Close the active tab. The last tab stays open.
    pub fn close_tab(&mut self) -> bool {
        let index = self.tabs.active_index();
        match self.tabs.close_session(index) {
            Ok(()) => {
                self.pending = None;
                self.ui.on_document_changed();
                true
            }
            Err(e) => {
                self.ui.on_message(Severity::Warning, &e.to_string());
                false
            }
        }
    }

    /// Move to the tab `direction` places away, clamped at either end.
    pub fn switch_tab(&mut self, direction: isize) -> bool {
        let before = self.tabs.active_index();
        let moved = self.tabs.switch(direction) != before;
        if moved {
            self.pending = None;
            self.ui.on_document_changed();
        }
        moved
    }

    // === Queries ===

    pub fn current_document(&self) -> Option<&Document> {
        self.tabs.active().current()
    }

    /// Whether the active tab's history holds `url`.
    pub fn is_visited(&self, url: &Url) -> bool {
        self.tabs.active().history().contains(url) > 0
    }

    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    pub fn tabs(&self) -> &TabSet {
        &self.tabs
    }

    // === Settings operations ===

    pub fn set_homepage(&mut self, homepage: &str) -> Result<()> {
        Url::parse(homepage).map_err(|_| CoreError::Config(format!("not a URL: {homepage}")))?;
        self.db.set_setting(HOMEPAGE_KEY, homepage)?;
        self.config.homepage = homepage.to_string();
        Ok(())
    }

    pub fn set_auto_redirect(&mut self, enabled: bool) -> Result<()> {
        self.db
            .set_setting(AUTO_REDIRECT_KEY, if enabled { "true" } else { "false" })?;
        self.config.auto_redirect = enabled;
        self.apply_redirect_policy();
        Ok(())
    }

    pub fn set_max_redirects(&mut self, max: u8) -> Result<()> {
        self.db.set_setting(MAX_REDIRECTS_KEY, &max.to_string())?;
        self.config.max_redirects = max;
        self.apply_redirect_policy();
        Ok(())
    }

    // === Certificate operations ===

    /// Drop the pinned certificate for `host:port`, so the next visit pins
    /// whatever the server presents. Returns whether a pin existed.
    pub fn forget_host(&mut self, host: &str, port: u16) -> Result<bool> {
        let removed = KnownHosts::new(self.db.clone()).forget(host, port)?;
        if removed {
            tracing::info!(host, port, "Forgot pinned certificate");
        }
        Ok(removed)
    }

    // === Config ===

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn apply_redirect_policy(&mut self) {
        self.engine.set_redirect_policy(RedirectPolicy {
            auto_follow: self.config.auto_redirect,
            max_redirects: self.config.max_redirects,
        });
    }

    fn navigate(&mut self, url: Url, commit: Commit) -> FollowStatus {
        self.pending = None;

        match self.engine.follow(url) {
            Ok(NavOutcome::Document(doc)) => {
                if doc.status_class().is_failure() {
                    let text = format!("{} {}", doc.status(), doc.meta());
                    self.ui.on_message(Severity::Warning, &text);
                }

                let session = self.tabs.active_mut();
                match commit {
                    Commit::Add => session.navigate(doc),
                    Commit::Replace => session.reload(doc),
                }
                self.ui.on_document_changed();
                FollowStatus::Committed
            }
            Ok(NavOutcome::Input {
                url,
                prompt,
                sensitive,
            }) => {
                self.ui.on_message(Severity::Info, &prompt);
                self.pending = Some(Pending::Input {
                    url,
                    prompt,
                    sensitive,
                });
                FollowStatus::NeedsInput
            }
            Ok(NavOutcome::Redirect { from, to }) => {
                self.ui
                    .on_message(Severity::Info, &format!("Redirect to {to}, confirm to follow"));
                self.pending = Some(Pending::Redirect { from, to });
                FollowStatus::NeedsRedirectConfirmation
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn report_move(&mut self, moved: bool, boundary: &str) -> bool {
        if moved {
            self.ui.on_document_changed();
        } else {
            self.ui.on_message(Severity::Info, boundary);
        }
        moved
    }

    fn fail(&mut self, error: CoreError) -> FollowStatus {
        tracing::warn!(error = %error, "Navigation failed");

        // The server answered; only its redirect target was unusable
        let severity = match &error {
            CoreError::Navigation(NavigationError::MalformedRedirect { .. }) => Severity::Warning,
            _ => Severity::Error,
        };
        self.ui.on_message(severity, &error.to_string());
        FollowStatus::Failed
    }
}

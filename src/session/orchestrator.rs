use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;

use crate::{
    clock::Clock,
    config::AppConfig,
    entitlement::{Entitlement, EntitlementResolver},
    identity::IdentityStore,
    ledger::UsageLedger,
    launch::DocumentReference,
    models::UserIdentity,
    navigation::{
        DocumentView, MenuCommand, NavigationController, TransitionOutcome, ViewCommand,
        ViewMode, WindowShell,
    },
    remote::{spawn_sync_usage, spawn_sync_user, RemoteService},
    store::JsonStore,
};

use super::{metering::Metering, SessionHandle, SessionMessage, SessionStatus};

/// Collaborators the orchestrator is built from.
pub struct SessionDeps {
    pub config: AppConfig,
    pub store: JsonStore,
    pub clock: Arc<dyn Clock>,
    pub remote: Arc<dyn RemoteService>,
    pub view: Arc<dyn DocumentView>,
    pub shell: Arc<dyn WindowShell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// The one session of this process: view mode, usage metering, trial
/// gate and identity, all driven from a single control loop.
pub struct SessionOrchestrator {
    nav: NavigationController,
    ledger: Arc<UsageLedger>,
    metering: Metering,
    identity: IdentityStore,
    entitlement: EntitlementResolver,
    remote: Arc<dyn RemoteService>,
    session: SessionHandle,
    usage_sync_every: u32,
    window_ready: bool,
    pending_open: Option<DocumentReference>,
    pending_trial_notice: bool,
    last_verdict: Option<Entitlement>,
    /// Seconds left before the gate closes; `None` is unlimited.
    budget: Option<u64>,
    ticks: u32,
}

impl SessionOrchestrator {
    /// Builds the session for a fresh process. The startup document, if
    /// any and if the trial allows it, is shown once the window is ready.
    pub async fn launch(
        deps: SessionDeps,
        initial: Option<DocumentReference>,
        session: SessionHandle,
    ) -> Self {
        let SessionDeps {
            config,
            store,
            clock,
            remote,
            view,
            shell,
        } = deps;

        let ledger = Arc::new(UsageLedger::load(
            store.clone(),
            clock,
            config.day_cutoff_hour,
        ));
        let identity = IdentityStore::new(store);
        let entitlement = EntitlementResolver::new(
            identity.clone(),
            ledger.clone(),
            remote.clone(),
            config.daily_limit_secs,
            config.remote_timeout(),
        );

        let (initial_mode, pending_open, pending_trial_notice, verdict) = match initial {
            None => (ViewMode::Home, None, false, None),
            Some(doc) => {
                let verdict = entitlement.resolve().await;
                if verdict.allows_viewing() {
                    (ViewMode::Document, Some(doc), false, Some(verdict))
                } else {
                    info!("Trial exhausted; starting at home instead of {doc}");
                    (ViewMode::Home, None, true, Some(verdict))
                }
            }
        };

        Self {
            nav: NavigationController::new(initial_mode, view, shell, config.view_timeout()),
            metering: Metering::new(ledger.clone(), config.tick_interval()),
            ledger,
            identity,
            entitlement,
            remote,
            session,
            usage_sync_every: config.usage_sync_every_ticks.max(1),
            window_ready: false,
            pending_open,
            pending_trial_notice,
            last_verdict: verdict,
            budget: verdict.and_then(|v| v.remaining_seconds()),
            ticks: 0,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.nav.mode()
    }

    pub fn current_document(&self) -> Option<&DocumentReference> {
        self.nav.current_document()
    }

    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    pub fn is_metering(&self) -> bool {
        self.metering.is_running()
    }

    /// Drains the channel until `Shutdown` or until every sender is gone.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionMessage>) {
        while let Some(message) = rx.recv().await {
            if self.handle(message).await == Flow::Stop {
                break;
            }
        }
        self.stop_metering();
        info!("Session control loop finished");
    }

    pub async fn handle(&mut self, message: SessionMessage) -> Flow {
        match message {
            SessionMessage::WindowReady => self.on_window_ready().await,
            SessionMessage::OpenRequested(doc) => self.request_open(doc).await,
            SessionMessage::SecondInstance(launch) => {
                // Re-resolved from the secondary's own arguments.
                match launch.document() {
                    Some(doc) => self.request_open(doc).await,
                    None if self.window_ready => self.nav.shell().bring_to_front(),
                    None => {}
                }
            }
            SessionMessage::Menu(command) => self.on_menu(command).await,
            SessionMessage::NavigateHome => self.go_home().await,
            SessionMessage::CloseRequested => self.on_close_requested().await,
            SessionMessage::Tick => self.on_tick().await,
            SessionMessage::SignedIn(identity) => self.on_signed_in(identity).await,
            SessionMessage::SignedOut => self.on_signed_out().await,
            SessionMessage::Status(reply) => {
                let _ = reply.send(self.status());
            }
            SessionMessage::Shutdown => {
                self.stop_metering();
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            mode: self.nav.mode(),
            document: self.nav.current_document().cloned(),
            entitlement: self.last_verdict.unwrap_or_else(|| self.entitlement.local()),
            daily_seconds_used: self.ledger.snapshot().daily_seconds_used,
            signed_in: self.identity.load().is_some(),
        }
    }

    async fn on_window_ready(&mut self) {
        self.window_ready = true;
        self.nav.sync_menu();

        if let Some(doc) = self.pending_open.take() {
            if self.nav.present_initial(doc.clone()) {
                self.metering.start(&self.session);
            } else {
                self.request_open(doc).await;
            }
        }

        if std::mem::take(&mut self.pending_trial_notice) {
            self.nav.view().send(ViewCommand::TrialExpired);
        }
    }

    async fn request_open(&mut self, doc: DocumentReference) {
        if !self.window_ready {
            // Latest request wins until the window can take it.
            self.pending_open = Some(doc);
            return;
        }

        self.nav.shell().bring_to_front();

        if self.nav.mode() == ViewMode::Home && !self.refresh_verdict().await.allows_viewing() {
            info!("Trial exhausted; refusing to open {doc}");
            self.nav.view().send(ViewCommand::TrialExpired);
            return;
        }

        let outcome = self.nav.open_document(doc).await;
        self.after_transition(outcome);
    }

    async fn go_home(&mut self) {
        let outcome = self.nav.go_home().await;
        self.after_transition(outcome);
    }

    async fn on_menu(&mut self, command: MenuCommand) {
        match command {
            MenuCommand::Open => {
                if let Some(doc) = self.nav.shell().pick_document().await {
                    self.request_open(doc).await;
                }
            }
            MenuCommand::Home => self.go_home().await,
            other => {
                if self.nav.mode() != ViewMode::Document {
                    return;
                }
                if let Some(forward) = ViewCommand::from_menu(other) {
                    self.nav.view().send(forward);
                }
            }
        }
    }

    async fn on_close_requested(&mut self) {
        let outcome = self.nav.request_exit().await;
        if !outcome.is_committed() {
            return;
        }
        self.after_transition(outcome);
        self.window_ready = false;
        self.nav.shell().close_window();
    }

    async fn on_tick(&mut self) {
        if self.nav.mode() != ViewMode::Document || !self.metering.is_running() {
            return;
        }

        let added = self.metering.tick();
        self.consume_budget(added);

        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % self.usage_sync_every == 0 {
            self.sync_usage();
        }

        if self.budget == Some(0) {
            self.enforce_trial().await;
        }
    }

    async fn enforce_trial(&mut self) {
        // One fresh lookup first: the backend may have granted more time.
        if self.refresh_verdict().await.allows_viewing() {
            return;
        }

        info!("Daily trial budget used up; returning home");
        self.nav.view().send(ViewCommand::TrialExpired);
        let outcome = self.nav.go_home().await;
        self.after_transition(outcome);
    }

    async fn on_signed_in(&mut self, identity: UserIdentity) {
        if let Err(err) = self.identity.save(&identity) {
            warn!("Failed to persist identity for {}: {err:#}", identity.uid);
        }
        spawn_sync_user(self.remote.clone(), identity);
        self.refresh_verdict().await;
    }

    async fn on_signed_out(&mut self) {
        if let Err(err) = self.identity.clear() {
            warn!("Failed to delete stored identity: {err:#}");
        }
        self.refresh_verdict().await;
    }

    fn after_transition(&mut self, outcome: TransitionOutcome) {
        let TransitionOutcome::Committed { from, to } = outcome else {
            return;
        };
        if from == ViewMode::Document {
            self.stop_metering();
        }
        if to == ViewMode::Document {
            self.metering.start(&self.session);
        }
    }

    fn stop_metering(&mut self) {
        if !self.metering.is_running() {
            return;
        }
        let added = self.metering.stop();
        self.consume_budget(added);
        self.sync_usage();
    }

    fn consume_budget(&mut self, seconds: u64) {
        if let Some(left) = self.budget.as_mut() {
            *left = left.saturating_sub(seconds);
        }
    }

    async fn refresh_verdict(&mut self) -> Entitlement {
        let verdict = self.entitlement.resolve().await;
        self.last_verdict = Some(verdict);
        self.budget = verdict.remaining_seconds();
        verdict
    }

    fn sync_usage(&self) {
        let Some(identity) = self.identity.load() else {
            return;
        };
        let record = self.ledger.snapshot();
        spawn_sync_usage(
            self.remote.clone(),
            identity.uid,
            record.daily_seconds_used,
            record.last_reset_date,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        instance::ForwardedLaunch,
        models::UsageRecord,
        navigation::{MenuConfig, UnsavedChoice},
        remote::EntitlementResponse,
        session::channel,
        test_support::{doc, FakeRemote, FakeShell, FakeView},
    };
    use chrono::{Duration, Local, NaiveDate, TimeZone};
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        store: JsonStore,
        config: AppConfig,
        clock: Arc<crate::clock::ManualClock>,
        remote: Arc<FakeRemote>,
        view: Arc<FakeView>,
        shell: Arc<FakeShell>,
        session: SessionHandle,
        _rx: mpsc::UnboundedReceiver<SessionMessage>,
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    impl Harness {
        fn new(view: FakeView, choice: UnsavedChoice) -> Self {
            let dir = TempDir::new().unwrap();
            let store = JsonStore::new(dir.path()).unwrap();
            let start = Local.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
            let (session, rx) = channel();
            Self {
                _dir: dir,
                store,
                config: AppConfig::default(),
                clock: Arc::new(crate::clock::ManualClock::new(start)),
                remote: Arc::new(FakeRemote::offline()),
                view: Arc::new(view),
                shell: Arc::new(FakeShell::choosing(choice)),
                session,
                _rx: rx,
            }
        }

        fn with_usage(self, seconds: u64) -> Self {
            self.store
                .write(
                    "usage",
                    &UsageRecord {
                        daily_seconds_used: seconds,
                        last_reset_date: today(),
                    },
                )
                .unwrap();
            self
        }

        fn signed_in(self) -> Self {
            IdentityStore::new(self.store.clone())
                .save(&user())
                .unwrap();
            self
        }

        async fn launch(&self, initial: Option<DocumentReference>) -> SessionOrchestrator {
            let deps = SessionDeps {
                config: self.config.clone(),
                store: self.store.clone(),
                clock: self.clock.clone(),
                remote: self.remote.clone(),
                view: self.view.clone(),
                shell: self.shell.clone(),
            };
            SessionOrchestrator::launch(deps, initial, self.session.clone()).await
        }

        async fn ready(&self, initial: Option<DocumentReference>) -> SessionOrchestrator {
            let mut session = self.launch(initial).await;
            session.handle(SessionMessage::WindowReady).await;
            session
        }

        fn advance(&self, seconds: i64) {
            self.clock.advance(Duration::seconds(seconds));
        }
    }

    fn user() -> UserIdentity {
        UserIdentity {
            uid: "u-42".into(),
            email: "reader@example.com".into(),
            display_name: "Reader".into(),
        }
    }

    fn trial(seconds: i64) -> Result<EntitlementResponse, String> {
        Ok(EntitlementResponse {
            is_premium: false,
            trial_seconds_remaining: Some(seconds),
        })
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn startup_document_waits_for_window() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel);
        let mut session = h.launch(Some(doc("/tmp/a.pdf"))).await;

        assert_eq!(session.mode(), ViewMode::Document);
        assert!(h.view.sent().is_empty());
        assert!(!session.is_metering());

        session.handle(SessionMessage::WindowReady).await;

        assert_eq!(h.view.sent(), vec![ViewCommand::OpenDocument(doc("/tmp/a.pdf"))]);
        assert_eq!(session.current_document(), Some(&doc("/tmp/a.pdf")));
        assert!(session.is_metering());
        assert_eq!(h.shell.last_menu(), Some(MenuConfig::for_mode(ViewMode::Document)));
    }

    #[tokio::test]
    async fn no_document_starts_home() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel);
        let session = h.ready(None).await;

        assert_eq!(session.mode(), ViewMode::Home);
        assert!(h.view.sent().is_empty());
        assert!(!session.is_metering());
        assert_eq!(h.shell.last_menu(), Some(MenuConfig::for_mode(ViewMode::Home)));
    }

    #[tokio::test]
    async fn exhausted_trial_refuses_startup_document() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel).with_usage(3600);
        let session = h.ready(Some(doc("/tmp/a.pdf"))).await;

        assert_eq!(session.mode(), ViewMode::Home);
        assert_eq!(h.view.sent(), vec![ViewCommand::TrialExpired]);
        assert!(!session.is_metering());
    }

    #[tokio::test]
    async fn exhausted_trial_refuses_later_opens() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel).with_usage(3600);
        let mut session = h.ready(None).await;

        session
            .handle(SessionMessage::OpenRequested(doc("/tmp/a.pdf")))
            .await;

        assert_eq!(session.mode(), ViewMode::Home);
        assert_eq!(h.view.sent(), vec![ViewCommand::TrialExpired]);
    }

    #[tokio::test]
    async fn opens_before_window_ready_are_deferred() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel);
        let mut session = h.launch(None).await;

        session
            .handle(SessionMessage::OpenRequested(doc("/tmp/a.pdf")))
            .await;
        session
            .handle(SessionMessage::OpenRequested(doc("/tmp/b.pdf")))
            .await;
        assert!(h.view.sent().is_empty());

        session.handle(SessionMessage::WindowReady).await;

        assert_eq!(h.view.sent(), vec![ViewCommand::OpenDocument(doc("/tmp/b.pdf"))]);
        assert_eq!(session.mode(), ViewMode::Document);
    }

    #[tokio::test]
    async fn second_instance_reuses_the_window() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel);
        let mut session = h.ready(None).await;

        let forwarded = ForwardedLaunch {
            args: vec!["eclipse-pdf".into(), "--flag".into(), "report.pdf".into()],
            cwd: Some("/home/reader".into()),
        };
        session
            .handle(SessionMessage::SecondInstance(forwarded))
            .await;

        assert_eq!(session.mode(), ViewMode::Document);
        assert_eq!(
            session.current_document(),
            Some(&doc("/home/reader/report.pdf"))
        );
        assert_eq!(h.shell.focused.load(Ordering::SeqCst), 1);

        let bare = ForwardedLaunch {
            args: vec!["eclipse-pdf".into()],
            cwd: None,
        };
        session.handle(SessionMessage::SecondInstance(bare)).await;

        assert_eq!(h.shell.focused.load(Ordering::SeqCst), 2);
        assert_eq!(
            session.current_document(),
            Some(&doc("/home/reader/report.pdf"))
        );
    }

    #[tokio::test]
    async fn metering_follows_the_document() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel);
        let mut session = h.ready(None).await;

        session
            .handle(SessionMessage::OpenRequested(doc("/tmp/a.pdf")))
            .await;
        assert!(session.is_metering());

        h.advance(7);
        session.handle(SessionMessage::Tick).await;
        assert_eq!(session.ledger().snapshot().daily_seconds_used, 7);

        h.advance(3);
        session.handle(SessionMessage::NavigateHome).await;
        assert!(!session.is_metering());
        assert_eq!(session.ledger().snapshot().daily_seconds_used, 10);

        h.advance(60);
        session.handle(SessionMessage::Tick).await;
        assert_eq!(session.ledger().snapshot().daily_seconds_used, 10);
    }

    #[tokio::test]
    async fn cancel_keeps_document_and_metering() {
        let h = Harness::new(FakeView::dirty(), UnsavedChoice::Cancel);
        let mut session = h.ready(Some(doc("/tmp/a.pdf"))).await;

        session.handle(SessionMessage::NavigateHome).await;
        session.handle(SessionMessage::CloseRequested).await;
        session
            .handle(SessionMessage::OpenRequested(doc("/tmp/b.pdf")))
            .await;

        assert_eq!(session.mode(), ViewMode::Document);
        assert_eq!(session.current_document(), Some(&doc("/tmp/a.pdf")));
        assert!(session.is_metering());
        assert_eq!(h.shell.closed.load(Ordering::SeqCst), 0);
        assert_eq!(h.shell.prompts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn save_choice_saves_then_switches() {
        let h = Harness::new(FakeView::dirty(), UnsavedChoice::Save);
        let mut session = h.ready(Some(doc("/tmp/a.pdf"))).await;

        h.advance(4);
        session
            .handle(SessionMessage::OpenRequested(doc("/tmp/b.pdf")))
            .await;

        assert_eq!(h.view.save_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.current_document(), Some(&doc("/tmp/b.pdf")));
        assert!(session.is_metering());
        assert_eq!(session.ledger().snapshot().daily_seconds_used, 4);
    }

    #[tokio::test]
    async fn committed_close_stops_metering_and_closes() {
        let h = Harness::new(FakeView::dirty(), UnsavedChoice::Discard);
        let mut session = h.ready(Some(doc("/tmp/a.pdf"))).await;

        h.advance(5);
        session.handle(SessionMessage::CloseRequested).await;

        assert_eq!(h.shell.closed.load(Ordering::SeqCst), 1);
        assert_eq!(session.mode(), ViewMode::Home);
        assert!(!session.is_metering());
        assert_eq!(session.ledger().snapshot().daily_seconds_used, 5);
    }

    #[tokio::test]
    async fn menu_commands_reach_the_view_only_in_document() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel);
        let mut session = h.ready(None).await;

        session.handle(SessionMessage::Menu(MenuCommand::Save)).await;
        assert!(h.view.sent().is_empty());

        *h.shell.picked.lock().unwrap() = Some(doc("/tmp/picked.pdf"));
        session.handle(SessionMessage::Menu(MenuCommand::Open)).await;
        session.handle(SessionMessage::Menu(MenuCommand::Print)).await;

        assert_eq!(
            h.view.sent(),
            vec![
                ViewCommand::OpenDocument(doc("/tmp/picked.pdf")),
                ViewCommand::Print,
            ]
        );
    }

    #[tokio::test]
    async fn empty_budget_sends_the_view_home() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel).with_usage(3590);
        let mut session = h.ready(Some(doc("/tmp/a.pdf"))).await;
        assert_eq!(session.budget(), Some(10));

        h.advance(12);
        session.handle(SessionMessage::Tick).await;

        assert_eq!(session.mode(), ViewMode::Home);
        assert!(!session.is_metering());
        let sent = h.view.sent();
        assert_eq!(
            &sent[sent.len() - 2..],
            &[ViewCommand::TrialExpired, ViewCommand::NavigateHome]
        );
    }

    #[tokio::test]
    async fn cancelled_expiry_is_retried_on_next_tick() {
        let h = Harness::new(FakeView::dirty(), UnsavedChoice::Cancel).with_usage(3590);
        let mut session = h.ready(Some(doc("/tmp/a.pdf"))).await;

        h.advance(12);
        session.handle(SessionMessage::Tick).await;
        assert_eq!(session.mode(), ViewMode::Document);

        *h.shell.choice.lock().unwrap() = UnsavedChoice::Discard;
        h.advance(5);
        session.handle(SessionMessage::Tick).await;
        assert_eq!(session.mode(), ViewMode::Home);
    }

    #[tokio::test]
    async fn backend_grant_keeps_the_document_open() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel).signed_in();
        h.remote.set_entitlement(trial(5));
        let mut session = h.ready(None).await;

        session
            .handle(SessionMessage::OpenRequested(doc("/tmp/a.pdf")))
            .await;
        assert_eq!(session.budget(), Some(5));

        h.remote.set_entitlement(trial(600));
        h.advance(6);
        session.handle(SessionMessage::Tick).await;

        assert_eq!(session.mode(), ViewMode::Document);
        assert_eq!(session.budget(), Some(600));
        assert!(!h.view.sent().contains(&ViewCommand::TrialExpired));
    }

    #[tokio::test]
    async fn usage_is_synced_periodically_and_on_stop() {
        let mut h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel).signed_in();
        h.config.usage_sync_every_ticks = 2;
        let mut session = h.ready(Some(doc("/tmp/a.pdf"))).await;

        for _ in 0..2 {
            h.advance(5);
            session.handle(SessionMessage::Tick).await;
        }
        settle().await;
        assert_eq!(
            h.remote.usage_syncs.lock().unwrap().clone(),
            vec![("u-42".to_string(), 10, today())]
        );

        h.advance(1);
        session.handle(SessionMessage::NavigateHome).await;
        settle().await;
        assert_eq!(
            h.remote.usage_syncs.lock().unwrap().last().cloned(),
            Some(("u-42".to_string(), 11, today()))
        );
    }

    #[tokio::test]
    async fn sign_in_and_out_update_identity_but_not_usage() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel).with_usage(100);
        h.remote.set_entitlement(Ok(EntitlementResponse {
            is_premium: true,
            trial_seconds_remaining: None,
        }));
        let mut session = h.ready(None).await;

        session.handle(SessionMessage::SignedIn(user())).await;
        settle().await;

        let status = session.status();
        assert!(status.signed_in);
        assert_eq!(status.entitlement, Entitlement::Unlimited);
        assert_eq!(h.remote.user_syncs.lock().unwrap().clone(), vec![user()]);

        session.handle(SessionMessage::SignedOut).await;

        let status = session.status();
        assert!(!status.signed_in);
        assert_eq!(status.daily_seconds_used, 100);
        assert_eq!(status.entitlement.remaining_seconds(), Some(3500));
        assert!(IdentityStore::new(h.store.clone()).load().is_none());
    }

    #[tokio::test]
    async fn status_and_shutdown_over_the_channel() {
        let h = Harness::new(FakeView::clean(), UnsavedChoice::Cancel);
        let mut session = h.ready(Some(doc("/tmp/a.pdf"))).await;

        let (tx, rx) = tokio::sync::oneshot::channel();
        assert_eq!(session.handle(SessionMessage::Status(tx)).await, Flow::Continue);
        let status = rx.await.unwrap();
        assert_eq!(status.mode, ViewMode::Document);
        assert_eq!(status.document, Some(doc("/tmp/a.pdf")));

        h.advance(3);
        assert_eq!(session.handle(SessionMessage::Shutdown).await, Flow::Stop);
        assert!(!session.is_metering());
        assert_eq!(session.ledger().snapshot().daily_seconds_used, 3);
    }
}

//! The memo pipeline: intake record in, password-protected PDF out.
//!
//! ```text
//! Idle ─▶ Generating ─▶ Uploading ─▶ RequestingProtection ─▶ Polling ─▶ Downloading ─▶ Done
//!   │          │            │                 │               │ ↺          │
//!   └──────────┴────────────┴─────────────────┴───────────────┴────────────┴──▶ Failed
//! ```
//!
//! Stages run strictly in order inside one task; only `Polling` repeats.
//! The first failure ends the run with that stage's error and nothing else
//! is called. Document and task handles live only inside a run and are
//! dropped at its end; remote resources expire on their own, so no cleanup
//! calls are made.
//!
//! A [`MemoPipeline`] holds no per-run state and is shared (`Arc`) across
//! concurrent requests. Beyond the immutable template bytes and client
//! configuration nothing is shared between runs.

use crate::client::{
    HttpTransport, PermissionSet, ServiceClient, StatusVocabulary, TaskReport, Transport,
};
use crate::config::ServiceConfig;
use crate::error::MemoError;
use crate::intake::IntakeRecord;
use crate::pipeline::poll::{PollPolicy, Poller, TokioWaiter, Waiter};
use crate::pipeline::template::TemplateLoader;
use crate::progress::{ObserverHandle, PipelineObserver};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Format requested from the generation surface.
pub const OUTPUT_FORMAT: &str = "pdf";

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Generating,
    Uploading,
    RequestingProtection,
    Polling,
    Downloading,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

/// The finished, protected memo.
#[derive(Clone, PartialEq, Eq)]
pub struct MemoDocument {
    /// Suggested download name, e.g. `Acme_Secure_Memo.pdf`.
    pub filename: String,
    /// Protected PDF bytes.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for MemoDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoDocument")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Sequences the remote calls that turn an intake into a protected memo.
pub struct MemoPipeline {
    client: ServiceClient,
    template: TemplateLoader,
    policy: PollPolicy,
    waiter: Arc<dyn Waiter>,
    permissions: PermissionSet,
    owner_password: Option<String>,
    observer: Option<ObserverHandle>,
}

impl fmt::Debug for MemoPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoPipeline")
            .field("template", &self.template.path())
            .field("policy", &self.policy)
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl MemoPipeline {
    /// A production pipeline: reqwest transport, tokio timer, template from
    /// `config.template_path`.
    pub fn new(config: &ServiceConfig) -> Result<Self, MemoError> {
        Self::builder(config).build()
    }

    pub fn builder(config: &ServiceConfig) -> MemoPipelineBuilder<'_> {
        MemoPipelineBuilder {
            config,
            transport: None,
            waiter: Arc::new(TokioWaiter),
            template: None,
            observer: None,
            permissions: PermissionSet::default(),
            vocabulary: StatusVocabulary::default(),
        }
    }

    /// Run every stage for `intake`.
    ///
    /// # Errors
    /// - [`MemoError::InvalidIntake`] before any network call
    /// - [`MemoError::TemplateUnavailable`] before any network call
    /// - the failing stage's error otherwise
    pub async fn run(&self, intake: &IntakeRecord) -> Result<MemoDocument, MemoError> {
        let started = Instant::now();
        let mut run = Run::new(self.observer.as_deref());

        match self.execute(intake, &mut run).await {
            Ok(document) => {
                run.advance(PipelineState::Done);
                info!(
                    "Memo '{}' ready: {} bytes in {}ms",
                    document.filename,
                    document.bytes.len(),
                    started.elapsed().as_millis()
                );
                if let Some(obs) = self.observer.as_deref() {
                    obs.on_complete(&document.filename, document.bytes.len());
                }
                Ok(document)
            }
            Err(e) => {
                run.fail(&e);
                Err(e)
            }
        }
    }

    /// Like [`run`](Self::run), but gives up with [`MemoError::Cancelled`]
    /// as soon as `cancel` fires. In-flight requests are dropped.
    pub async fn run_until(
        &self,
        intake: &IntakeRecord,
        cancel: &CancellationToken,
    ) -> Result<MemoDocument, MemoError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Memo generation cancelled by caller");
                self.notify_failure(&MemoError::Cancelled);
                Err(MemoError::Cancelled)
            }
            result = self.run(intake) => result,
        }
    }

    /// Like [`run`](Self::run), but fails with
    /// [`MemoError::DeadlineExceeded`] once `deadline` has elapsed.
    pub async fn run_with_deadline(
        &self,
        intake: &IntakeRecord,
        deadline: Duration,
    ) -> Result<MemoDocument, MemoError> {
        match tokio::time::timeout(deadline, self.run(intake)).await {
            Ok(result) => result,
            Err(_) => {
                let err = MemoError::DeadlineExceeded(deadline);
                warn!("{}", err);
                self.notify_failure(&err);
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        intake: &IntakeRecord,
        run: &mut Run<'_>,
    ) -> Result<MemoDocument, MemoError> {
        // ── Step 0: Validate intake and load template ───────────────────────
        let startup_name = intake.startup_name()?;
        let open_password = intake.open_password()?;
        let filename = intake.memo_filename()?;
        let template = self.template.load().await?;
        info!("Producing secure memo for '{}'", startup_name);

        // ── Step 1: Render template → PDF ───────────────────────────────────
        run.advance(PipelineState::Generating);
        let generated = self
            .client
            .generate(&template, OUTPUT_FORMAT, &intake.as_value())
            .await?;
        drop(template);

        // ── Step 2: Upload PDF ──────────────────────────────────────────────
        run.advance(PipelineState::Uploading);
        let document = self.client.upload(generated, &filename).await?;
        debug!("Uploaded as document {}", document);

        // ── Step 3: Request protection ──────────────────────────────────────
        run.advance(PipelineState::RequestingProtection);
        let owner_password = self.owner_password_for(open_password);
        let task = self
            .client
            .protect(&document, open_password, &owner_password, &self.permissions)
            .await?;
        debug!("Protection task {} submitted", task);

        // ── Step 4: Poll task to completion ─────────────────────────────────
        run.advance(PipelineState::Polling);
        let client = &self.client;
        let observer = self.observer.as_deref();
        let max_attempts = self.policy.max_attempts;
        let task_ref = &task;
        let mut poller = Poller::new(self.policy, Arc::clone(&self.waiter));
        let result = poller
            .run(task_ref, move |attempt| async move {
                let report: TaskReport = client.poll_status(task_ref).await?;
                if let Some(obs) = observer {
                    obs.on_poll(attempt, max_attempts, report.status);
                }
                Ok::<_, MemoError>(report)
            })
            .await?;

        // ── Step 5: Download protected PDF ──────────────────────────────────
        run.advance(PipelineState::Downloading);
        let bytes = self.client.download(&result).await?;

        Ok(MemoDocument { filename, bytes })
    }

    /// Configured owner password, or a fresh random one. Never equal to the
    /// open password.
    fn owner_password_for(&self, user_password: &str) -> String {
        match self.owner_password {
            Some(ref pwd) if pwd != user_password => pwd.clone(),
            Some(_) => {
                warn!("Configured owner password equals the open password; using a random one");
                random_password()
            }
            None => random_password(),
        }
    }

    fn notify_failure(&self, error: &MemoError) {
        if let Some(obs) = self.observer.as_deref() {
            obs.on_failure(error);
        }
    }
}

fn random_password() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Per-run state tracker; reports every transition to the observer.
struct Run<'a> {
    state: PipelineState,
    observer: Option<&'a dyn PipelineObserver>,
}

impl<'a> Run<'a> {
    fn new(observer: Option<&'a dyn PipelineObserver>) -> Self {
        Self {
            state: PipelineState::Idle,
            observer,
        }
    }

    fn advance(&mut self, to: PipelineState) {
        debug_assert!(!self.state.is_terminal(), "transition out of {:?}", self.state);
        debug!("Pipeline {:?} → {:?}", self.state, to);
        if let Some(obs) = self.observer {
            obs.on_transition(self.state, to);
        }
        self.state = to;
    }

    fn fail(&mut self, error: &MemoError) {
        warn!("Pipeline failed in {:?}: {}", self.state, error);
        self.advance(PipelineState::Failed);
        if let Some(obs) = self.observer {
            obs.on_failure(error);
        }
    }
}

/// Builder for [`MemoPipeline`]; every part has a production default.
pub struct MemoPipelineBuilder<'a> {
    config: &'a ServiceConfig,
    transport: Option<Arc<dyn Transport>>,
    waiter: Arc<dyn Waiter>,
    template: Option<TemplateLoader>,
    observer: Option<ObserverHandle>,
    permissions: PermissionSet,
    vocabulary: StatusVocabulary,
}

impl<'a> MemoPipelineBuilder<'a> {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn waiter(mut self, waiter: Arc<dyn Waiter>) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn template(mut self, template: TemplateLoader) -> Self {
        self.template = Some(template);
        self
    }

    pub fn observer(mut self, observer: ObserverHandle) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn vocabulary(mut self, vocabulary: StatusVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn build(self) -> Result<MemoPipeline, MemoError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(self.config.http_timeout).map_err(|e| {
                MemoError::Configuration(format!("cannot build HTTP client: {e}"))
            })?),
        };

        Ok(MemoPipeline {
            client: ServiceClient::new(self.config, transport).with_vocabulary(self.vocabulary),
            template: self
                .template
                .unwrap_or_else(|| TemplateLoader::new(&self.config.template_path)),
            policy: PollPolicy::from(self.config),
            waiter: self.waiter,
            permissions: self.permissions,
            owner_password: self.config.owner_password.clone(),
            observer: self.observer,
        })
    }
}

//! # securememo
//!
//! Turn a structured intake record into a password-protected PDF memo using a
//! remote document service.
//!
//! ## Why this crate?
//!
//! Producing a shareable, locked-down memo takes five remote calls across two
//! service surfaces, one of which is asynchronous and has to be polled. This
//! crate runs that sequence as an explicit state machine with bounded
//! polling, stage-tagged errors and a small HTTP front end, so callers only
//! ever see "here is your PDF" or "this stage failed, because…".
//!
//! ## Pipeline Overview
//!
//! ```text
//! IntakeRecord
//!  │
//!  ├─ 0. Template  load the DOCX template once, reuse for every run
//!  ├─ 1. Generate  template + intake values → PDF   (generation surface)
//!  ├─ 2. Upload    PDF → document id                (processing surface)
//!  ├─ 3. Protect   document id + passwords → task id
//!  ├─ 4. Poll      task id → result document id     (bounded, fixed interval)
//!  └─ 5. Download  result document id → protected PDF bytes
//! ```
//!
//! The open password is the intake's `startupName`; the download is named
//! `<startupName>_Secure_Memo.pdf`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use securememo::{IntakeRecord, MemoPipeline, ServiceConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials from FOXIT_DOCGEN_CLIENT_ID / FOXIT_PDF_CLIENT_ID / …
//!     let config = ServiceConfig::from_env()?;
//!     let pipeline = MemoPipeline::new(&config)?;
//!
//!     let intake = IntakeRecord::from_value(json!({
//!         "startupName": "Acme",
//!         "stage": "Seed",
//!     }))?;
//!     let memo = pipeline.run(&intake).await?;
//!     std::fs::write(&memo.filename, &memo.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `securememo` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library:
//! ```toml
//! securememo = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod intake;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod response;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use auth::{Identity, IdentityProvider, StaticTokens};
pub use client::{
    DocumentHandle, HttpTransport, Permission, PermissionSet, StatusVocabulary, TaskHandle,
    TaskStatus, Transport,
};
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::{MemoError, Stage};
pub use intake::IntakeRecord;
pub use orchestrator::{MemoDocument, MemoPipeline, MemoPipelineBuilder, PipelineState};
pub use pipeline::poll::{PollPolicy, TokioWaiter, Waiter};
pub use pipeline::template::TemplateLoader;
pub use progress::{NoopObserver, PipelineObserver};
pub use response::{ApiError, Redactor};
pub use server::{router, serve, AppState};

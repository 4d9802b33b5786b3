//! Client for the remote document service.
//!
//! ```text
//! ServiceClient ──▶ Transport ──▶ generation surface  (GenerateDocumentBase64)
//!                             └─▶ processing surface  (upload, protect, tasks, download)
//! ```
//!
//! * [`transport`] — the single seam where bytes hit the network; the
//!   reqwest-backed [`HttpTransport`] in production, scripted fakes in tests
//! * [`extract`]   — ordered extraction rules for provider-specific response
//!   shapes
//! * [`status`]    — task-status vocabulary and normalisation
//! * [`service`]   — the five remote operations built on the above
//!
//! None of these retry. Every failure surfaces to the orchestrator.

pub mod extract;
pub mod service;
pub mod status;
pub mod transport;

use std::fmt;

pub use service::{Permission, PermissionSet, ServiceClient};
pub use status::{StatusVocabulary, TaskReport, TaskStatus};
pub use transport::{
    HttpTransport, OutboundBody, OutboundRequest, RawResponse, Transport, TransportError,
};

/// Opaque identifier of a document stored on the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle(String);

/// Opaque identifier of one asynchronous processing task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle(String);

macro_rules! opaque_id {
    ($ty:ident) => {
        impl $ty {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(DocumentHandle);
opaque_id!(TaskHandle);

//! Local building blocks of a pipeline run.
//!
//! None of these perform network I/O; the remote calls live in
//! [`crate::client`].
//!
//! 1. [`template`] — read the DOCX template once and share the bytes
//! 2. [`encode`]   — base64 in both directions for the generation surface
//! 3. [`poll`]     — bounded fixed-interval polling of the protection task

pub mod encode;
pub mod poll;
pub mod template;

//! Text and image pipeline stages.
//!
//! Each submodule implements exactly one transformation step and is tested
//! on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm                     (async, network)
//! (path/URL) (base64)  (vision model)
//!                        │ raw text
//!                        ▼
//! normalize ──▶ metadata + sections            (sync, pure)
//! (cleanup)     (header lines, 8 titled bodies)
//! ```
//!
//! 1. [`input`]: classify the image reference once; download URLs
//! 2. [`encode`]: size check and base64 wrap for the request body
//! 3. [`llm`]: the model call with timeout and retry/backoff
//! 4. [`normalize`]: deterministic, idempotent Markdown cleanup
//! 5. [`metadata`]: name / date / image path from `label：value` lines
//! 6. [`sections`]: heading detection and the canonical section map

pub mod encode;
pub mod input;
pub mod llm;
pub mod metadata;
pub mod normalize;
pub mod sections;

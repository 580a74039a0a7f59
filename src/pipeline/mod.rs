//! Pipeline stages for PDF translation.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different recognition backend) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//!          ┌─▶ extract ─▶ tables                 (text, images, xlsx)
//! PDF ─────┤      │
//!          └─▶ render ─▶ recognize               (formulas, page order)
//!                 │
//!        extract ─┴─▶ chunk ─▶ translate         (translated text)
//!                      │
//!        original text ┴─▶ merge                 (formulas spliced in)
//! ```
//!
//! 1. [`extract`]   — page text + embedded images; the offset-exact text every
//!    later stage keys on
//! 2. [`render`]    — rasterise pages to `page_{n}.png`; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`tables`]    — thin column-aligned row detection, one xlsx artifact
//! 4. [`chunk`]     — fixed-width slices for the length-bounded backend
//! 5. [`translate`] — concurrent chunk translation with retry/backoff,
//!    output order preserved
//! 6. [`recognize`] — vision calls over page images, explicit page-order sort
//! 7. [`merge`]     — splice recognized formulas over equation-like spans in
//!    the original text

pub mod chunk;
pub mod extract;
pub mod merge;
pub mod recognize;
pub mod render;
pub mod tables;
pub mod translate;

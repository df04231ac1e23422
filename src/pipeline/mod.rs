//! Pipeline stages for document summarisation.
//!
//! Each submodule implements exactly one step, so each is testable alone and
//! the engines behind extraction and generation can be swapped without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ prompts ──▶ llm ──▶ render
//! (intake)  (pdf/ocr)   (builder)  (LLM)   (display)
//! ```
//!
//! 1. [`input`]   — load a path or URL, classify its media type once, validate size/type
//! 2. [`extract`] — dispatch to [`pdf`] (pdfium text layer) or [`ocr`] (tesseract);
//!    both run in `spawn_blocking`
//! 3. [`crate::prompts`] — word-budgeted instruction for the model
//! 4. [`llm`]     — live or stub summariser behind one trait; the only stage
//!    with network I/O
//! 5. [`render`]  — bullets and bold spans for display, plain text for copying

pub mod extract;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pdf;
pub mod render;

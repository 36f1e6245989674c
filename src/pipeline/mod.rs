//! Pipeline stages for attendance-sheet extraction.
//!
//! Each submodule implements exactly one transformation step. Control flow
//! is linear and runs once per image.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ request ──▶ infer ──▶ normalize ──▶ parse ──▶ export
//! (path/URL) (base64)   (VLM)     (fences)      (JSON)    (XLSX)
//! ```
//!
//! 1. [`input`]     — load the photograph and sniff JPEG/PNG
//! 2. [`request`]   — bind the base64 image to the extraction instruction
//! 3. [`infer`]     — the single VLM call; the only stage with network I/O
//! 4. [`normalize`] — strip code fences, trim the wrapper
//! 5. [`parse`]     — tagged parse into records or `MalformedExtraction`
//! 6. [`export`]    — union-of-keys table, workbook bytes, dated file name

pub mod export;
pub mod infer;
pub mod input;
pub mod normalize;
pub mod parse;
pub mod request;

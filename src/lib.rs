//! gedsort - document OCR, classification and automatic filing.
//!
//! Scanned French documents (PDF, DOCX, images) go through text
//! extraction, structured field scanning, category prediction with a
//! pre-trained model, and get filed into per-category folders with
//! confidence-annotated names.

pub mod analytics;
pub mod classify;
pub mod cli;
pub mod config;
pub mod fields;
pub mod filing;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod server;

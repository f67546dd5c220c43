//! Remote and local model abstraction.
//!
//! This module provides the model stages of the detection pipeline: a
//! provider-agnostic [`ModelClient`] trait with Groq (text) and Gemini
//! (vision) implementations, a FIFO response cache keyed on the exact
//! `(message, sender)` pair, and the inference contract for an optional
//! on-device model.

mod cache;
mod client;
mod local;
mod types;

pub use cache::{ResponseCache, ResponseKey, DEFAULT_CAPACITY};
pub use client::{ClientConfig, GeminiClient, GroqClient, ModelClient, VISION_TIMEOUT_SECS};
pub use local::{LocalModel, LocalPrediction};
pub use types::{strip_code_fences, ModelVerdict, SYSTEM_PROMPT};

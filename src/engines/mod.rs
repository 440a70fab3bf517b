//! Inference backends.
//!
//! This module contains concrete [`Synthesizer`](crate::Synthesizer) and
//! [`Vocoder`](crate::Vocoder) implementations.
//!
//! # Available Backends
//!
//! Enable backends via Cargo features:
//! - `onnx` - FastSpeech2 + HiFi-GAN exported to ONNX, run with ONNX Runtime

#[cfg(feature = "onnx")]
pub mod onnx;

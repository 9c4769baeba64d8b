//! Inference domain - The external model call behind each grading attempt

mod client;
mod request;

pub use client::InferenceClient;
pub use request::{ImageInput, InferenceRequest};

#[cfg(test)]
pub use client::mock::MockInferenceClient;

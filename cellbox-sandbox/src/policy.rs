//! Runtime and resource policy
//!
//! Requests only ever name logical runtimes and allow-listed resource values;
//! this module maps them to a concrete image and an envelope that stays under
//! the operator's ceiling.

use crate::limits::{CpuShare, MemoryTier, ResourceEnvelope};
use crate::runner::RunnerKind;
use serde::{Deserialize, Serialize};

/// Logical runtimes a request may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// Stock slim interpreter, no plotting stack
    Python,
    /// Sandbox image with the scientific/plotting stack
    Base,
    /// Sandbox image with the machine-learning stack
    Ml,
}

impl RuntimeKind {
    /// Parse a logical name, case-insensitive and trimmed
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "python" => Some(RuntimeKind::Python),
            "base" => Some(RuntimeKind::Base),
            "ml" => Some(RuntimeKind::Ml),
            _ => None,
        }
    }

    pub fn image(self) -> &'static str {
        match self {
            RuntimeKind::Python => "python:3.11-slim",
            RuntimeKind::Base => "py-sandbox:base",
            RuntimeKind::Ml => "py-sandbox:ml",
        }
    }

    /// Images built for `base`/`ml` ship matplotlib, so figures can be captured
    pub fn runner(self) -> RunnerKind {
        match self {
            RuntimeKind::Python => RunnerKind::Plain,
            RuntimeKind::Base | RuntimeKind::Ml => RunnerKind::CaptureFigures,
        }
    }
}

/// Concrete image and runner chosen for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSelection {
    /// `None` when the request fell back to the operator's default image
    pub kind: Option<RuntimeKind>,
    pub image: String,
    pub runner: RunnerKind,
}

/// Operator policy for runtime and resource resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxPolicy {
    /// Image used when the request names no known runtime
    pub default_image: String,

    /// Envelope applied when the request asks for nothing valid
    pub default_envelope: ResourceEnvelope,

    /// Never exceeded, whatever the request or default says
    pub ceiling: ResourceEnvelope,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            default_image: RuntimeKind::Python.image().to_string(),
            default_envelope: ResourceEnvelope::default(),
            ceiling: ResourceEnvelope::ceiling(),
        }
    }
}

impl SandboxPolicy {
    /// Map a logical runtime name to an image; unknown or empty names get the default image
    pub fn resolve_runtime(&self, name: &str) -> RuntimeSelection {
        match RuntimeKind::parse(name) {
            Some(kind) => RuntimeSelection {
                kind: Some(kind),
                image: kind.image().to_string(),
                runner: kind.runner(),
            },
            None => {
                if !name.trim().is_empty() {
                    tracing::debug!(runtime = name, "Unknown runtime, using default image");
                }
                RuntimeSelection {
                    kind: None,
                    image: self.default_image.clone(),
                    runner: RunnerKind::Plain,
                }
            }
        }
    }

    /// Validate requested memory/CPU against the allow-lists, default what is
    /// invalid, then clamp to the ceiling
    pub fn resolve_resources(&self, mem: &str, cpu: &str) -> ResourceEnvelope {
        let requested = ResourceEnvelope {
            memory: MemoryTier::parse(mem).unwrap_or(self.default_envelope.memory),
            cpu: CpuShare::parse(cpu).unwrap_or(self.default_envelope.cpu),
        };
        requested.capped_to(self.ceiling)
    }
}

//! Wire types for sandbox execution

use serde::{Deserialize, Serialize};

/// Request to execute a cell
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source text, written verbatim as the entry module
    pub code: String,

    /// Auxiliary files placed in the workspace before the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileUpload>,

    /// Logical runtime name ("python", "base", "ml"); anything else uses the fallback image
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub runtime: String,

    /// Requested memory tier ("256m", "512m", "1g", "2g")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mem: String,

    /// Requested CPU share ("0.25", "0.5", "1.0", "2.0")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpu: String,
}

impl ExecutionRequest {
    /// Create a request with default runtime and resources
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    /// Attach an uploaded file
    pub fn with_file(mut self, file: FileUpload) -> Self {
        self.files.push(file);
        self
    }

    /// Select a logical runtime
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Request a resource envelope
    pub fn with_resources(mut self, mem: impl Into<String>, cpu: impl Into<String>) -> Self {
        self.mem = mem.into();
        self.cpu = cpu.into();
        self
    }
}

/// A file shipped alongside the code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    /// Path relative to the workspace root
    pub name: String,

    /// Data URI: `<media-type prefix>,<base64 body>`
    pub data: String,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Result envelope returned to the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Narrative text: outcome framing, duration and raw output
    pub output: String,

    /// Set only when the request was rejected before or during provisioning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Captured figures as `data:image/png;base64,...` payloads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ExecutionResult {
    /// Envelope for a request-level rejection
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: Some(error.into()),
            images: Vec::new(),
        }
    }
}

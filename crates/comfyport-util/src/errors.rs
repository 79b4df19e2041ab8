use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for every step of a portable package build.
#[derive(Debug, Error, Diagnostic)]
pub enum PortableError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required input (version file, manifest, requirements, credential) is absent.
    #[error("Missing configuration: {what}")]
    #[diagnostic(help("Create the file or set the variable, then re-run the build"))]
    ConfigMissing { what: String },

    /// An input exists but its content is malformed.
    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    /// An external command (git, conda, pip, installer) exited unsuccessfully.
    #[error("`{tool}` failed ({status})")]
    #[diagnostic(help("{output}"))]
    ExternalTool {
        tool: String,
        status: String,
        output: String,
    },

    /// The operating system or a remote API refused the operation.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// Network request or download failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// No installer or launcher exists for the requested OS/architecture.
    #[error("Unsupported build target: {target}")]
    #[diagnostic(help("Supported targets: macos-arm64, macos-x86_64, linux-x86_64, linux-arm64, windows-x86_64"))]
    UnsupportedTarget { target: String },

    /// A polled CI run finished in a non-success state.
    #[error("Workflow run {run_id} finished with conclusion '{conclusion}'")]
    WorkflowFailed { run_id: u64, conclusion: String },

    /// A bounded wait elapsed before the awaited state was reached.
    #[error("Timed out: {message}")]
    Timeout { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type PortableResult<T> = miette::Result<T>;

use thiserror::Error;

/// C6 orchestrator errors (distilled spec §7). Per-grid-index failures
/// (`ResolveFailure`, `CompositingError`) are logged and tracked as run
/// statistics rather than surfaced here; this enum covers run-terminating
/// conditions only.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("consecutive resolve failures exceeded threshold ({threshold}) at grid index {grid_index}")]
    CatastrophicUpstream { threshold: u32, grid_index: u32 },

    #[error("manifest error: {0}")]
    Manifest(#[from] heliosphere_manifest::ManifestError),

    #[error("grid planning error: {0}")]
    Grid(#[from] heliosphere_core::GridError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("client construction error: {0}")]
    Client(#[from] heliosphere_fetch::FetchError),

    #[error("required environment variable missing: {0}")]
    MissingEnvVar(#[from] shared_utils::env::MissingEnvVarError),

    #[error("invalid URL in environment: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Process exit codes (distilled spec §6): 0 success, 1 cancelled with
/// checkpoint saved, 2 catastrophic upstream failure, 3 unrecoverable local
/// error. The orchestrator's callers map `RunOutcome`/`PipelineError` to
/// these; the mapping itself lives at the binary boundary this workspace
/// does not own (distilled spec §1 non-goal: CLI entry points).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Cancelled = 1,
    CatastrophicUpstream = 2,
    UnrecoverableLocal = 3,
}

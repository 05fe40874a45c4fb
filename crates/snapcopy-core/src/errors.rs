use snapcopy_core_types::RunId;
use thiserror::Error;

/// Result type alias using ReplicationError
pub type Result<T> = std::result::Result<T, ReplicationError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable in logs, tests and by the
/// orchestrating pipeline that consumes the CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Configuration
    InvalidConfig,

    // Lookup-empty outcomes
    NotFound,
    AmbiguousSelection,

    // Copy state machine
    CopyFailed,
    Timeout,
    AlreadyExists,

    // Integration/IO
    ExternalService,
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AmbiguousSelection => "ERR_AMBIGUOUS_SELECTION",
            ExErrorKind::CopyFailed => "ERR_COPY_FAILED",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Classification fields for programmatic handling plus context for the
/// human reading the pipeline log.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    run_id: Option<RunId>,
    message: String,
    candidates: Option<Vec<String>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            run_id: None,
            message: String::new(),
            candidates: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (instance or snapshot identifier)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add run ID context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add candidate entity ids (used for AmbiguousSelection)
    pub fn with_candidates(mut self, ids: Vec<String>) -> Self {
        self.candidates = Some(ids);
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn candidates(&self) -> Option<&[String]> {
        self.candidates.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(run_id) = &self.run_id {
            write!(f, " (run_id: {})", run_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for a replication run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplicationError {
    // ===== Configuration Errors =====
    /// A required configuration value was not supplied
    #[error("Missing required configuration value: {name}")]
    MissingConfig { name: String },

    /// A configuration value was supplied but is unusable
    #[error("Invalid configuration value for {name}: {reason}")]
    InvalidConfig { name: String, reason: String },

    // ===== Lookup-empty Outcomes =====
    /// No instance matched the engine and tag query
    #[error(
        "No database instances were found with engine={engine}, \
         Environment={environment}, Name={name}"
    )]
    InstanceNotFound {
        engine: String,
        environment: String,
        name: String,
    },

    /// More than one instance matched the tag query
    #[error(
        "Multiple database instances match engine={engine}, \
         Environment={environment}, Name={name}: {candidates:?}"
    )]
    AmbiguousInstance {
        engine: String,
        environment: String,
        name: String,
        candidates: Vec<String>,
    },

    /// The instance has no available manual snapshot
    #[error("There are no available manual snapshots for database instance '{instance_id}'")]
    NoManualSnapshots { instance_id: String },

    // ===== Remote Service Errors =====
    /// Any failure reported by the credential or snapshot service
    #[error("Snapshot service call '{op}' failed: {message}")]
    Service { op: String, message: String },

    // ===== Copy State Machine =====
    /// The destination snapshot reached a terminal failure status
    #[error("Copy of snapshot '{snapshot_id}' failed with status '{status}'")]
    CopyFailed { snapshot_id: String, status: String },

    /// The destination snapshot did not settle within the poll budget
    #[error(
        "Timed out waiting for snapshot '{snapshot_id}' after {attempts} attempts \
         (last status: {last_status})"
    )]
    PollTimeout {
        snapshot_id: String,
        attempts: u32,
        last_status: String,
    },

    /// A stale snapshot already holds the target identifier and pruning is disabled
    #[error(
        "Destination snapshot '{snapshot_id}' is stale but already exists; \
         re-run with pruning enabled to replace it"
    )]
    TargetOccupied { snapshot_id: String },

    // ===== IO =====
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

impl ReplicationError {
    /// Convenience constructor for remote failures
    pub fn service(op: impl Into<String>, message: impl Into<String>) -> Self {
        ReplicationError::Service {
            op: op.into(),
            message: message.into(),
        }
    }

    /// True for expected, reportable outcomes that are not transport failures
    pub fn is_lookup_empty(&self) -> bool {
        matches!(
            self,
            ReplicationError::InstanceNotFound { .. }
                | ReplicationError::AmbiguousInstance { .. }
                | ReplicationError::NoManualSnapshots { .. }
        )
    }
}

impl From<ReplicationError> for ExError {
    fn from(err: ReplicationError) -> Self {
        let message = err.to_string();
        match err {
            ReplicationError::MissingConfig { name }
            | ReplicationError::InvalidConfig { name, .. } => {
                ExError::new(ExErrorKind::InvalidConfig)
                    .with_entity_id(name)
                    .with_op("load_config")
                    .with_message(message)
            }

            ReplicationError::InstanceNotFound { .. } => ExError::new(ExErrorKind::NotFound)
                .with_op("find_instance")
                .with_message(message),

            ReplicationError::AmbiguousInstance { candidates, .. } => {
                ExError::new(ExErrorKind::AmbiguousSelection)
                    .with_op("find_instance")
                    .with_candidates(candidates)
                    .with_message(message)
            }

            ReplicationError::NoManualSnapshots { instance_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(instance_id)
                    .with_op("select_latest_manual_snapshot")
                    .with_message(message)
            }

            ReplicationError::Service { op, .. } => ExError::new(ExErrorKind::ExternalService)
                .with_op(op)
                .with_message(message),

            ReplicationError::CopyFailed { snapshot_id, .. } => {
                ExError::new(ExErrorKind::CopyFailed)
                    .with_entity_id(snapshot_id)
                    .with_op("wait_for_snapshot")
                    .with_message(message)
            }

            ReplicationError::PollTimeout { snapshot_id, .. } => ExError::new(ExErrorKind::Timeout)
                .with_entity_id(snapshot_id)
                .with_op("wait_for_snapshot")
                .with_message(message),

            ReplicationError::TargetOccupied { snapshot_id } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity_id(snapshot_id)
                    .with_op("replicate")
                    .with_message(message)
            }

            ReplicationError::Io { path, .. } => ExError::new(ExErrorKind::Io)
                .with_entity_id(path)
                .with_message(message),
        }
    }
}

impl From<&ReplicationError> for ExError {
    fn from(err: &ReplicationError) -> Self {
        ExError::from(err.clone())
    }
}

use std::fmt;

/// Machine-readable error codes for script-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    MissingSmallGroups,
    NoCourses,
    BackendUnavailable,
    BackendRejected,
    BackendDecodeFailed,
    BatchWriteFailed,
    SnapshotReadFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::MissingSmallGroups => "E2001",
            Self::NoCourses => "E2002",
            Self::BackendUnavailable => "E4001",
            Self::BackendRejected => "E4002",
            Self::BackendDecodeFailed => "E4003",
            Self::BatchWriteFailed => "E5001",
            Self::SnapshotReadFailed => "E5002",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .pblgen.toml and retry."),
            Self::MissingSmallGroups => {
                Some("Generate kelompok kecil for the listed semesters before assigning lecturers.")
            }
            Self::NoCourses => Some("Check the active tahun ajaran and the course periode labels."),
            Self::BackendUnavailable => Some("Check --api-url / PBLGEN_API_URL and network access."),
            Self::BackendRejected => Some("Check the token and the message returned by the backend."),
            Self::BackendDecodeFailed => Some("The backend may be a different version; report a bug with logs."),
            Self::BatchWriteFailed => Some("Nothing was retried. Fix the reported problem and run generate again."),
            Self::SnapshotReadFailed => Some("Re-create the snapshot with `pblgen snapshot --out <file>`."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure talking to the academic backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Non-2xx response carrying a structured `message` from the backend.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Non-2xx response without a usable message body.
    #[error("request to {path} failed with HTTP {status}")]
    Status { path: String, status: u16 },

    /// Connection, DNS, TLS, or timeout failure.
    #[error("request to {path} failed: {reason}")]
    Transport { path: String, reason: String },

    /// 2xx response whose body did not match the expected shape.
    #[error("failed to decode response from {path}: {reason}")]
    Decode { path: String, reason: String },
}

impl BackendError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected { .. } | Self::Status { .. } => ErrorCode::BackendRejected,
            Self::Transport { .. } => ErrorCode::BackendUnavailable,
            Self::Decode { .. } => ErrorCode::BackendDecodeFailed,
        }
    }

    /// The backend's own validation message, when it sent one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Errors that abort a generate run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// Hard precondition: every semester involved needs small-group data.
    #[error("no kelompok kecil data for semester {}", join_semesters(.semesters))]
    MissingSmallGroups { semesters: Vec<u32> },

    #[error("no PBL courses found for the active term")]
    NoCourses,

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The single batch write failed; `message` is what the operator sees.
    #[error("{message}")]
    WriteFailed { message: String },
}

impl GenerateError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingSmallGroups { .. } => ErrorCode::MissingSmallGroups,
            Self::NoCourses => ErrorCode::NoCourses,
            Self::Backend(err) => err.code(),
            Self::WriteFailed { .. } => ErrorCode::BatchWriteFailed,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

fn join_semesters(semesters: &[u32]) -> String {
    semesters
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InputNotFound,
    InputParseError,
    SourceUnavailable,
    NodeNotFound,
    CycleSearchTruncated,
    MalformedRelationship,
    AncestorMissing,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InputNotFound => "E1002",
            Self::InputParseError => "E1003",
            Self::SourceUnavailable => "E2001",
            Self::NodeNotFound => "E2002",
            Self::CycleSearchTruncated => "E3001",
            Self::MalformedRelationship => "E3002",
            Self::AncestorMissing => "E3003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InputNotFound => "Input export not found",
            Self::InputParseError => "Input export parse error",
            Self::SourceUnavailable => "Graph store unavailable",
            Self::NodeNotFound => "Selected node not found",
            Self::CycleSearchTruncated => "Cycle search bound reached",
            Self::MalformedRelationship => "Relationship references unknown node",
            Self::AncestorMissing => "No ancestor at the abstraction depth",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .archlens/config.toml and retry."),
            Self::InputNotFound => Some("Pass an existing export file with --input."),
            Self::InputParseError => {
                Some("Export path records as JSON with source, relationships, and target.")
            }
            Self::SourceUnavailable => Some("Check the graph store connection and retry."),
            Self::NodeNotFound => Some("Select a node id present in the exported records."),
            Self::CycleSearchTruncated => {
                Some("Raise [cycles] max_depth or max_cycles to search further.")
            }
            Self::MalformedRelationship => None,
            Self::AncestorMissing => {
                Some("Export the parent chain so deep nodes can be collapsed onto it.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }

    /// Whether the condition aborts an invocation or is reported alongside results.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        !matches!(
            self,
            Self::CycleSearchTruncated | Self::MalformedRelationship | Self::AncestorMissing
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrandError {
    // Build errors
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    #[error("Invalid edge {from} -> {to}: {reason}")]
    InvalidEdge {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Graph has no start node (every node has an incoming edge)")]
    NoStartNode,

    #[error("Graph has more than one start node: {}", .0.join(", "))]
    AmbiguousStartNode(Vec<String>),

    #[error("Invalid graph options: {0}")]
    InvalidOptions(String),

    // Run errors
    #[error("Step failed at node {node}: {source}")]
    StepError {
        node: String,
        #[source]
        source: Box<StrandError>,
    },

    #[error("Run cancelled at node {node}")]
    Cancelled { node: String },

    #[error("Run exceeded max iterations ({0})")]
    MaxIterationsExceeded(usize),

    // Step implementation errors
    #[error("{0}")]
    StepFailed(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StrandError {
    /// Wrap a step's failure with the node it came from.
    pub fn step(node: impl Into<String>, cause: StrandError) -> Self {
        StrandError::StepError {
            node: node.into(),
            source: Box::new(cause),
        }
    }

    /// Whether this error was raised while building a graph.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            StrandError::DuplicateNode(_)
                | StrandError::InvalidEdge { .. }
                | StrandError::NoStartNode
                | StrandError::AmbiguousStartNode(_)
                | StrandError::InvalidOptions(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StrandError>;

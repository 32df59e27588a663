// Error taxonomy for the optimizer pipeline.
//
// One variant per error kind named in the specification; `wire_code`
// implements the HTTP-style mapping callers rely on at the request
// boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("malformed constraints: {0}")]
    MalformedConstraints(String),

    #[error("invalid stats for hitter `{name}`: {reason}")]
    InvalidStats { name: String, reason: String },

    #[error("rate overflow for hitter `{name}`: derived rates sum to {sum} (> 1 + 1e-6)")]
    RateOverflow { name: String, sum: f64 },

    #[error("no lineup satisfies the handedness constraints")]
    InfeasibleConstraints,

    #[error("handedness predicate rejected every candidate lineup")]
    NoFeasibleLineup,

    #[error("request cancelled")]
    Cancelled,

    #[error("request exceeded its deadline")]
    Deadline,

    #[error("numeric instability could not be recovered: {0}")]
    NumericInstability(String),
}

impl OptimizerError {
    /// HTTP-style wire code, per spec.md §6.
    pub fn wire_code(&self) -> u16 {
        match self {
            OptimizerError::MalformedRequest(_)
            | OptimizerError::MalformedConstraints(_)
            | OptimizerError::InvalidStats { .. }
            | OptimizerError::RateOverflow { .. } => 400,
            OptimizerError::InfeasibleConstraints | OptimizerError::NoFeasibleLineup => 422,
            OptimizerError::Cancelled | OptimizerError::Deadline => 499,
            OptimizerError::NumericInstability(_) => 500,
        }
    }

    /// Short machine-readable kind string, used in the CLI's JSON error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizerError::MalformedRequest(_) => "MalformedRequest",
            OptimizerError::MalformedConstraints(_) => "MalformedConstraints",
            OptimizerError::InvalidStats { .. } => "InvalidStats",
            OptimizerError::RateOverflow { .. } => "RateOverflow",
            OptimizerError::InfeasibleConstraints => "InfeasibleConstraints",
            OptimizerError::NoFeasibleLineup => "NoFeasibleLineup",
            OptimizerError::Cancelled => "Cancelled",
            OptimizerError::Deadline => "Deadline",
            OptimizerError::NumericInstability(_) => "NumericInstability",
        }
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

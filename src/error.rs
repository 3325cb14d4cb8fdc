//! Errors reported by the analysis pipeline.
//!
//! Only configuration problems are errors. "No deadlock", "search exhausted" and
//! "empty reachable set" are ordinary results and are returned as values.

use thiserror::Error;

use crate::net::Orientation;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("input matrix is {pre_rows}x{pre_cols} but output matrix is {post_rows}x{post_cols}")]
    ShapeMismatch {
        pre_rows: usize,
        pre_cols: usize,
        post_rows: usize,
        post_cols: usize,
    },

    #[error("input matrix is {pre:?} but output matrix is {post:?}")]
    OrientationMismatch { pre: Orientation, post: Orientation },

    #[error("{orientation:?} matrix of shape {rows}x{cols} does not fit {places} places and {transitions} transitions")]
    DimensionMismatch {
        orientation: Orientation,
        rows: usize,
        cols: usize,
        places: usize,
        transitions: usize,
    },

    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedMatrix { row: usize, found: usize, expected: usize },

    #[error("arc between place `{place}` and transition `{transition}` has weight {weight}, only 0 or 1 is allowed in a 1-safe net")]
    ArcWeight {
        place: String,
        transition: String,
        weight: i64,
    },

    #[error("marking has {found} entries but the net has {expected} places")]
    MarkingLength { found: usize, expected: usize },

    #[error("place `{place}` holds {tokens} tokens, a 1-safe marking allows at most one")]
    NotSafe { place: String, tokens: i64 },

    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },

    #[error("unknown place `{0}`")]
    UnknownPlace(String),

    #[error("diagram variable {0} is not mapped to any place")]
    UnmappedVariable(u32),

    #[error("invalid variable order: {0}")]
    InvalidOrder(String),

    #[error("weight vector has {found} entries but the net has {expected} places")]
    WeightLength { found: usize, expected: usize },

    #[error("weighted token sum does not fit in i64")]
    WeightOverflow,

    #[error("diagram place {position} is `{found}` but the net has `{expected}` there")]
    PlaceMismatch {
        position: usize,
        found: String,
        expected: String,
    },

    #[error("failed to render diagram")]
    Render(#[from] std::fmt::Error),

    #[error("reachability fixpoint not reached within {0} iterations")]
    IterationLimit(usize),
}

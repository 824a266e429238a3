//! Relational side of the projection: column schemas and A1 range expressions.
pub(crate) mod column;
pub(crate) mod range;

// Vehicle records and valuation results
pub mod vehicle;

// Feature schema, encoding tables and the trained artifact
pub mod ml;

// Domain-specific error types
pub mod errors;

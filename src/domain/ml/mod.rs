pub mod artifact;
pub mod encoding;
pub mod feature_schema;

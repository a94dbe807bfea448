pub mod artifact_store;
pub mod tabular_loader;

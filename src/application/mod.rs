// Training, inference and depreciation projection
pub mod ml;

pub mod feature_engineering;
pub mod predictor;
pub mod projection;
pub mod trainer;

pub mod app;
pub mod appointments;
pub mod directory;
pub mod errors;
pub mod grouping;
pub mod handlers;
pub mod models;
pub mod predictor;
pub mod scoring;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use app::router;
pub use directory::ClientDirectory;
pub use predictor::{PredictionInput, predict_for_client, predict_session};
pub use state::AppState;
pub use storage::{load_data, resolve_data_path};

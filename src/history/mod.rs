//! Prediction history.
//!
//! Every prediction that names an emotion is kept in a local SQLite database
//! so it can be reviewed later with `emovox history`.

pub mod storage;

pub use storage::{data_dir, PredictionEntry, PredictionHistory};

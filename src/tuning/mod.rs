//! Hyperparameter search, refitting and held-out evaluation.

pub mod evaluate;
pub mod grid;
pub mod tuner;

pub use evaluate::{evaluate_model, substitute_missing, train_model, Evaluation, TrainedModel};
pub use grid::{ParameterGrid, Trial};
pub use tuner::{select_best, TrialResult, Tuner, TuningOutcome};

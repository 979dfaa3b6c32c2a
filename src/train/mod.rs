pub mod controller;
pub mod epoch_state;
pub mod hooks;
pub mod stage;
pub mod summary;
pub mod train_config;

pub use controller::{Phase, StageController};
pub use epoch_state::EpochState;
pub use hooks::StageHooks;
pub use stage::Stage;
pub use summary::{EpochSummary, FitReport, StageSummary};
pub use train_config::FitConfig;

//! Edit session: state machine plus the orchestration around it.
pub mod presets;
pub mod state;
pub mod workspace;

pub use state::{ProcessingStatus, SessionState};
pub use workspace::{accept_image_file, run_generate, GenerateOutcome};

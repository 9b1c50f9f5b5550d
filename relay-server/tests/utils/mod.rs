pub mod helpers;

pub use helpers::*;
pub use mock_engine::{EngineState, MockMediaEngine};

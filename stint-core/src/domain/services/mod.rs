mod observers;
mod settings;
mod ticker;
mod timer_engine;

pub use settings::EngineSettings;
pub use timer_engine::TimerEngine;

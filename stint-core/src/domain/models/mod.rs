mod ids;
mod record;
mod timer;

pub use ids::*;
pub use record::*;
pub use timer::*;

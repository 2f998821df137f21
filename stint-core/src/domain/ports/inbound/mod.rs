mod timer;

pub use timer::*;

mod memory_sink;
mod stdout_sink;

pub use memory_sink::*;
pub use stdout_sink::*;

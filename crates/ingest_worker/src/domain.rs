mod event_filter;
mod object_processor;
mod pipeline;
mod pipeline_context;
mod queue_poller;
mod work_item;
mod work_queue;

pub use event_filter::*;
pub use object_processor::*;
pub use pipeline::*;
pub use pipeline_context::*;
pub use queue_poller::*;
pub use work_item::*;
pub use work_queue::*;

mod credentials;
mod envelope;
mod locator;
mod metric;
mod object_store;
mod queue;
mod result;

pub use credentials::*;
pub use envelope::*;
pub use locator::*;
pub use metric::*;
pub use object_store::*;
pub use queue::*;
pub use result::*;

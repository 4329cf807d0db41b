pub mod codec;
pub mod domain;
pub mod parser;
pub mod sink;

mod json_metric_parser;

pub use json_metric_parser::*;

//! Garde validation for pipeline and service settings.

use crate::domain::{IngestError, IngestResult};
use garde::{Report, Validate};

/// Validate settings built in code; violations name the struct field
pub fn validate_config<T>(value: &T) -> IngestResult<()>
where
    T: Validate,
    T::Context: Default,
{
    value
        .validate()
        .map_err(|report| configuration_error(&report, |path| path.to_string()))
}

/// Validate settings loaded from the environment.
///
/// Each violation is reported under the variable that sets the field, so
/// `batch_size` under prefix `INGEST` reads `INGEST_BATCH_SIZE`.
pub fn validate_options<T>(value: &T, env_prefix: &str) -> IngestResult<()>
where
    T: Validate,
    T::Context: Default,
{
    value
        .validate()
        .map_err(|report| configuration_error(&report, |path| option_name(env_prefix, path)))
}

fn option_name(env_prefix: &str, path: &str) -> String {
    format!("{}_{}", env_prefix, path.replace('.', "_").to_ascii_uppercase())
}

fn configuration_error(report: &Report, name: impl Fn(&str) -> String) -> IngestError {
    let violations = report
        .iter()
        .map(|(path, error)| {
            let path = path.to_string();
            if path.is_empty() {
                error.message().to_string()
            } else {
                format!("{}: {}", name(&path), error.message())
            }
        })
        .collect::<Vec<_>>();

    IngestError::Configuration(format!("invalid settings: {}", violations.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use garde::Validate;

    #[derive(Validate)]
    struct ReceiveOptions {
        #[garde(length(min = 1))]
        queue_name: String,
        #[garde(range(min = 1, max = 10))]
        batch_size: usize,
    }

    fn options(queue_name: &str, batch_size: usize) -> ReceiveOptions {
        ReceiveOptions {
            queue_name: queue_name.to_string(),
            batch_size,
        }
    }

    #[test]
    fn test_valid_options_pass() {
        assert!(validate_config(&options("ingest", 10)).is_ok());
        assert!(validate_options(&options("ingest", 1), "INGEST").is_ok());
    }

    #[test]
    fn test_every_violation_names_its_field() {
        match validate_config(&options("", 0)) {
            Err(IngestError::Configuration(msg)) => {
                assert!(msg.starts_with("invalid settings: "));
                assert!(msg.contains("queue_name: "));
                assert!(msg.contains("batch_size: "));
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_environment_violations_name_the_variable() {
        match validate_options(&options("ingest", 11), "INGEST") {
            Err(IngestError::Configuration(msg)) => {
                assert!(msg.contains("INGEST_BATCH_SIZE: "), "got {}", msg);
                assert!(!msg.contains("INGEST_QUEUE_NAME"));
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_paths_join_with_underscores() {
        assert_eq!(option_name("INGEST", "queue.tags"), "INGEST_QUEUE_TAGS");
    }
}

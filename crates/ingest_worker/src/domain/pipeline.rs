use crate::domain::{
    work_queue, EventFilter, ObjectProcessor, PipelineContext, PollSettings, QueuePoller,
};
use common::domain::{
    ConnectionSettings, ContentDecoder, CredentialSource, IngestError, IngestResult, MetricParser,
    MetricSink, QueueAttributes, ServiceConnector,
};
use common::garde::validate_config;
use garde::Validate;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Longest long-poll wait the queue service accepts
const MAX_RECEIVE_WAIT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Created => write!(f, "created"),
            PipelineState::Running => write!(f, "running"),
            PipelineState::Stopping => write!(f, "stopping"),
            PipelineState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Settings for one pipeline instance
#[derive(Debug, Clone, Validate)]
pub struct IngestPipelineConfig {
    #[garde(length(min = 1))]
    pub queue_name: String,
    #[garde(skip)]
    pub queue_attributes: QueueAttributes,
    /// Accepted event-type prefixes
    #[garde(length(min = 1))]
    pub event_types: Vec<String>,
    #[garde(skip)]
    pub container_name: Option<String>,
    #[garde(skip)]
    pub key_prefix: Option<String>,
    #[garde(skip)]
    pub key_suffix: Option<String>,
    #[garde(skip)]
    pub content_encoding: String,
    /// Capacity of the work queue
    #[garde(range(min = 1))]
    pub prefetch_count: usize,
    /// Messages requested per receive call
    #[garde(range(min = 1, max = 10))]
    pub batch_size: usize,
    #[garde(range(min = 1))]
    pub worker_count: usize,
    #[garde(custom(within_receive_wait_limit))]
    pub receive_wait: Duration,
    #[garde(skip)]
    pub fetch_timeout: Duration,
    #[garde(skip)]
    pub poll_error_delay: Duration,
    #[garde(skip)]
    pub shutdown_timeout: Duration,
    #[garde(skip)]
    pub connection: ConnectionSettings,
}

fn within_receive_wait_limit(value: &Duration, _ctx: &()) -> garde::Result {
    if *value > MAX_RECEIVE_WAIT {
        return Err(garde::Error::new(format!(
            "must be at most {} seconds",
            MAX_RECEIVE_WAIT.as_secs()
        )));
    }
    Ok(())
}

impl Default for IngestPipelineConfig {
    fn default() -> Self {
        Self {
            queue_name: String::new(),
            queue_attributes: QueueAttributes::default(),
            event_types: vec!["ObjectCreated:".to_string()],
            container_name: None,
            key_prefix: None,
            key_suffix: None,
            content_encoding: "identity".to_string(),
            prefetch_count: 10,
            batch_size: 10,
            worker_count: 4,
            receive_wait: Duration::from_secs(20),
            fetch_timeout: Duration::from_secs(30),
            poll_error_delay: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(30),
            connection: ConnectionSettings {
                region: "us-east-1".to_string(),
                credentials: CredentialSource::DefaultChain,
                endpoint_url: None,
            },
        }
    }
}

/// External collaborators the pipeline is wired with
pub struct PipelineDependencies {
    pub connector: Arc<dyn ServiceConnector>,
    pub decoder: Arc<dyn ContentDecoder>,
    pub parser: Arc<dyn MetricParser>,
    pub sink: Arc<dyn MetricSink>,
}

/// How the launched tasks ended during `stop`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub completed: usize,
    pub failed: usize,
    pub panicked: usize,
    /// Tasks still running at the shutdown deadline
    pub aborted: usize,
}

/// Owns the poller, the worker pool and the cancellation signal.
///
/// It is the only component that moves the pipeline between states.
pub struct IngestPipeline {
    config: IngestPipelineConfig,
    deps: PipelineDependencies,
    state: PipelineState,
    cancellation_token: CancellationToken,
    tasks: JoinSet<anyhow::Result<()>>,
}

impl IngestPipeline {
    pub fn new(config: IngestPipelineConfig, deps: PipelineDependencies) -> Self {
        Self {
            config,
            deps,
            state: PipelineState::Created,
            cancellation_token: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Connect, then launch one poller and the worker pool.
    ///
    /// Returns once the tasks are spawned. On error nothing is launched and
    /// the pipeline stays `Created`.
    pub async fn start(&mut self) -> IngestResult<()> {
        if self.state != PipelineState::Created {
            return Err(IngestError::InvalidState(format!(
                "cannot start a pipeline that is {}",
                self.state
            )));
        }

        validate_config(&self.config)?;

        if !self.deps.decoder.supports(&self.config.content_encoding) {
            return Err(IngestError::UnsupportedEncoding(
                self.config.content_encoding.clone(),
            ));
        }

        let config = &self.config;
        info!(
            queue = %config.queue_name,
            region = %config.connection.region,
            credentials = config.connection.credentials.kind(),
            "connecting to queue and object store"
        );

        let clients = self.deps.connector.connect(&config.connection).await?;
        let queue_ref = clients
            .queue
            .ensure_queue(&config.queue_name, &config.queue_attributes)
            .await?;
        debug!(queue = %queue_ref.name, url = %queue_ref.url, "resolved queue");

        let filter = EventFilter::new(config.event_types.as_slice())
            .with_container(config.container_name.clone())
            .with_key_prefix(config.key_prefix.clone())
            .with_key_suffix(config.key_suffix.clone());

        let context = Arc::new(PipelineContext {
            queue: clients.queue,
            queue_ref,
            store: clients.store,
            decoder: Arc::clone(&self.deps.decoder),
            content_encoding: config.content_encoding.clone(),
            parser: Arc::clone(&self.deps.parser),
            sink: Arc::clone(&self.deps.sink),
            filter,
            fetch_timeout: config.fetch_timeout,
        });

        let (tx, rx) = work_queue(config.prefetch_count);

        let poller = QueuePoller::new(
            Arc::clone(&context),
            tx,
            PollSettings {
                batch_size: config.batch_size,
                receive_wait: config.receive_wait,
                error_delay: config.poll_error_delay,
            },
        );
        self.tasks.spawn(poller.run(self.cancellation_token.clone()));

        for worker_id in 0..config.worker_count {
            let processor = ObjectProcessor::new(worker_id, Arc::clone(&context), rx.clone());
            self.tasks.spawn(processor.run());
        }

        info!(
            worker_count = config.worker_count,
            prefetch_count = config.prefetch_count,
            "ingest pipeline started"
        );
        self.state = PipelineState::Running;
        Ok(())
    }

    /// Cancel the poller and wait for every launched task to exit.
    ///
    /// Workers drain the queue before exiting. Tasks still running after
    /// the shutdown timeout are aborted. Stopping a stopped pipeline is a
    /// no-op. If an earlier `stop` was dropped mid-drain, calling it again
    /// resumes the drain with a fresh timeout.
    pub async fn stop(&mut self) -> IngestResult<ShutdownReport> {
        match self.state {
            PipelineState::Running => info!("stopping ingest pipeline"),
            PipelineState::Stopping => {
                info!(remaining = self.tasks.len(), "resuming ingest pipeline shutdown")
            }
            PipelineState::Stopped => return Ok(ShutdownReport::default()),
            PipelineState::Created => {
                return Err(IngestError::InvalidState(
                    "cannot stop a pipeline that was never started".to_string(),
                ));
            }
        }

        self.state = PipelineState::Stopping;
        self.cancellation_token.cancel();

        let mut report = ShutdownReport::default();
        let tasks = &mut self.tasks;
        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(())) => report.completed += 1,
                    Ok(Err(e)) => {
                        error!(error = %e, "pipeline task failed");
                        report.failed += 1;
                    }
                    Err(e) => {
                        error!(error = %e, "pipeline task panicked");
                        report.panicked += 1;
                    }
                }
            }
        };

        if tokio::time::timeout(self.config.shutdown_timeout, drain)
            .await
            .is_err()
        {
            report.aborted = self.tasks.len();
            warn!(
                remaining = report.aborted,
                timeout_secs = self.config.shutdown_timeout.as_secs(),
                "shutdown timeout exceeded, aborting remaining tasks"
            );
            self.tasks.shutdown().await;
        }

        self.state = PipelineState::Stopped;
        info!(
            completed = report.completed,
            failed = report.failed,
            panicked = report.panicked,
            aborted = report.aborted,
            "ingest pipeline stopped"
        );
        Ok(report)
    }
}

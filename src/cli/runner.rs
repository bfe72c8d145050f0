//! CLI runner - executes commands

use crate::api::{search_sink, show_list_sink, ApiClient, LiveApiClient};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::pagination::{LoadOutcome, PaginationSink, SinkState};
use crate::types::ShowId;
use serde::Serialize;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
    client: Option<Arc<dyn ApiClient>>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl Runner {
    /// Create a new runner writing to stdout
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            client: None,
            out: Mutex::new(Box::new(std::io::stdout())),
        }
    }

    /// Use this client instead of building one from configuration
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn ApiClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Write messages to `out` instead of stdout
    #[must_use]
    pub fn with_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = Mutex::new(out);
        self
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let client = self.client()?;

        match &self.cli.command {
            Commands::Shows { pages } => self.shows(client, *pages).await,
            Commands::Search { term } => self.search(client, term).await,
            Commands::Episodes { show_id } => self.episodes(client.as_ref(), ShowId(*show_id)).await,
        }
    }

    /// Load configuration, applying command-line overrides
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.cli.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };

        if let Some(base_url) = &self.cli.base_url {
            config.base_url.clone_from(base_url);
        }

        Ok(config)
    }

    fn client(&self) -> Result<Arc<dyn ApiClient>> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let config = self.load_config()?;
        debug!("using API at {}", config.base_url);
        Ok(Arc::new(LiveApiClient::new(&config)?))
    }

    /// Page through the show index
    async fn shows(&self, client: Arc<dyn ApiClient>, pages: u32) -> Result<()> {
        let sink = show_list_sink(client);
        let start = Instant::now();
        let mut emitted = 0;

        for _ in 0..pages {
            let outcome = sink.load_next().await;
            let state = sink.current_state();
            emitted = self.emit_records(sink.name(), &state, emitted);

            match outcome {
                LoadOutcome::Appended { .. } => {}
                LoadOutcome::Exhausted { page, .. } => {
                    info!("show index ends at page {page}");
                    break;
                }
                LoadOutcome::Failed(failure) => {
                    self.emit_state(&sink, &state);
                    return Err(Error::other(failure.to_string()));
                }
                other => {
                    debug!("load skipped: {other:?}");
                    break;
                }
            }
        }

        let state = sink.current_state();
        self.emit_state(&sink, &state);
        info!(
            "loaded {} shows in {:.2}s",
            state.items.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Run one search session
    async fn search(&self, client: Arc<dyn ApiClient>, term: &str) -> Result<()> {
        let sink = search_sink(client, term);

        if let LoadOutcome::Failed(failure) = sink.load_next().await {
            return Err(Error::other(failure.to_string()));
        }

        let state = sink.current_state();
        self.emit_records(sink.name(), &state, 0);
        info!("search '{term}' returned {} shows", state.items.len());
        Ok(())
    }

    /// List the episodes of a show
    async fn episodes(&self, client: &dyn ApiClient, show: ShowId) -> Result<()> {
        let episodes = client.episodes(show).await?;
        let stream = format!("episodes:{show}");
        for episode in &episodes {
            self.emit_record(&stream, episode);
        }
        info!("show {show} has {} episodes", episodes.len());
        Ok(())
    }

    /// Emit the items past `from`, returning the new emitted count
    fn emit_records<T: Serialize>(&self, stream: &str, state: &SinkState<T>, from: usize) -> usize {
        for item in state.items.iter().skip(from) {
            self.emit_record(stream, item);
        }
        state.items.len()
    }

    fn emit_record<T: Serialize>(&self, stream: &str, item: &T) {
        let data = serde_json::to_value(item).unwrap_or(Value::Null);
        self.output_message(&json!({
            "type": "RECORD",
            "record": {
                "stream": stream,
                "data": data
            }
        }));
    }

    fn emit_state<T>(&self, sink: &PaginationSink<T>, state: &SinkState<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.output_message(&json!({
            "type": "STATE",
            "state": {
                "stream": sink.name(),
                "items": state.items.len(),
                "next_page": state.next_page,
                "is_exhausted": state.is_exhausted,
                "last_error": state.last_error.as_ref().map(ToString::to_string)
            }
        }));
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        let line = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg),
            OutputFormat::Pretty => serde_json::to_string_pretty(msg),
        }
        .unwrap_or_default();

        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{line}");
        }
    }
}

use std::sync::Arc;

use indicatif::ProgressBar;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::dispatcher::{DispatchConfig, Dispatcher, RunSummary};
use crate::executor::{HttpTransport, RequestExecutor, Transport, TransportBuildError, TransportOptions};
use crate::filter::{FilterEngine, FilterPolicy};
use crate::generator::{total_combinations, CombinationGenerator};
use crate::output::HitRecord;
use crate::stop::StopSignal;
use crate::template::RequestTemplate;
use crate::wordlist::{WordlistError, WordlistSource};

// The run configuration. Every option has its default filled by `Default`.
#[derive(Clone, Debug)]
pub struct Options {
    pub url: String,
    // declaration order is enumeration order: the first placeholder varies slowest
    pub wordlists: Vec<(String, WordlistSource)>,
    pub concurrency: usize,
    pub timeout_seconds: u64,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub stop_placeholder: Option<String>,
    pub filters: FilterPolicy,
    pub verbose_debug: bool,
    pub proxy: Option<String>,
    // requests per second, 0 = unlimited
    pub rate: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            url: String::new(),
            wordlists: Vec::new(),
            concurrency: 10,
            timeout_seconds: 10,
            method: "GET".to_string(),
            headers: Vec::new(),
            body: None,
            stop_placeholder: None,
            filters: FilterPolicy::default(),
            verbose_debug: false,
            proxy: None,
            rate: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no wordlists configured")]
    NoPlaceholders,

    #[error("invalid placeholder configuration: {message}")]
    InvalidPlaceholderConfiguration { message: String },

    #[error("invalid HTTP method '{method}'")]
    InvalidMethod { method: String },

    #[error(transparent)]
    Wordlist(#[from] WordlistError),

    #[error(transparent)]
    Transport(#[from] TransportBuildError),
}

#[derive(Clone, Debug)]
pub struct SourceSummary {
    pub placeholder: String,
    pub source: String,
    pub count: usize,
}

// Everything the dispatcher needs to start for one run.
#[derive(Default)]
pub struct RunContext {
    pub stop: StopSignal,
    pub progress: Option<ProgressBar>,
    pub hits: Option<mpsc::Sender<HitRecord>>,
}

pub struct Runner {
    options: Options,
    template: RequestTemplate,
    transport: Option<Arc<dyn Transport>>,
}

impl Runner {
    pub fn new(mut options: Options) -> Result<Self, RunnerError> {
        if options.wordlists.is_empty() {
            return Err(RunnerError::NoPlaceholders);
        }
        if options.wordlists.iter().any(|(p, _)| p.is_empty()) {
            return Err(RunnerError::InvalidPlaceholderConfiguration {
                message: "placeholder names must not be empty".to_string(),
            });
        }
        let declared: Vec<String> = options.wordlists.iter().map(|(p, _)| p.clone()).collect();

        if let Some(stop) = options.stop_placeholder.as_deref() {
            if !declared.iter().any(|p| p == stop) {
                return Err(RunnerError::InvalidPlaceholderConfiguration {
                    message: format!(
                        "skip-after placeholder '{stop}' is not a declared placeholder (available: {})",
                        declared.join(", ")
                    ),
                });
            }
        }

        let method = crate::utils::parse_http_method(&options.method).map_err(|_| {
            RunnerError::InvalidMethod {
                method: options.method.clone(),
            }
        })?;

        if options.body.as_deref().map(|b| b.is_empty()).unwrap_or(false) {
            options.body = None;
        }
        options.concurrency = options.concurrency.max(1);

        let template = RequestTemplate {
            method,
            url: options.url.clone(),
            headers: options.headers.clone(),
            body: options.body.clone(),
        };
        if template.used_placeholders(&declared).is_empty() {
            return Err(RunnerError::InvalidPlaceholderConfiguration {
                message: format!(
                    "no placeholder found in URL, headers, or data (available: {})",
                    declared.join(", ")
                ),
            });
        }

        Ok(Self {
            options,
            template,
            transport: None,
        })
    }

    // replaces the reqwest transport, mostly for tests and embedding
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    pub fn placeholders(&self) -> Vec<String> {
        self.options.wordlists.iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn used_placeholders(&self) -> Vec<String> {
        let declared = self.placeholders();
        self.template
            .used_placeholders(&declared)
            .into_iter()
            .map(|p| p.to_string())
            .collect()
    }

    // Counts and loads every wordlist and builds the transport. All fatal errors
    // surface here, before a single request is sent.
    pub fn prepare(&self) -> Result<PreparedRun, RunnerError> {
        let mut sources = Vec::with_capacity(self.options.wordlists.len());
        for (placeholder, source) in self.options.wordlists.iter() {
            sources.push(SourceSummary {
                placeholder: placeholder.clone(),
                source: source.describe(),
                count: source.count()?,
            });
        }
        let total = total_combinations(sources.iter().map(|s| s.count));

        let mut values = Vec::with_capacity(self.options.wordlists.len());
        for (placeholder, source) in self.options.wordlists.iter() {
            values.push((placeholder.clone(), source.load()?));
        }

        let transport: Arc<dyn Transport> = match self.transport.as_ref() {
            Some(transport) => transport.clone(),
            None => Arc::new(HttpTransport::new(&TransportOptions {
                timeout_seconds: self.options.timeout_seconds,
                proxy: self.options.proxy.clone(),
            })?),
        };

        Ok(PreparedRun {
            sources,
            total,
            values,
            executor: RequestExecutor::new(transport, self.template.clone())
                .with_debug(self.options.verbose_debug),
            filter: FilterEngine::new(self.options.filters.clone()),
            concurrency: self.options.concurrency,
            rate: self.options.rate,
            stop_placeholder: self.options.stop_placeholder.clone(),
        })
    }

    pub async fn run(&self, ctx: RunContext) -> Result<RunSummary, RunnerError> {
        Ok(self.prepare()?.run(ctx).await)
    }
}

pub struct PreparedRun {
    sources: Vec<SourceSummary>,
    total: u64,
    values: Vec<(String, Vec<String>)>,
    executor: RequestExecutor,
    filter: FilterEngine,
    concurrency: usize,
    rate: u32,
    stop_placeholder: Option<String>,
}

impl PreparedRun {
    pub fn sources(&self) -> &[SourceSummary] {
        &self.sources
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn invalid_patterns(&self) -> &[String] {
        self.filter.invalid_patterns()
    }

    pub fn verbose_debug(&self) -> bool {
        self.executor.debug()
    }

    pub async fn run(self, ctx: RunContext) -> RunSummary {
        let RunContext {
            stop,
            progress,
            hits,
        } = ctx;
        let generator = CombinationGenerator::new(self.values, stop.clone());
        let mut dispatcher = Dispatcher::new(
            self.executor,
            self.filter,
            DispatchConfig {
                total: self.total,
                concurrency: self.concurrency,
                rate: self.rate,
                stop_placeholder: self.stop_placeholder,
            },
            stop,
            progress.unwrap_or_else(ProgressBar::hidden),
        );
        if let Some(tx) = hits {
            dispatcher = dispatcher.with_hits(tx);
        }
        dispatcher.run(generator).await
    }
}

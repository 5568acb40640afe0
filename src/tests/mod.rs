use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::executor::{RawResponse, Transport, TransportError};
use crate::filter::FilterPolicy;
use crate::runner::{Options, RunContext, Runner};
use crate::stop::StopSignal;
use crate::template::RenderedRequest;
use crate::wordlist::WordlistSource;

type Responder = Box<dyn Fn(&str) -> Result<(u16, String), String> + Send + Sync>;

// In-memory transport answering by rendered URL.
pub(crate) struct MockTransport {
    respond: Responder,
    requests: Mutex<Vec<String>>,
    gauge: Option<(Arc<AtomicUsize>, Arc<AtomicUsize>)>,
    delay: Duration,
}

impl MockTransport {
    pub(crate) fn new<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Result<(u16, String), String> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
            gauge: None,
            delay: Duration::ZERO,
        }
    }

    // tracks how many sends run at once, and the highest value seen
    pub(crate) fn with_gauge(
        mut self,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        delay: Duration,
    ) -> Self {
        self.gauge = Some((running, peak));
        self.delay = delay;
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: RenderedRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        Box::pin(async move {
            if let Ok(mut log) = self.requests.lock() {
                log.push(request.url.clone());
            }
            if let Some((running, peak)) = self.gauge.as_ref() {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some((running, _)) = self.gauge.as_ref() {
                running.fetch_sub(1, Ordering::SeqCst);
            }

            let (status, body) = (self.respond)(&request.url).map_err(TransportError::Other)?;
            Ok(RawResponse {
                status,
                headers: Vec::new(),
                body: body.into_bytes(),
                elapsed: Duration::from_millis(1),
            })
        })
    }
}

fn inline(values: &[&str]) -> WordlistSource {
    WordlistSource::Inline(values.iter().map(|s| s.to_string()).collect())
}

fn admin_one_only() -> Arc<MockTransport> {
    Arc::new(MockTransport::new(|url| {
        if url == "/admin/1" {
            Ok((200, "Welcome, admin!".to_string()))
        } else {
            Ok((404, "Not Found".to_string()))
        }
    }))
}

#[tokio::test]
async fn two_wordlists_single_hit_end_to_end() {
    let transport = admin_one_only();
    let runner = Runner::new(Options {
        url: "/FUZZ1/FUZZ2".to_string(),
        wordlists: vec![
            ("FUZZ1".to_string(), inline(&["admin", "guest"])),
            ("FUZZ2".to_string(), inline(&["1", "2"])),
        ],
        filters: FilterPolicy {
            status_allow: [200u16].into_iter().collect(),
            ..Default::default()
        },
        ..Options::default()
    })
    .unwrap()
    .with_transport(transport.clone());

    let summary = runner.run(RunContext::default()).await.unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.completed, 4);
    assert_eq!(summary.hits.len(), 1);
    let hit = &summary.hits[0];
    assert_eq!(hit.combination.get("FUZZ1"), Some("admin"));
    assert_eq!(hit.combination.get("FUZZ2"), Some("1"));
    assert_eq!(hit.status, 200);

    let mut requested = transport.requests();
    requested.sort();
    assert_eq!(requested, vec!["/admin/1", "/admin/2", "/guest/1", "/guest/2"]);
}

#[tokio::test]
async fn skip_after_counts_every_combination_once() {
    let transport = admin_one_only();
    let runner = Runner::new(Options {
        url: "/FUZZ1/FUZZ2".to_string(),
        wordlists: vec![
            ("FUZZ1".to_string(), inline(&["admin", "guest"])),
            ("FUZZ2".to_string(), inline(&["1", "2", "3", "4", "5"])),
        ],
        concurrency: 1,
        stop_placeholder: Some("FUZZ1".to_string()),
        filters: FilterPolicy {
            status_allow: [200u16].into_iter().collect(),
            ..Default::default()
        },
        ..Options::default()
    })
    .unwrap()
    .with_transport(transport.clone());

    let summary = runner.run(RunContext::default()).await.unwrap();

    assert_eq!(summary.completed, 10);
    assert_eq!(summary.found_values, vec!["admin".to_string()]);
    assert!(summary.skipped >= 1);
    assert_eq!(
        summary.completed,
        summary.skipped + transport.requests().len() as u64
    );
}

#[tokio::test]
async fn empty_wordlist_sends_nothing() {
    let transport = admin_one_only();
    let runner = Runner::new(Options {
        url: "/FUZZ1/FUZZ2".to_string(),
        wordlists: vec![
            ("FUZZ1".to_string(), inline(&["admin"])),
            ("FUZZ2".to_string(), inline(&["", "  "])),
        ],
        ..Options::default()
    })
    .unwrap()
    .with_transport(transport.clone());

    let summary = runner.run(RunContext::default()).await.unwrap();
    assert_eq!(summary.total, 0);
    assert_eq!(summary.completed, 0);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn wordlist_files_are_trimmed_and_keep_duplicates() {
    let mut users = tempfile::NamedTempFile::new().unwrap();
    writeln!(users, "admin\r\n\n  guest  \nadmin").unwrap();
    let transport = admin_one_only();
    let runner = Runner::new(Options {
        url: "/FUZZ/1".to_string(),
        wordlists: vec![(
            "FUZZ".to_string(),
            WordlistSource::FilePath(users.path().to_string_lossy().to_string()),
        )],
        filters: FilterPolicy {
            status_allow: [200u16].into_iter().collect(),
            ..Default::default()
        },
        ..Options::default()
    })
    .unwrap()
    .with_transport(transport.clone());

    let prepared = runner.prepare().unwrap();
    assert_eq!(prepared.sources()[0].count, 3);
    let summary = prepared.run(RunContext::default()).await;

    // duplicates are requested twice
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.hits.len(), 2);
}

#[tokio::test]
async fn content_filters_apply_on_top_of_status() {
    let transport = Arc::new(MockTransport::new(|url| match url {
        "/a" => Ok((200, "Welcome back".to_string())),
        "/b" => Ok((200, "Access denied".to_string())),
        _ => Ok((200, String::new())),
    }));
    let runner = Runner::new(Options {
        url: "/FUZZ".to_string(),
        wordlists: vec![("FUZZ".to_string(), inline(&["a", "b", "c"]))],
        filters: FilterPolicy {
            status_allow: [200u16].into_iter().collect(),
            exclude_text: vec!["denied".to_string()],
            ..Default::default()
        },
        ..Options::default()
    })
    .unwrap()
    .with_transport(transport);

    let summary = runner.run(RunContext::default()).await.unwrap();
    let urls: Vec<&str> = summary.hits.iter().map(|h| h.url.as_str()).collect();
    // empty bodies never pass a content filter
    assert_eq!(urls, vec!["/a"]);
}

#[tokio::test]
async fn stop_before_start_sends_nothing() {
    let transport = admin_one_only();
    let runner = Runner::new(Options {
        url: "/FUZZ".to_string(),
        wordlists: vec![("FUZZ".to_string(), inline(&["a", "b"]))],
        ..Options::default()
    })
    .unwrap()
    .with_transport(transport.clone());

    let stop = StopSignal::new();
    stop.request();
    let summary = runner
        .run(RunContext {
            stop,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.completed, 0);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn hit_channel_receives_every_hit() {
    let transport = Arc::new(MockTransport::new(|_| Ok((200, "ok".to_string()))));
    let runner = Runner::new(Options {
        url: "/FUZZ".to_string(),
        wordlists: vec![("FUZZ".to_string(), inline(&["a", "b", "c", "d"]))],
        concurrency: 2,
        ..Options::default()
    })
    .unwrap()
    .with_transport(transport);

    let (tx, mut rx) = mpsc::channel(16);
    let summary = runner
        .run(RunContext {
            hits: Some(tx),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut streamed = Vec::new();
    while let Some(record) = rx.recv().await {
        streamed.push(record.url);
    }
    streamed.sort();
    assert_eq!(streamed, vec!["/a", "/b", "/c", "/d"]);
    assert_eq!(summary.hits.len(), 4);
}

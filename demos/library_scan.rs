// Drives a scan from code instead of the command line.
//
//   cargo run --example library_scan -- http://127.0.0.1:8000
use combfuzz::filter::FilterPolicy;
use combfuzz::runner::{Options, RunContext, Runner};
use combfuzz::wordlist::WordlistSource;

fn inline(values: &[&str]) -> WordlistSource {
    WordlistSource::Inline(values.iter().map(|s| s.to_string()).collect())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:8000".to_string());

    let runner = Runner::new(Options {
        url: format!("{}/USER/PASS", target.trim_end_matches('/')),
        wordlists: vec![
            ("USER".to_string(), inline(&["admin", "guest", "root"])),
            ("PASS".to_string(), inline(&["1234", "password", "letmein"])),
        ],
        concurrency: 4,
        stop_placeholder: Some("USER".to_string()),
        filters: FilterPolicy {
            status_allow: [200u16].into_iter().collect(),
            ..FilterPolicy::default()
        },
        ..Options::default()
    })?;

    let summary = runner.run(RunContext::default()).await?;
    for hit in summary.hits.iter() {
        println!("{} [{}] {}", hit.status, hit.combination.describe(), hit.url);
    }
    println!(
        "{}/{} combinations, {} skipped, {} errors, found: {}",
        summary.completed,
        summary.total,
        summary.skipped,
        summary.errors,
        summary.found_values.join(", ")
    );
    Ok(())
}

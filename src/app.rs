use std::collections::HashSet;
use std::time::Duration;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::filter::FilterPolicy;
use crate::output::{HitRecord, OutputFormat};
use crate::runner::{Options, RunContext, Runner};
use crate::stop::StopSignal;
use crate::wordlist::WordlistSource;

fn print_banner() {
    const BANNER: &str = r#"
                          __    ____
  _________  ____ ___  / /_  / __/_  __________
 / ___/ __ \/ __ `__ \/ __ \/ /_/ / / /_  /_  /
/ /__/ /_/ / / / / / / /_/ / __/ /_/ / / /_/ /_
\___/\____/_/ /_/ /_/_.___/_/  \__,_/ /___/___/
"#;
    print!("{}", BANNER);
    println!(
        "       v{} - combinatorial web fuzzer",
        env!("CARGO_PKG_VERSION")
    );
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn summarize_filters(policy: &FilterPolicy) -> Option<String> {
    fn join_sorted<T: ToString + Ord + Copy>(set: &HashSet<T>) -> String {
        let mut items: Vec<T> = set.iter().copied().collect();
        items.sort();
        items
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    let mut parts: Vec<String> = Vec::new();
    if !policy.status_allow.is_empty() {
        parts.push(format!("codes={}", join_sorted(&policy.status_allow)));
    }
    if !policy.status_deny.is_empty() {
        parts.push(format!("!codes={}", join_sorted(&policy.status_deny)));
    }
    if !policy.size_allow.is_empty() {
        parts.push(format!("size={}", join_sorted(&policy.size_allow)));
    }
    if !policy.size_deny.is_empty() {
        parts.push(format!("!size={}", join_sorted(&policy.size_deny)));
    }
    if !policy.match_text.is_empty() {
        parts.push(format!("text={}", policy.match_text.join(",")));
    }
    if !policy.match_regex.is_empty() {
        parts.push("regex=...".to_string());
    }
    if !policy.exclude_text.is_empty() {
        parts.push(format!("!text={}", policy.exclude_text.join(",")));
    }
    if !policy.exclude_regex.is_empty() {
        parts.push("!regex=...".to_string());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn format_hit_line(record: &HitRecord) -> String {
    let status = format!("[Status: {}]", record.status);
    let status = match record.status {
        200 => status.green(),
        301 | 302 | 307 | 308 => status.yellow(),
        401 | 403 => status.red(),
        s if s >= 500 => status.magenta(),
        _ => status.blue(),
    };
    format!(
        "{} [Size: {}] [Time: {:.2}s] [{}] -> {}",
        status,
        record.size,
        record.time_secs,
        record.values.describe(),
        record.url
    )
}

fn parse_codes(raw: Option<String>, flag: &str) -> Result<HashSet<u16>, String> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => crate::utils::parse_u16_set_csv(&raw)
            .map_err(|e| format!("invalid --{flag} '{raw}': {e}")),
        _ => Ok(HashSet::new()),
    }
}

fn parse_sizes(raw: Option<String>, flag: &str) -> Result<HashSet<usize>, String> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => crate::utils::parse_usize_set_csv(&raw)
            .map_err(|e| format!("invalid --{flag} '{raw}': {e}")),
        _ => Ok(HashSet::new()),
    }
}

fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.as_deref()
        .map(crate::utils::parse_csv_list)
        .unwrap_or_default()
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: Options,
    output: Option<String>,
    output_format: OutputFormat,
    no_color: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let url = args
        .url
        .or(cfg.url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| "a target URL must be specified (--url)".to_string())?;

    let raw_wordlists = if args.wordlist.is_empty() {
        cfg.wordlists.unwrap_or_default()
    } else {
        args.wordlist
    };
    let mut wordlist_paths: Vec<(String, String)> = Vec::new();
    for raw in raw_wordlists.iter() {
        let (placeholder, path) = crate::utils::parse_wordlist_arg(raw)
            .map_err(|e| format!("invalid --wordlist '{raw}': {e}"))?;
        crate::utils::merge_wordlist(
            &mut wordlist_paths,
            placeholder,
            config::expand_tilde_string(&path),
        );
    }
    let wordlists = wordlist_paths
        .into_iter()
        .map(|(placeholder, path)| (placeholder, WordlistSource::FilePath(path)))
        .collect();

    let raw_headers = if args.header.is_empty() {
        cfg.headers.unwrap_or_default()
    } else {
        args.header
    };
    // entries without a colon are ignored
    let headers = raw_headers
        .iter()
        .filter_map(|h| crate::utils::parse_header(h))
        .collect();

    let filters = FilterPolicy {
        status_allow: parse_codes(args.filter_codes.or(cfg.filter_codes), "filter-codes")?,
        status_deny: parse_codes(args.exclude_codes.or(cfg.exclude_codes), "exclude-codes")?,
        size_allow: parse_sizes(args.filter_size.or(cfg.filter_size), "filter-size")?,
        size_deny: parse_sizes(args.exclude_size.or(cfg.exclude_size), "exclude-size")?,
        match_text: parse_list(args.match_text.or(cfg.match_text)),
        match_regex: parse_list(args.match_regex.or(cfg.match_regex)),
        exclude_text: parse_list(args.exclude_text.or(cfg.exclude_text)),
        exclude_regex: parse_list(args.exclude_regex.or(cfg.exclude_regex)),
    };

    let debug = args.debug || cfg.debug.unwrap_or(false);
    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let options = Options {
        url,
        wordlists,
        concurrency: args.threads.or(cfg.threads).unwrap_or(10),
        timeout_seconds: args.timeout.or(cfg.timeout).unwrap_or(10),
        method: args
            .method
            .or(cfg.method)
            .unwrap_or_else(|| "GET".to_string()),
        headers,
        body: args.data.or(cfg.data).filter(|d| !d.is_empty()),
        stop_placeholder: args
            .skip_after
            .or(cfg.skip_after)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        filters,
        verbose_debug: debug,
        proxy: args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty()),
        rate: args.rate.or(cfg.rate).unwrap_or(0),
    };

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format_raw = args.output_format.or(cfg.output_format);
    let output_format = match output_format_raw.as_deref() {
        Some(raw) => OutputFormat::parse(raw).ok_or_else(|| {
            format!("invalid --output-format '{raw}', expected text, json or xml")
        })?,
        None => output
            .as_deref()
            .and_then(crate::output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };

    Ok(RunConfig {
        options,
        output,
        output_format,
        no_color,
    })
}

fn init_logging(debug: bool) {
    let default_directive = if debug {
        "combfuzz=debug"
    } else {
        "combfuzz=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    let runner = Runner::new(run.options.clone()).map_err(|e| e.to_string())?;
    let prepared = runner.prepare().map_err(|e| e.to_string())?;
    let options = runner.options();

    format_kv_line("Method", runner.template().method.as_str());
    format_kv_line("URL", &options.url);
    for source in prepared.sources() {
        format_kv_line(
            "Wordlist",
            &format!(
                "{} -> {} ({} words)",
                source.placeholder, source.source, source.count
            ),
        );
    }
    for (k, v) in options.headers.iter() {
        format_kv_line("Header", &format!("{k}: {v}"));
    }
    if let Some(body) = options.body.as_deref() {
        format_kv_line("Data", body);
    }
    format_kv_line("Used", &runner.used_placeholders().join(", "));
    format_kv_line("Threads", &options.concurrency.to_string());
    format_kv_line("Timeout", &format!("{}s", options.timeout_seconds));
    if options.rate > 0 {
        format_kv_line("Rate", &format!("{} req/s", options.rate));
    }
    if let Some(proxy) = options.proxy.as_deref() {
        format_kv_line("Proxy", proxy);
    }
    if let Some(stop) = options.stop_placeholder.as_deref() {
        format_kv_line("Skip after", stop);
    }
    if let Some(filters) = summarize_filters(&options.filters) {
        format_kv_line("Filters", &filters);
    }
    for pattern in prepared.invalid_patterns() {
        format_kv_line("Invalid", &format!("regex '{pattern}' never matches"));
    }
    format_kv_line("Debug", format_bool(prepared.verbose_debug()));
    format_kv_line("Total", &format!("{} combinations", prepared.total()));
    println!();

    let debug = prepared.verbose_debug();
    let pb = if debug {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(prepared.total());
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.enable_steady_tick(Duration::from_millis(200));
        pb.set_style(
            ProgressStyle::with_template(
                ":: Progress: [{pos}/{len}] {percent}% :: {per_sec} :: Duration: [{elapsed_precise}] :: {msg}",
            )
            .map_err(|e| format!("failed to build progress bar style: {e}"))?
            .progress_chars(r#"#>-"#),
        );
        pb
    };

    let stop = StopSignal::new();
    let interrupt_stop = stop.clone();
    let interrupt_pb = pb.clone();
    let interrupt_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt_pb.suspend(|| {
                eprintln!(
                    "\n{} interrupted, waiting for in-flight requests to finish...",
                    "[!]".bold().yellow()
                )
            });
            interrupt_stop.request();
        }
    });

    let (hit_tx, mut hit_rx) = mpsc::channel::<HitRecord>(1024);
    let printer_pb = pb.clone();
    let printer_handle = tokio::spawn(async move {
        let mut hits = 0usize;
        while let Some(record) = hit_rx.recv().await {
            hits += 1;
            let line = format_hit_line(&record);
            if debug {
                println!("[MATCH] {line}");
            } else {
                printer_pb.suspend(|| println!("{line}"));
                printer_pb.set_message(format!("hits: {hits}"));
            }
        }
    });

    let summary = prepared
        .run(RunContext {
            stop,
            progress: Some(pb.clone()),
            hits: Some(hit_tx),
        })
        .await;
    let _ = printer_handle.await;
    interrupt_handle.abort();
    pb.finish_and_clear();

    println!();
    if summary.interrupted {
        println!(":: Interrupted :: partial results ::");
    }
    println!(
        ":: Completed :: {}/{} requests in {:.2}s ({:.1} req/s) ::",
        summary.completed,
        summary.total,
        summary.elapsed.as_secs_f64(),
        summary.requests_per_second()
    );
    format_kv_line("Hits", &summary.hits.len().to_string());
    if summary.errors > 0 {
        format_kv_line("Errors", &summary.errors.to_string());
    }
    if summary.skipped > 0 {
        println!(
            "Skipped {} combinations due to --skip-after",
            summary.skipped
        );
    }
    if let Some(placeholder) = summary.stop_placeholder.as_deref() {
        let found = if summary.found_values.is_empty() {
            "none".to_string()
        } else {
            summary.found_values.join(", ")
        };
        format_kv_line("Found", &format!("{placeholder}: {found}"));
    }

    if let Some(outfile_path) = run.output.as_ref() {
        let records = crate::output::build_records(&summary.hits);
        let rendered = crate::output::render(run.output_format, &records);

        let mut outfile = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(outfile_path)
            .await
            .map_err(|e| format!("failed to open output file: {e}"))?;
        outfile
            .write_all(&rendered)
            .await
            .map_err(|_| "failed to write output file".to_string())?;
        format_kv_line("Output", outfile_path);
    }

    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let cfg = match args.config.as_deref() {
        Some(path) => config::load_config(&config::expand_tilde(path), false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    init_logging(run.options.verbose_debug);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}

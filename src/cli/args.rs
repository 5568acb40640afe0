use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "combfuzz",
    version,
    about = "combinatorial web fuzzer",
    long_about = "Combfuzz sends one request per combination of wordlist values and reports the responses that pass the configured filters.\n\nExamples:\n  combfuzz -u https://target.tld/FUZZ -w words.txt --fc 200\n  combfuzz -u https://target.tld/login -X POST -d 'user=USER&pass=PASS' -w USER:users.txt -w PASS:passwords.txt --skip-after USER --mt welcome\n  combfuzz --config ~/.combfuzz/config.yml\n\nThe first wordlist varies slowest, the last one fastest."
)]
pub struct CliArgs {
    #[arg(
        short = 'u',
        long = "url",
        value_name = "URL",
        help_heading = "Input",
        help = "Target URL template containing placeholders."
    )]
    pub url: Option<String>,

    #[arg(
        short = 'w',
        long = "wordlist",
        value_name = "PLACEHOLDER:FILE",
        action = ArgAction::Append,
        help_heading = "Input",
        help = "Wordlist bound to a placeholder (repeatable). A bare FILE binds FUZZ."
    )]
    pub wordlist: Vec<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.combfuzz/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'X',
        long = "method",
        value_name = "METHOD",
        help_heading = "HTTP",
        help = "HTTP method (default: GET)."
    )]
    pub method: Option<String>,

    #[arg(
        short = 'H',
        long = "header",
        value_name = "HEADER",
        action = ArgAction::Append,
        help_heading = "HTTP",
        help = "Header 'Key: Value' (repeatable). May contain placeholders."
    )]
    pub header: Vec<String>,

    #[arg(
        short = 'd',
        long = "data",
        value_name = "BODY",
        help_heading = "HTTP",
        help = "Request body. May contain placeholders."
    )]
    pub data: Option<String>,

    #[arg(
        long = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "Send every request through this proxy."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 't',
        long = "threads",
        value_name = "N",
        help_heading = "Performance",
        help = "Concurrent requests (default: 10)."
    )]
    pub threads: Option<usize>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "Performance",
        help = "Per-request timeout in seconds (default: 10)."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'r',
        long = "rate",
        value_name = "RPS",
        help_heading = "Performance",
        help = "Request rate limit in requests per second (0 = unlimited)."
    )]
    pub rate: Option<u32>,

    #[arg(
        long = "skip-after",
        value_name = "PLACEHOLDER",
        help_heading = "Scan",
        help = "Stop trying combinations for a value of PLACEHOLDER once it produced a hit."
    )]
    pub skip_after: Option<String>,

    #[arg(
        long = "fc",
        visible_alias = "filter-codes",
        value_name = "CODES",
        help_heading = "Filters",
        help = "Status codes to keep (comma-separated)."
    )]
    pub filter_codes: Option<String>,

    #[arg(
        long = "ec",
        visible_alias = "exclude-codes",
        value_name = "CODES",
        help_heading = "Filters",
        help = "Status codes to drop (comma-separated)."
    )]
    pub exclude_codes: Option<String>,

    #[arg(
        long = "fs",
        visible_alias = "filter-size",
        value_name = "SIZES",
        help_heading = "Filters",
        help = "Body sizes to keep (comma-separated)."
    )]
    pub filter_size: Option<String>,

    #[arg(
        long = "es",
        visible_alias = "exclude-size",
        value_name = "SIZES",
        help_heading = "Filters",
        help = "Body sizes to drop (comma-separated)."
    )]
    pub exclude_size: Option<String>,

    #[arg(
        long = "mt",
        visible_alias = "match-text",
        value_name = "TEXT",
        help_heading = "Filters",
        help = "Keep bodies containing any of these strings (comma-separated, case-insensitive)."
    )]
    pub match_text: Option<String>,

    #[arg(
        long = "mr",
        visible_alias = "match-regex",
        value_name = "REGEX",
        help_heading = "Filters",
        help = "Keep bodies matching any of these patterns (comma-separated)."
    )]
    pub match_regex: Option<String>,

    #[arg(
        long = "et",
        visible_alias = "exclude-text",
        value_name = "TEXT",
        help_heading = "Filters",
        help = "Drop bodies containing any of these strings (comma-separated, case-insensitive)."
    )]
    pub exclude_text: Option<String>,

    #[arg(
        long = "er",
        visible_alias = "exclude-regex",
        value_name = "REGEX",
        help_heading = "Filters",
        help = "Drop bodies matching any of these patterns (comma-separated)."
    )]
    pub exclude_regex: Option<String>,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write hits to FILE at the end of the run."
    )]
    pub output: Option<String>,

    #[arg(
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format: text, json, xml (default: from the file extension)."
    )]
    pub output_format: Option<String>,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        long = "debug",
        help_heading = "Output",
        help = "Log every request and response; disables the progress bar."
    )]
    pub debug: bool,
}

use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(threads) = args.threads {
        if threads == 0 {
            return Err("invalid threads, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    for raw in args.wordlist.iter() {
        crate::utils::parse_wordlist_arg(raw)
            .map_err(|e| format!("invalid --wordlist '{raw}': {e}"))?;
    }
    if let Some(raw) = args.method.as_deref() {
        crate::utils::parse_http_method(raw)
            .map_err(|e| format!("invalid --method '{raw}': {e}"))?;
    }
    if let Some(raw) = args.filter_codes.as_deref() {
        crate::utils::parse_u16_set_csv(raw)
            .map_err(|e| format!("invalid --filter-codes '{raw}': {e}"))?;
    }
    if let Some(raw) = args.exclude_codes.as_deref() {
        crate::utils::parse_u16_set_csv(raw)
            .map_err(|e| format!("invalid --exclude-codes '{raw}': {e}"))?;
    }
    if let Some(raw) = args.filter_size.as_deref() {
        crate::utils::parse_usize_set_csv(raw)
            .map_err(|e| format!("invalid --filter-size '{raw}': {e}"))?;
    }
    if let Some(raw) = args.exclude_size.as_deref() {
        crate::utils::parse_usize_set_csv(raw)
            .map_err(|e| format!("invalid --exclude-size '{raw}': {e}"))?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected text, json or xml"
            ));
        }
    }
    Ok(())
}

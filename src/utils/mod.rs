use std::collections::HashSet;

pub const DEFAULT_PLACEHOLDER: &str = "FUZZ";

pub fn parse_u16_set_csv(value: &str) -> Result<HashSet<u16>, String> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err("list is empty".to_string());
    }
    let mut out = HashSet::new();
    for part in raw.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        let code: u16 = item
            .parse()
            .map_err(|_| format!("invalid status code '{item}'"))?;
        out.insert(code);
    }
    if out.is_empty() {
        return Err("list is empty".to_string());
    }
    Ok(out)
}

pub fn parse_usize_set_csv(value: &str) -> Result<HashSet<usize>, String> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err("list is empty".to_string());
    }
    let mut out = HashSet::new();
    for part in raw.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        let size: usize = item.parse().map_err(|_| format!("invalid size '{item}'"))?;
        out.insert(size);
    }
    if out.is_empty() {
        return Err("list is empty".to_string());
    }
    Ok(out)
}

// comma-separated text list, items trimmed, empty items dropped
pub fn parse_csv_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

// `Key: Value`, split at the first colon. Returns `None` without a colon.
pub fn parse_header(value: &str) -> Option<(String, String)> {
    let (key, val) = value.split_once(':')?;
    Some((key.trim().to_string(), val.trim().to_string()))
}

// `PLACEHOLDER:file`, or a bare `file` bound to `FUZZ`.
pub fn parse_wordlist_arg(value: &str) -> Result<(String, String), String> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err("wordlist argument is empty".to_string());
    }
    match raw.split_once(':') {
        Some((placeholder, path)) => {
            let placeholder = placeholder.trim();
            let path = path.trim();
            if placeholder.is_empty() || path.is_empty() {
                return Err(format!("expected PLACEHOLDER:FILE, got '{raw}'"));
            }
            Ok((placeholder.to_string(), path.to_string()))
        }
        None => Ok((DEFAULT_PLACEHOLDER.to_string(), raw.to_string())),
    }
}

// a placeholder given twice keeps its first position and its last file
pub fn merge_wordlist(list: &mut Vec<(String, String)>, placeholder: String, path: String) {
    match list.iter_mut().find(|(p, _)| *p == placeholder) {
        Some(entry) => entry.1 = path,
        None => list.push((placeholder, path)),
    }
}

pub fn parse_http_method(value: &str) -> Result<reqwest::Method, String> {
    let item = value.trim();
    if item.is_empty() {
        return Err("method is empty".to_string());
    }
    let canonical = item.to_ascii_uppercase();
    reqwest::Method::from_bytes(canonical.as_bytes()).map_err(|_| format!("invalid method '{item}'"))
}

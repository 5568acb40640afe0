use serde::Serialize;

use crate::executor::Outcome;
use crate::generator::Combination;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Xml,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".xml") {
        return Some(OutputFormat::Xml);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

// What gets reported for a hit, as soon as it is known.
#[derive(Clone, Debug, Serialize)]
pub struct HitRecord {
    pub url: String,
    pub status: u16,
    pub size: usize,
    pub time_secs: f64,
    pub values: Combination,
}

impl From<&Outcome> for HitRecord {
    fn from(outcome: &Outcome) -> Self {
        Self {
            url: outcome.url.clone(),
            status: outcome.status,
            size: outcome.length,
            time_secs: outcome.elapsed.as_secs_f64(),
            values: outcome.combination.clone(),
        }
    }
}

pub fn build_records(hits: &[Outcome]) -> Vec<HitRecord> {
    hits.iter().map(HitRecord::from).collect()
}

pub fn render_text(records: &[HitRecord]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&r.url);
        out.push('\n');
    }
    out.into_bytes()
}

pub fn render_json(records: &[HitRecord]) -> Vec<u8> {
    serde_json::to_vec_pretty(records).unwrap_or_else(|_| b"[]\n".to_vec())
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn render_xml(records: &[HitRecord]) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str("<results>\n");
    for r in records {
        out.push_str("  <result>\n");
        out.push_str(&format!("    <url>{}</url>\n", escape_xml(&r.url)));
        out.push_str(&format!("    <status>{}</status>\n", r.status));
        out.push_str(&format!("    <size>{}</size>\n", r.size));
        out.push_str(&format!("    <time>{:.3}</time>\n", r.time_secs));
        out.push_str("    <values>\n");
        for (placeholder, value) in r.values.iter() {
            out.push_str(&format!(
                "      <value placeholder=\"{}\">{}</value>\n",
                escape_xml(placeholder),
                escape_xml(value)
            ));
        }
        out.push_str("    </values>\n");
        out.push_str("  </result>\n");
    }
    out.push_str("</results>\n");
    out.into_bytes()
}

pub fn render(format: OutputFormat, records: &[HitRecord]) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(records),
        OutputFormat::Json => render_json(records),
        OutputFormat::Xml => render_xml(records),
    }
}

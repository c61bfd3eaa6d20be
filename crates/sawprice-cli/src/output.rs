use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use sawprice_core::{SourceId, SourceRejection};

use crate::cli::OutputFormat;
use crate::error::CliError;

const SCHEMA_VERSION: &str = "v1.0.0";

/// Outcome label written into every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Populated,
    Empty,
    AllSourcesFailed,
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub request_id: Uuid,
    pub schema_version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub status: Status,
    pub sources: Vec<SourceId>,
    pub latency_ms: u64,
}

impl Meta {
    pub fn new(request_id: Uuid, status: Status, sources: Vec<SourceId>, latency_ms: u64) -> Self {
        Self {
            request_id,
            schema_version: SCHEMA_VERSION,
            generated_at: OffsetDateTime::now_utc(),
            status,
            sources,
            latency_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    pub source: Option<SourceId>,
    pub retryable: Option<bool>,
}

impl From<&SourceRejection> for EnvelopeError {
    fn from(rejection: &SourceRejection) -> Self {
        Self {
            code: rejection.code.to_owned(),
            message: rejection.message.clone(),
            source: Some(rejection.source),
            retryable: Some(rejection.retryable),
        }
    }
}

/// `{meta, data, errors}` document printed to stdout.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub meta: Meta,
    pub data: Value,
    pub errors: Vec<EnvelopeError>,
}

pub fn render(envelope: &Envelope, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => print!("{}", render_table(envelope)?),
    }

    Ok(())
}

fn render_table(envelope: &Envelope) -> Result<String, CliError> {
    let mut out = String::new();
    out.push_str(&format!("request_id  : {}\n", envelope.meta.request_id));
    out.push_str(&format!(
        "status      : {}\n",
        serde_json::to_value(envelope.meta.status)?
            .as_str()
            .unwrap_or_default()
    ));
    out.push_str(&format!(
        "sources     : {}\n",
        envelope
            .meta
            .sources
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join(",")
    ));
    out.push_str(&format!("latency_ms  : {}\n", envelope.meta.latency_ms));

    match envelope.data.get("listings").and_then(Value::as_array) {
        Some(listings) => {
            out.push_str(&format!(
                "{:<9} {:>10} {:<6} {:<40} {}\n",
                "SOURCE", "PRICE", "REGION", "TITLE", "URL"
            ));
            for listing in listings {
                out.push_str(&format!(
                    "{:<9} {:>10} {:<6} {:<40} {}\n",
                    field(listing, "source"),
                    field(listing, "price"),
                    field(listing, "region"),
                    truncate(field(listing, "title"), 40),
                    field(listing, "url"),
                ));
            }
        }
        None => {
            out.push_str("data:\n");
            for line in serde_json::to_string_pretty(&envelope.data)?.lines() {
                out.push_str(&format!("  {line}\n"));
            }
        }
    }

    if !envelope.errors.is_empty() {
        out.push_str("errors:\n");
        for error in &envelope.errors {
            let source = error.source.map(SourceId::as_str).unwrap_or("-");
            out.push_str(&format!("  - [{source}] {}: {}\n", error.code, error.message));
        }
    }

    Ok(out)
}

fn field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("-")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut cut = text.chars().take(width.saturating_sub(1)).collect::<String>();
    cut.push('…');
    cut
}

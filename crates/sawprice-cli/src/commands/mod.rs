mod search;
mod sources;

use serde_json::Value;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::{Envelope, EnvelopeError, Meta, Status};

pub struct CommandResult {
    pub request_id: Uuid,
    pub data: Value,
    pub status: Status,
    pub sources: Vec<sawprice_core::SourceId>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            data,
            status: Status::Ok,
            sources: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
        }
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let result = match &cli.command {
        Command::Search(args) => search::run(args).await?,
        Command::Sources => sources::run()?,
    };

    Ok(Envelope {
        meta: Meta::new(
            result.request_id,
            result.status,
            result.sources,
            result.latency_ms,
        ),
        data: result.data,
        errors: result.errors,
    })
}

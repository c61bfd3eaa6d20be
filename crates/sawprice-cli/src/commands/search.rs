use std::time::Instant;

use serde::Serialize;

use sawprice_core::{
    AggregateResult, AggregateStatus, Listing, LocationFilter, OrchestratorBuilder, RegionCode,
    RetrievalError, SourceId,
};

use crate::cli::SearchArgs;
use crate::error::CliError;
use crate::output::{EnvelopeError, Status};

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SearchResponseData<'a> {
    query: &'a str,
    region_filter: Option<&'a RegionCode>,
    sources_attempted: usize,
    sources_succeeded: usize,
    listings: &'a [Listing],
}

pub async fn run(args: &SearchArgs) -> Result<CommandResult, CliError> {
    let started = Instant::now();

    let mut builder = OrchestratorBuilder::from_env()?;
    if args.mock {
        builder = builder.with_mock_mode();
    }
    if let Some(renderer) = args.renderer {
        builder = builder.with_renderer(renderer.into());
    }
    if !args.sources.is_empty() {
        builder = builder.with_only_sources(args.sources.iter().copied().map(SourceId::from));
    }
    let orchestrator = builder.build()?;
    tracing::debug!(sources = ?orchestrator.sources(), mock = args.mock, "orchestrator ready");

    let location = LocationFilter::new(args.city.clone(), args.region.clone());
    let location = (location.city.is_some() || location.region.is_some()).then_some(location);

    match orchestrator
        .retrieve_listings(&args.query, location.as_ref())
        .await
    {
        Ok(aggregate) => from_aggregate(&args.query, &aggregate, orchestrator.sources()),
        Err(RetrievalError::InvalidInput(error)) => Err(CliError::Validation(error)),
        Err(RetrievalError::AllSourcesFailed {
            request_id,
            sources_attempted,
            rejections,
        }) => {
            let data = serde_json::to_value(SearchResponseData {
                query: args.query.trim(),
                region_filter: None,
                sources_attempted,
                sources_succeeded: 0,
                listings: &[],
            })?;
            Ok(CommandResult {
                request_id,
                data,
                status: Status::AllSourcesFailed,
                sources: orchestrator.sources(),
                errors: rejections.iter().map(EnvelopeError::from).collect(),
                latency_ms: started.elapsed().as_millis() as u64,
            })
        }
    }
}

fn from_aggregate(
    query: &str,
    aggregate: &AggregateResult,
    sources: Vec<SourceId>,
) -> Result<CommandResult, CliError> {
    let data = serde_json::to_value(SearchResponseData {
        query: query.trim(),
        region_filter: aggregate.region_filter.as_ref(),
        sources_attempted: aggregate.sources_attempted,
        sources_succeeded: aggregate.sources_succeeded,
        listings: &aggregate.listings,
    })?;

    Ok(CommandResult {
        request_id: aggregate.request_id,
        data,
        status: match aggregate.status() {
            AggregateStatus::Populated => Status::Populated,
            AggregateStatus::Empty => Status::Empty,
        },
        sources,
        errors: aggregate.rejections.iter().map(EnvelopeError::from).collect(),
        latency_ms: aggregate.latency_ms,
    })
}

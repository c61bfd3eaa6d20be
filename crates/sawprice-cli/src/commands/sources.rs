use serde::Serialize;

use sawprice_core::adapters::profile;
use sawprice_core::{ReadinessPolicy, SourceId};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SourceInfo {
    id: SourceId,
    name: &'static str,
    base_url: &'static str,
    native_region: bool,
    readiness: String,
    scroll_expansion: bool,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceInfo>,
}

pub fn run() -> Result<CommandResult, CliError> {
    let sources = SourceId::ALL
        .into_iter()
        .map(|id| {
            let profile = profile(id);
            SourceInfo {
                id,
                name: id.display_name(),
                base_url: profile.base_url,
                native_region: profile.native_region,
                readiness: match profile.readiness {
                    ReadinessPolicy::Marker(selector) => format!("marker {selector}"),
                    ReadinessPolicy::Settle => String::from("settle pause"),
                },
                scroll_expansion: profile.expand_results,
            }
        })
        .collect::<Vec<_>>();

    let mut result = CommandResult::ok(serde_json::to_value(SourcesResponseData { sources })?);
    result.sources = SourceId::ALL.to_vec();
    Ok(result)
}

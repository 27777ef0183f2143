use pestquote_core::config::AppConfig;
use pestquote_core::{ApplicationError, LeadGateway};
use tracing::info;

use crate::commands::{build_gateway, build_runtime, CommandResult};

const COMMAND: &str = "pricing";

/// Fetches and prints a partner's pricing rules. Unlike `quote`, a failed fetch is reported.
pub fn run(config: &AppConfig, partner: Option<&str>) -> CommandResult {
    let partner_id = match config.partner_id(partner) {
        Ok(partner_id) => partner_id,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2);
        }
    };
    let gateway = match build_gateway(COMMAND, config) {
        Ok(gateway) => gateway,
        Err(result) => return result,
    };
    let runtime = match build_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let pricing = match runtime.block_on(gateway.fetch_pricing(&partner_id)) {
        Ok(pricing) => pricing,
        Err(error) => {
            return CommandResult::from_application_error(
                COMMAND,
                ApplicationError::from(error),
                "unassigned",
                None,
            );
        }
    };

    info!(
        event_name = "cli.pricing.fetched",
        partner_id = partner_id.0.as_str(),
        rule_count = pricing.rules.len(),
        "pricing fetched"
    );

    let message = format!(
        "{} pricing rule(s) and {} pest type(s) for partner {}",
        pricing.rules.len(),
        pricing.available_pests.len(),
        partner_id.0
    );
    match serde_json::to_value(&pricing) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 6),
    }
}

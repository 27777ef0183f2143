use clap::Args;
use pestquote_client::HttpLeadGateway;
use pestquote_core::config::AppConfig;
use pestquote_core::{FieldInput, IntakeError, IntakeSession, SessionContext};
use serde_json::json;

use crate::commands::{build_gateway, build_runtime, CommandResult};

const COMMAND: &str = "quote";

#[derive(Clone, Debug, Default, Args)]
pub struct QuoteArgs {
    #[arg(long, help = "Partner id; falls back to intake.default_partner_id")]
    pub partner: Option<String>,
    #[arg(long, help = "Pest type key; defaults to the partner's first offered pest")]
    pub pest: Option<String>,
    #[arg(long, help = "Object type key, e.g. apartment or house")]
    pub object: Option<String>,
    #[arg(long, help = "Room count, only used for apartments")]
    pub rooms: Option<u8>,
}

impl QuoteArgs {
    pub(crate) fn apply(&self, session: &mut IntakeSession) -> Result<(), IntakeError> {
        if let Some(pest) = &self.pest {
            session.set_field(FieldInput::PestType(pest.clone()))?;
        }
        if let Some(object) = &self.object {
            session.set_field(FieldInput::ObjectType(object.clone()))?;
        }
        if self.rooms.is_some() {
            session.set_field(FieldInput::Rooms(self.rooms))?;
        }
        Ok(())
    }
}

pub(crate) fn mount_session(
    command: &str,
    config: &AppConfig,
    partner: Option<&str>,
) -> Result<(IntakeSession, HttpLeadGateway, tokio::runtime::Runtime), CommandResult> {
    let partner_id = config.partner_id(partner).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), 2)
    })?;
    let gateway = build_gateway(command, config)?;
    let runtime = build_runtime(command)?;
    let session = runtime.block_on(IntakeSession::mount(
        &gateway,
        partner_id,
        config.intake.source.clone(),
        SessionContext::new(),
    ));
    Ok((session, gateway, runtime))
}

/// Prices a lead without submitting it. Pricing outages resolve to a price of 0.
pub fn run(config: &AppConfig, args: &QuoteArgs) -> CommandResult {
    let (mut session, _gateway, _runtime) =
        match mount_session(COMMAND, config, args.partner.as_deref()) {
            Ok(mounted) => mounted,
            Err(result) => return result,
        };

    if let Err(error) = args.apply(&mut session) {
        let correlation_id = session.correlation_id().to_owned();
        return CommandResult::from_application_error(
            COMMAND,
            error.into(),
            &correlation_id,
            None,
        );
    }

    let Some(draft) = session.draft() else {
        return CommandResult::failure(COMMAND, "internal", "draft is not editable", 6);
    };
    let estimate = session.price_estimate();
    let rooms = draft.object_type.is_apartment().then_some(draft.rooms).flatten();
    let data = json!({
        "partner_id": session.partner_id().0,
        "partner_name": session.partner().map(|partner| partner.name.clone()),
        "pest_type": draft.pest_type.0,
        "object_type": draft.object_type.0,
        "rooms": rooms,
        "variant": estimate.variant.as_ref().map(ToString::to_string),
        "approx_price": estimate.amount,
        "matched_rule": estimate.matched_rule,
        "rule_count": session.pricing().rules().len(),
    });

    let subject = if draft.object_type.is_apartment() {
        format!("{} in an apartment", draft.pest_type.0)
    } else {
        format!("{} in {}", draft.pest_type.0, draft.object_type.0)
    };
    CommandResult::success_with_data(
        COMMAND,
        format!("approx price for {subject}: {}", estimate.amount),
        Some(data),
    )
}

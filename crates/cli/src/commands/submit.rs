use clap::Args;
use pestquote_core::config::AppConfig;
use pestquote_core::{FieldInput, FormStep, IntakeError, IntakeSession, LeadField, SubmitOutcome};
use serde_json::json;
use tracing::info;

use crate::commands::quote::{mount_session, QuoteArgs};
use crate::commands::CommandResult;

const COMMAND: &str = "submit";

#[derive(Clone, Debug, Default, Args)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub quote: QuoteArgs,
    #[arg(long, help = "Infestation level: low, medium or high")]
    pub infestation: Option<String>,
    #[arg(long, help = "Earlier treatment: none, self_treated or professional")]
    pub previous_treatment: Option<String>,
    #[arg(long, help = "Contact phone, 10 to 15 digits")]
    pub phone: String,
    #[arg(long, help = "Contact name")]
    pub name: String,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long, help = "Preferred visit date (YYYY-MM-DD)")]
    pub date: Option<String>,
    #[arg(long)]
    pub comment: Option<String>,
}

impl SubmitArgs {
    fn apply(&self, session: &mut IntakeSession) -> Result<(), IntakeError> {
        self.quote.apply(session)?;

        let optional = [
            (LeadField::Infestation, self.infestation.as_deref()),
            (LeadField::PreviousTreatment, self.previous_treatment.as_deref()),
            (LeadField::Address, self.address.as_deref()),
            (LeadField::ExpectedDate, self.date.as_deref()),
            (LeadField::ClientComment, self.comment.as_deref()),
        ];
        for (field, raw) in optional {
            if let Some(raw) = raw {
                session.set_field(FieldInput::parse(field, raw)?)?;
            }
        }
        session.set_field(FieldInput::Phone(self.phone.trim().to_owned()))?;
        session.set_field(FieldInput::Name(self.name.trim().to_owned()))?;
        Ok(())
    }
}

/// Walks the form to the contact step and posts the lead once.
pub fn run(config: &AppConfig, args: &SubmitArgs) -> CommandResult {
    let token = match config.csrf_token() {
        Ok(token) => token,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2);
        }
    };
    let (mut session, gateway, runtime) =
        match mount_session(COMMAND, config, args.quote.partner.as_deref()) {
            Ok(mounted) => mounted,
            Err(result) => return result,
        };

    let prepared = args.apply(&mut session).and_then(|()| {
        while session.step() != FormStep::Contact {
            session.next()?;
        }
        Ok(())
    });
    if let Err(error) = prepared {
        return failure(&session, error);
    }

    match runtime.block_on(session.submit(&gateway, &token)) {
        Ok(SubmitOutcome::Submitted(lead_id)) => {
            info!(
                event_name = "cli.submit.completed",
                correlation_id = session.correlation_id(),
                lead_id = lead_id.0.as_str(),
                "lead submitted"
            );
            let data = json!({
                "lead_id": lead_id.0,
                "partner_id": session.partner_id().0,
                "partner_name": session.context().partner_name(),
                "approx_price": session.approx_price(),
                "step": session.step().index(),
            });
            CommandResult::success_with_data(
                COMMAND,
                format!("lead {} created", lead_id.0),
                Some(data),
            )
        }
        Ok(SubmitOutcome::AlreadyInFlight) => failure(&session, IntakeError::SubmissionInFlight),
        Err(error) => failure(&session, error),
    }
}

fn failure(session: &IntakeSession, error: IntakeError) -> CommandResult {
    let data = json!({
        "step": session.step().index(),
        "last_error": session.last_error(),
        "invalid_fields": session.validation().field_names(),
    });
    CommandResult::from_application_error(
        COMMAND,
        error.into(),
        session.correlation_id(),
        Some(data),
    )
}

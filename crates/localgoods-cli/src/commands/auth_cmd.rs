use crate::auth::clear_stored_session;
use crate::cli::AuthCommands;
use crate::commands::common::CliContext;
use crate::commands::sync::format_report;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, ctx: &CliContext) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            let auth = ctx.require_auth()?;
            let session = auth.sign_in(&email, &password).await?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!("Signed in as {email_label}");

            ctx.sessions.set_session(Some(session));
            match ctx.smart.reconcile().await {
                Ok(report) => println!("{}", format_report(&report)),
                Err(error) => tracing::warn!("Sync after sign-in skipped: {}", error),
            }
            Ok(())
        }
        AuthCommands::Status => {
            if let Some(session) = ctx.current_session() {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Signed in as {} (expires_at={})",
                    email_label, session.expires_at
                );
            } else {
                println!("Not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            match (ctx.auth.as_ref(), ctx.current_session()) {
                (Some(auth), Some(session)) => auth.sign_out(&session).await?,
                _ => clear_stored_session()?,
            }
            ctx.sessions.set_session(None);
            println!("Signed out. Saved items stay on this device.");
            Ok(())
        }
    }
}

use crate::cli::ViewCommands;
use crate::commands::common::{
    normalize_listing_id, print_saved_items, snapshot_from_args, CliContext,
};
use crate::error::CliError;

pub async fn run_view(command: ViewCommands, ctx: &CliContext) -> Result<(), CliError> {
    match command {
        ViewCommands::Add {
            listing_id,
            snapshot,
        } => {
            let listing_id = normalize_listing_id(&listing_id)?;
            ctx.smart
                .add_recent_view(&listing_id, snapshot_from_args(snapshot))
                .await?;
            Ok(())
        }
        ViewCommands::List { limit, json } => print_saved_items(
            &ctx.smart.recent_views(),
            limit,
            json,
            "Nothing viewed recently.",
        ),
        ViewCommands::Clear => {
            ctx.smart.clear_recent_views().await;
            Ok(())
        }
    }
}

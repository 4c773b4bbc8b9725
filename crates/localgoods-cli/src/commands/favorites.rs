use crate::cli::FavoriteCommands;
use crate::commands::common::{
    normalize_listing_id, print_saved_items, snapshot_from_args, CliContext,
};
use crate::error::CliError;

pub async fn run_favorite(command: FavoriteCommands, ctx: &CliContext) -> Result<(), CliError> {
    match command {
        FavoriteCommands::Add {
            listing_id,
            snapshot,
        } => {
            let listing_id = normalize_listing_id(&listing_id)?;
            let item = ctx
                .smart
                .add_favorite(&listing_id, snapshot_from_args(snapshot))
                .await?;
            println!("{}", item.id);
            Ok(())
        }
        FavoriteCommands::Remove { listing_id } => {
            let listing_id = normalize_listing_id(&listing_id)?;
            if !ctx.smart.remove_favorite(&listing_id).await {
                println!("{listing_id} is not in your favorites");
            }
            Ok(())
        }
        FavoriteCommands::List { limit, json } => print_saved_items(
            &ctx.smart.favorites(),
            limit,
            json,
            "No favorites yet.",
        ),
    }
}

use serde::Serialize;

use crate::commands::common::CliContext;
use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub backend_configured: bool,
    pub signed_in_as: Option<String>,
    pub favorites: usize,
    pub recent_views: usize,
    pub unsynced: usize,
    pub pending_removals: usize,
    pub has_pending_sync: bool,
}

pub fn collect_status(ctx: &CliContext) -> StatusReport {
    let favorites = ctx.smart.favorites();
    let recent_views = ctx.smart.recent_views();
    let unsynced = favorites
        .iter()
        .chain(&recent_views)
        .filter(|item| !item.synced)
        .count();
    let signed_in_as = ctx.current_session().map(|session| {
        session
            .user
            .email
            .clone()
            .unwrap_or_else(|| session.user.id.clone())
    });

    StatusReport {
        backend_configured: ctx.backend.is_some(),
        signed_in_as,
        favorites: favorites.len(),
        recent_views: recent_views.len(),
        unsynced,
        pending_removals: ctx.smart.pending_ops().len(),
        has_pending_sync: ctx.smart.has_pending_sync(),
    }
}

pub fn format_status_lines(status: &StatusReport) -> Vec<String> {
    let account = match (&status.signed_in_as, status.backend_configured) {
        (Some(user), _) => format!("signed in as {user}"),
        (None, true) => "not signed in".to_string(),
        (None, false) => "local only (no backend configured)".to_string(),
    };
    let sync = if status.has_pending_sync {
        format!(
            "{} unsynced item(s), {} pending removal(s)",
            status.unsynced, status.pending_removals
        )
    } else {
        "everything synced".to_string()
    };

    vec![
        format!("Account:         {account}"),
        format!("Favorites:       {}", status.favorites),
        format!("Recently viewed: {}", status.recent_views),
        format!("Sync:            {sync}"),
    ]
}

pub fn run_status(as_json: bool, ctx: &CliContext) -> Result<(), CliError> {
    let status = collect_status(ctx);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in format_status_lines(&status) {
            println!("{line}");
        }
    }
    Ok(())
}

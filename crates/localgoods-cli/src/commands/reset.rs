use crate::commands::common::CliContext;
use crate::error::CliError;

pub fn run_reset(confirmed: bool, ctx: &CliContext) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ResetNotConfirmed);
    }

    ctx.smart.reset_local_data();
    println!("Local saved items deleted. Items already synced stay in your account.");
    Ok(())
}

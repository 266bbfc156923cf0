use crate::cli::{Cli, Command};
use crate::commands;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(cli: Cli) -> AppResult<()> {
    let Cli {
        profile,
        json,
        verbose: _,
        command,
    } = cli;

    let ctx = AppContext::bootstrap(profile, json)?;

    match command {
        Command::Auth(args) => commands::auth::run(&ctx, args.command).await,
        Command::Polls(args) => commands::polls::run(&ctx, args.command).await,
        Command::Stake(args) => commands::stake::run(&ctx, args).await,
        Command::Me => commands::me::run(&ctx).await,
        Command::Run => commands::run::run(&ctx).await,
    }
}

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "showcall",
    version,
    about = "Showcall prediction polls command line client"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "default",
        help = "Profile name to use"
    )]
    pub profile: String,
    #[arg(long, global = true, help = "Emit JSON output")]
    pub json: bool,
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Verbose logging")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Auth(AuthArgs),
    Polls(PollsArgs),
    Stake(StakeArgs),
    /// Show the logged-in profile and balance
    Me,
    /// Keep the session fresh until interrupted
    Run,
}

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    Login(LoginArgs),
    Status,
    Refresh,
    Logout,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long, help = "Access token issued by the identity provider")]
    pub access_token: Option<String>,
    #[arg(long, help = "Refresh token issued alongside the access token")]
    pub refresh_token: Option<String>,
    #[arg(long, help = "Read a token pair as JSON from stdin")]
    pub stdin: bool,
}

#[derive(Debug, Args)]
pub struct PollsArgs {
    #[command(subcommand)]
    pub command: PollsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PollsCommand {
    Ls(PollsLsArgs),
    Get(PollsGetArgs),
}

#[derive(Debug, Args)]
pub struct PollsLsArgs {
    #[arg(long, default_value_t = 20, help = "Maximum polls to return")]
    pub limit: u32,
    #[arg(long, help = "Filter by poll status (open, closed, settled)")]
    pub status: Option<String>,
}

#[derive(Debug, Args)]
pub struct PollsGetArgs {
    #[arg(help = "Poll id")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct StakeArgs {
    #[arg(help = "Poll id")]
    pub poll_id: String,
    #[arg(help = "Option id to back")]
    pub option_id: String,
    #[arg(help = "Stablecoin amount to stake, e.g. 5.00")]
    pub amount: String,
}

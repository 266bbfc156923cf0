use crate::api::models::PollView;
use crate::cli::{PollsCommand, PollsGetArgs, PollsLsArgs};
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(ctx: &AppContext, command: PollsCommand) -> AppResult<()> {
    match command {
        PollsCommand::Ls(args) => ls(ctx, &args).await,
        PollsCommand::Get(args) => get(ctx, &args).await,
    }
}

async fn ls(ctx: &AppContext, args: &PollsLsArgs) -> AppResult<()> {
    let polls = ctx
        .api_client
        .list_polls(args.limit, args.status.as_deref())
        .await?;

    let lines = polls
        .iter()
        .map(|poll| format!("{}  [{}]  {}", poll.id, poll.status, poll.question))
        .collect::<Vec<_>>();

    ctx.output.emit_list(&lines, &polls)
}

async fn get(ctx: &AppContext, args: &PollsGetArgs) -> AppResult<()> {
    let poll = ctx.api_client.get_poll(&args.id).await?;
    ctx.output.emit_list(&describe_poll(&poll), &poll)
}

fn describe_poll(poll: &PollView) -> Vec<String> {
    let mut lines = vec![
        format!("{}  [{}]", poll.id, poll.status),
        poll.question.clone(),
    ];

    if let Some(closes_at) = &poll.closes_at {
        lines.push(format!("closes: {closes_at}"));
    }

    for option in &poll.options {
        let staked = option
            .staked_total
            .as_ref()
            .map(|total| format!("  (staked: {total})"))
            .unwrap_or_default();
        lines.push(format!("  {}  {}{}", option.id, option.label, staked));
    }

    lines
}

use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(ctx: &AppContext) -> AppResult<()> {
    let profile = ctx.api_client.me().await?;

    let name = profile.display_name.as_deref().unwrap_or(profile.id.as_str());
    let text = match &profile.balance {
        Some(balance) => format!("{name}: balance {balance}"),
        None => name.to_string(),
    };

    ctx.output.emit(&text, &profile)
}

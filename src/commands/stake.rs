use crate::cli::StakeArgs;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};

pub async fn run(ctx: &AppContext, args: StakeArgs) -> AppResult<()> {
    validate_amount(&args.amount)?;

    let receipt = ctx
        .api_client
        .place_stake(&args.poll_id, &args.option_id, &args.amount)
        .await?;

    let text = format!(
        "staked {} on {} in poll {} (receipt {})",
        receipt.amount, receipt.option_id, receipt.poll_id, receipt.id
    );
    ctx.output.emit(&text, &receipt)
}

// Amounts travel as decimal strings; the parse here is only a sanity check
// before the backend sees the request.
fn validate_amount(amount: &str) -> AppResult<()> {
    let parsed = amount
        .parse::<f64>()
        .map_err(|_| AppError::InvalidInput(format!("`{amount}` is not a decimal amount")))?;

    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "stake amount must be positive, got `{amount}`"
        )));
    }

    Ok(())
}

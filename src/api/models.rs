use serde::{Deserialize, Serialize};

/// All backend responses wrap their payload in a `data` envelope.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub display_name: Option<String>,
    /// Stablecoin balance as a decimal string.
    pub balance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: String,
    pub question: String,
    pub status: String,
    pub closes_at: Option<String>,
    #[serde(default)]
    pub options: Vec<PollOptionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionView {
    pub id: String,
    pub label: String,
    pub staked_total: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeReceipt {
    pub id: String,
    pub poll_id: String,
    pub option_id: String,
    pub amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeRequest<'a> {
    pub option_id: &'a str,
    pub amount: &'a str,
}

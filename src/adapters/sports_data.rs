// Sports-data provider integration
// Resolves finished games into pick results and quotes market prices

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SportsDataConfig;
use crate::domain::{BetType, Pick, PickResult, ScoreInfo};
use crate::error::{PickguardError, Result};

/// Final outcome of a pick as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOutcome {
    pub result: PickResult,
    #[serde(default)]
    pub score_info: Option<ScoreInfo>,
    /// Closing price for the same selection, used for CLV
    #[serde(default)]
    pub closing_odds_american: Option<i64>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SportsDataProvider: Send + Sync {
    /// Outcome of the pick's game(s); `None` while the game is not final
    async fn resolve_pick(&self, pick: &Pick) -> Result<Option<ResolvedOutcome>>;

    /// Current market price for the pick's selection, if the provider quotes one
    async fn market_odds(&self, pick: &Pick) -> Result<Option<i64>>;
}

/// Lookup key sent to the provider for a pick or leg
#[derive(Debug, Clone, Serialize)]
struct SelectionQuery<'a> {
    sport: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    league: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    game_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    game: Option<&'a str>,
    bet_type: BetType,
    selection: &'a str,
}

#[derive(Debug, Serialize)]
struct ResolveRequest<'a> {
    #[serde(flatten)]
    pick: SelectionQuery<'a>,
    legs: Vec<SelectionQuery<'a>>,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    #[serde(rename = "final")]
    is_final: bool,
    #[serde(default)]
    result: Option<PickResult>,
    #[serde(default)]
    score_info: Option<ScoreInfo>,
    #[serde(default)]
    closing_odds_american: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MarketOddsResponse {
    #[serde(default)]
    odds_american: Option<i64>,
}

/// JSON-over-HTTP provider client
pub struct HttpSportsData {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSportsData {
    pub fn new(config: &SportsDataConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                PickguardError::Internal("sports_data.base_url not configured".into())
            })?
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn query_for(pick: &Pick) -> SelectionQuery<'_> {
        SelectionQuery {
            sport: &pick.sport,
            league: pick.league.as_deref(),
            game_id: pick.game.id.as_deref(),
            game: pick.game.description.as_deref(),
            bet_type: pick.bet_type,
            selection: &pick.selection,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        }
    }
}

#[async_trait]
impl SportsDataProvider for HttpSportsData {
    async fn resolve_pick(&self, pick: &Pick) -> Result<Option<ResolvedOutcome>> {
        let url = format!("{}/v1/resolve", self.base_url);
        let body = ResolveRequest {
            pick: Self::query_for(pick),
            legs: pick
                .legs
                .iter()
                .map(|leg| SelectionQuery {
                    sport: &leg.sport,
                    league: leg.league.as_deref(),
                    game_id: leg.game.id.as_deref(),
                    game: leg.game.description.as_deref(),
                    bet_type: leg.bet_type,
                    selection: &leg.selection,
                })
                .collect(),
        };

        debug!(pick_id = %pick.id, "Resolving pick outcome");
        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PickguardError::Internal(format!(
                "sports data resolve failed ({}): {}",
                status, text
            )));
        }

        let parsed: ResolveResponse = response.json().await?;
        if !parsed.is_final {
            return Ok(None);
        }

        match parsed.result {
            Some(PickResult::Pending) | None => {
                warn!(pick_id = %pick.id, "Provider marked game final without a result");
                Ok(None)
            }
            Some(result) => Ok(Some(ResolvedOutcome {
                result,
                score_info: parsed.score_info,
                closing_odds_american: parsed.closing_odds_american,
            })),
        }
    }

    async fn market_odds(&self, pick: &Pick) -> Result<Option<i64>> {
        let url = format!("{}/v1/odds", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .query(&Self::query_for(pick))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PickguardError::Internal(format!(
                "sports data odds lookup failed ({}): {}",
                status, text
            )));
        }

        let parsed: MarketOddsResponse = response.json().await?;
        Ok(parsed.odds_american)
    }
}

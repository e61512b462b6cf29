use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::FacebookConfig;
use crate::models::{
    ad_graph_params, AdResult, AdSetResult, AdSetSpec, AdSpec, AdStatus, BillingEvent,
    CallToAction, CampaignObjective, CampaignResult, CampaignSpec, CampaignSummary, CreativeSpec,
    Interest, LaunchOutcome, OptimizationGoal, Targeting,
};

pub const DEFAULT_LAUNCH_DELAY: Duration = Duration::from_secs(2);

/// Marketing API (Graph) client for building campaigns on the ads account
#[derive(Debug, Clone)]
pub struct FacebookAdsClient {
    client: Client,
    config: FacebookConfig,
}

impl FacebookAdsClient {
    pub fn new(config: FacebookConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    fn access_token(&self) -> Result<&str> {
        self.config
            .access_token
            .as_deref()
            .context("FACEBOOK_ACCESS_TOKEN is not configured")
    }

    fn page_id(&self) -> Result<&str> {
        self.config
            .page_id
            .as_deref()
            .context("FACEBOOK_PAGE_ID is not configured")
    }

    fn account_url(&self, edge: &str) -> Result<String> {
        let account = self
            .config
            .ad_account_id
            .as_deref()
            .context("FACEBOOK_AD_ACCOUNT_ID is not configured")?;
        let account = account.strip_prefix("act_").unwrap_or(account);

        Ok(format!(
            "{}/{}/act_{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version,
            account,
            edge
        ))
    }

    /// Create a campaign and everything below it.
    ///
    /// A failing campaign call aborts; failing ad sets, creatives and ads are
    /// recorded in `errors` and the rest continues. Nothing is rolled back.
    pub async fn create_campaign(&self, spec: &CampaignSpec) -> Result<CampaignResult> {
        if let Err(reason) = spec.validate() {
            anyhow::bail!(reason);
        }
        let page_id = self.page_id()?.to_string();

        let campaign_id = self
            .post_edge("campaigns", spec.to_graph())
            .await
            .with_context(|| format!("Failed to create campaign '{}'", spec.name))?;
        info!("Created campaign '{}' ({})", spec.name, campaign_id);

        let mut result = CampaignResult {
            name: spec.name.clone(),
            campaign_id: campaign_id.clone(),
            ..Default::default()
        };

        for ad_set in &spec.ad_sets {
            let mut ad_set_result = AdSetResult {
                name: ad_set.name.clone(),
                ..Default::default()
            };

            match self
                .post_edge("adsets", ad_set.to_graph(&campaign_id, spec.status))
                .await
            {
                Ok(ad_set_id) => {
                    info!("Created ad set '{}' ({})", ad_set.name, ad_set_id);
                    for ad in &ad_set.ads {
                        let ad_result = self
                            .create_ad(ad, &ad_set_id, &page_id, spec.status, &mut result.errors)
                            .await;
                        ad_set_result.ads.push(ad_result);
                    }
                    ad_set_result.ad_set_id = Some(ad_set_id);
                }
                Err(e) => {
                    warn!("Ad set '{}' failed: {:#}", ad_set.name, e);
                    result.errors.push(format!("ad set '{}': {:#}", ad_set.name, e));
                }
            }

            result.ad_sets.push(ad_set_result);
        }

        Ok(result)
    }

    async fn create_ad(
        &self,
        ad: &AdSpec,
        ad_set_id: &str,
        page_id: &str,
        status: AdStatus,
        errors: &mut Vec<String>,
    ) -> AdResult {
        let mut ad_result = AdResult {
            name: ad.name.clone(),
            ..Default::default()
        };

        let creative_id = match self.post_edge("adcreatives", ad.creative.to_graph(page_id)).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Creative '{}' failed: {:#}", ad.creative.name, e);
                errors.push(format!("creative '{}': {:#}", ad.creative.name, e));
                return ad_result;
            }
        };
        ad_result.creative_id = Some(creative_id.clone());

        match self
            .post_edge("ads", ad_graph_params(&ad.name, ad_set_id, &creative_id, status))
            .await
        {
            Ok(ad_id) => ad_result.ad_id = Some(ad_id),
            Err(e) => {
                warn!("Ad '{}' failed: {:#}", ad.name, e);
                errors.push(format!("ad '{}': {:#}", ad.name, e));
            }
        }

        ad_result
    }

    /// Create campaigns one by one with `delay` between consecutive calls
    pub async fn launch_sequence(&self, specs: &[CampaignSpec], delay: Duration) -> Vec<LaunchOutcome> {
        let mut outcomes = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(delay).await;
            }

            info!("Launching campaign {}/{}: {}", index + 1, specs.len(), spec.name);
            let outcome = match self.create_campaign(spec).await {
                Ok(result) => LaunchOutcome {
                    name: spec.name.clone(),
                    result: Some(result),
                    error: None,
                },
                Err(e) => {
                    error!("Campaign '{}' failed: {:#}", spec.name, e);
                    LaunchOutcome {
                        name: spec.name.clone(),
                        result: None,
                        error: Some(format!("{:#}", e)),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    pub async fn list_campaigns(&self) -> Result<Vec<CampaignSummary>> {
        let response = self
            .client
            .get(self.account_url("campaigns")?)
            .query(&[
                ("fields", "id,name,status,objective,daily_budget,created_time"),
                ("limit", "100"),
                ("access_token", self.access_token()?),
            ])
            .send()
            .await
            .context("Failed to fetch campaigns")?;

        let body = graph_body(response).await?;
        let list: GraphList<CampaignSummary> =
            serde_json::from_value(body).context("Failed to parse campaign list")?;

        Ok(list.data)
    }

    async fn post_edge(&self, edge: &str, mut params: Value) -> Result<String> {
        params["access_token"] = Value::String(self.access_token()?.to_string());

        let response = self
            .client
            .post(self.account_url(edge)?)
            .json(&params)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", edge))?;

        let body = graph_body(response).await?;
        let created: GraphId = serde_json::from_value(body)
            .with_context(|| format!("Unexpected {} response", edge))?;

        Ok(created.id)
    }
}

/// Turn a Graph response into its JSON body, surfacing the Graph error message on failure
async fn graph_body(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .context("Failed to read Graph API response")?;

    if !status.is_success() {
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        error!("Graph API request failed: {} - {}", status, body);
        anyhow::bail!("Graph API {}: {}", status, message);
    }

    Ok(body)
}

#[derive(Debug, Deserialize)]
struct GraphId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GraphList<T> {
    data: Vec<T>,
}

fn prelaunch_targeting(age_min: u8, age_max: u8) -> Targeting {
    Targeting {
        countries: vec!["NL".to_string(), "BE".to_string()],
        age_min,
        age_max,
        genders: vec![1],
        interests: vec![
            Interest {
                id: "6003384248805".to_string(),
                name: "Fitness".to_string(),
            },
            Interest {
                id: "6003107902433".to_string(),
                name: "Bodybuilding".to_string(),
            },
            Interest {
                id: "6003277229526".to_string(),
                name: "Personal development".to_string(),
            },
        ],
        publisher_platforms: vec!["facebook".to_string(), "instagram".to_string()],
    }
}

fn prelaunch_campaign(
    name: &str,
    objective: CampaignObjective,
    optimization_goal: OptimizationGoal,
    daily_budget_cents: i64,
    age: (u8, u8),
    creative: CreativeSpec,
) -> CampaignSpec {
    CampaignSpec {
        name: name.to_string(),
        objective,
        status: AdStatus::Paused,
        special_ad_categories: vec![],
        ad_sets: vec![AdSetSpec {
            name: format!("{} - NL/BE men {}-{}", name, age.0, age.1),
            daily_budget_cents,
            start_time: None,
            end_time: None,
            optimization_goal,
            billing_event: BillingEvent::Impressions,
            targeting: prelaunch_targeting(age.0, age.1),
            ads: vec![AdSpec {
                name: format!("{} - Ad", name),
                creative,
            }],
        }],
    }
}

/// The four prelaunch campaigns, created paused so they can be reviewed before going live
pub fn prelaunch_campaigns(landing_url: &str) -> Vec<CampaignSpec> {
    let creative = |name: &str, message: &str, headline: &str, cta: CallToAction| CreativeSpec {
        name: name.to_string(),
        link: landing_url.to_string(),
        message: message.to_string(),
        headline: headline.to_string(),
        description: None,
        image_url: None,
        call_to_action: cta,
    };

    vec![
        prelaunch_campaign(
            "Prelaunch - Awareness",
            CampaignObjective::OutcomeAwareness,
            OptimizationGoal::Reach,
            1_500,
            (25, 55),
            creative(
                "Awareness creative",
                "Most men settle. Top Tier Men don't. The platform opens soon.",
                "Become a Top Tier Man",
                CallToAction::LearnMore,
            ),
        ),
        prelaunch_campaign(
            "Prelaunch - Traffic",
            CampaignObjective::OutcomeTraffic,
            OptimizationGoal::LandingPageViews,
            2_500,
            (25, 45),
            creative(
                "Traffic creative",
                "Training, nutrition and a brotherhood that keeps you accountable.",
                "See what's inside",
                CallToAction::LearnMore,
            ),
        ),
        prelaunch_campaign(
            "Prelaunch - Leads",
            CampaignObjective::OutcomeLeads,
            OptimizationGoal::LeadGeneration,
            3_000,
            (25, 45),
            creative(
                "Leads creative",
                "Join the waiting list and get first access to the prelaunch packages.",
                "Get early access",
                CallToAction::SignUp,
            ),
        ),
        prelaunch_campaign(
            "Prelaunch - Founder Offer",
            CampaignObjective::OutcomeSales,
            OptimizationGoal::OffsiteConversions,
            5_000,
            (28, 55),
            creative(
                "Founder creative",
                "Founder spots are limited. Lock in lifetime founder pricing today.",
                "Claim your founder spot",
                CallToAction::GetOffer,
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(account: &str) -> FacebookAdsClient {
        FacebookAdsClient::new(FacebookConfig {
            access_token: Some("token".to_string()),
            ad_account_id: Some(account.to_string()),
            page_id: Some("page".to_string()),
            api_version: "v19.0".to_string(),
            base_url: "https://graph.facebook.com/".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_prelaunch_templates_are_valid() {
        let campaigns = prelaunch_campaigns("https://toptiermen.eu/prelaunch");
        assert_eq!(campaigns.len(), 4);
        for campaign in &campaigns {
            assert!(campaign.validate().is_ok(), "{} is invalid", campaign.name);
            assert_eq!(campaign.status, AdStatus::Paused);
        }
    }

    #[test]
    fn test_account_url_normalises_prefix() {
        assert_eq!(
            client("act_123").account_url("campaigns").unwrap(),
            "https://graph.facebook.com/v19.0/act_123/campaigns"
        );
        assert_eq!(
            client("123").account_url("adsets").unwrap(),
            "https://graph.facebook.com/v19.0/act_123/adsets"
        );
    }

    #[tokio::test]
    async fn test_invalid_spec_is_rejected_before_any_call() {
        let mut spec = prelaunch_campaigns("https://toptiermen.eu").remove(0);
        spec.ad_sets[0].targeting.countries.clear();

        let err = client("1").create_campaign(&spec).await.unwrap_err();
        assert!(err.to_string().contains("country"));
    }
}

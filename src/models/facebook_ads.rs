use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Minimum daily budget the ads platform accepts, in account currency cents
pub const MIN_DAILY_BUDGET_CENTS: i64 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignObjective {
    OutcomeAwareness,
    OutcomeTraffic,
    OutcomeEngagement,
    OutcomeLeads,
    OutcomeSales,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdStatus {
    Active,
    #[default]
    Paused,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationGoal {
    LinkClicks,
    LandingPageViews,
    LeadGeneration,
    OffsiteConversions,
    Reach,
    ThruPlay,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingEvent {
    #[default]
    Impressions,
    LinkClicks,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallToAction {
    LearnMore,
    SignUp,
    ShopNow,
    Subscribe,
    GetOffer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interest {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Targeting {
    pub countries: Vec<String>,
    pub age_min: u8,
    pub age_max: u8,
    /// 1 = men, 2 = women; empty means everyone
    #[serde(default)]
    pub genders: Vec<u8>,
    #[serde(default)]
    pub interests: Vec<Interest>,
    #[serde(default)]
    pub publisher_platforms: Vec<String>,
}

impl Targeting {
    pub fn to_graph(&self) -> Value {
        let mut targeting = json!({
            "geo_locations": { "countries": self.countries },
            "age_min": self.age_min,
            "age_max": self.age_max,
        });

        if !self.genders.is_empty() {
            targeting["genders"] = json!(self.genders);
        }
        if !self.interests.is_empty() {
            targeting["flexible_spec"] = json!([{ "interests": self.interests }]);
        }
        if !self.publisher_platforms.is_empty() {
            targeting["publisher_platforms"] = json!(self.publisher_platforms);
        }

        targeting
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreativeSpec {
    pub name: String,
    pub link: String,
    pub message: String,
    pub headline: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub call_to_action: CallToAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdSpec {
    pub name: String,
    pub creative: CreativeSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdSetSpec {
    pub name: String,
    pub daily_budget_cents: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub optimization_goal: OptimizationGoal,
    #[serde(default)]
    pub billing_event: BillingEvent,
    pub targeting: Targeting,
    pub ads: Vec<AdSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignSpec {
    pub name: String,
    pub objective: CampaignObjective,
    #[serde(default)]
    pub status: AdStatus,
    #[serde(default)]
    pub special_ad_categories: Vec<String>,
    pub ad_sets: Vec<AdSetSpec>,
}

impl CampaignSpec {
    /// Checks the ads platform would reject anyway, done before any call is made
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Campaign name is required".to_string());
        }
        if self.ad_sets.is_empty() {
            return Err(format!("Campaign '{}' has no ad sets", self.name));
        }

        for ad_set in &self.ad_sets {
            if ad_set.daily_budget_cents < MIN_DAILY_BUDGET_CENTS {
                return Err(format!(
                    "Ad set '{}' daily budget must be at least {} cents",
                    ad_set.name, MIN_DAILY_BUDGET_CENTS
                ));
            }
            let targeting = &ad_set.targeting;
            if targeting.countries.is_empty() {
                return Err(format!("Ad set '{}' must target at least one country", ad_set.name));
            }
            if targeting.age_min < 18 || targeting.age_max > 65 || targeting.age_min > targeting.age_max {
                return Err(format!("Ad set '{}' age range must be within 18-65", ad_set.name));
            }
            if let (Some(start), Some(end)) = (ad_set.start_time, ad_set.end_time) {
                if end <= start {
                    return Err(format!("Ad set '{}' must end after it starts", ad_set.name));
                }
            }
            if ad_set.ads.is_empty() {
                return Err(format!("Ad set '{}' has no ads", ad_set.name));
            }
        }

        Ok(())
    }

    pub fn to_graph(&self) -> Value {
        json!({
            "name": self.name,
            "objective": self.objective,
            "status": self.status,
            "special_ad_categories": self.special_ad_categories,
        })
    }
}

impl AdSetSpec {
    pub fn to_graph(&self, campaign_id: &str, status: AdStatus) -> Value {
        let mut params = json!({
            "name": self.name,
            "campaign_id": campaign_id,
            "daily_budget": self.daily_budget_cents,
            "billing_event": self.billing_event,
            "optimization_goal": self.optimization_goal,
            "bid_strategy": "LOWEST_COST_WITHOUT_CAP",
            "targeting": self.targeting.to_graph(),
            "status": status,
        });

        if let Some(start) = self.start_time {
            params["start_time"] = json!(start.to_rfc3339());
        }
        if let Some(end) = self.end_time {
            params["end_time"] = json!(end.to_rfc3339());
        }

        params
    }
}

impl CreativeSpec {
    pub fn to_graph(&self, page_id: &str) -> Value {
        let mut link_data = json!({
            "link": self.link,
            "message": self.message,
            "name": self.headline,
            "call_to_action": {
                "type": self.call_to_action,
                "value": { "link": self.link },
            },
        });

        if let Some(description) = &self.description {
            link_data["description"] = json!(description);
        }
        if let Some(image_url) = &self.image_url {
            link_data["picture"] = json!(image_url);
        }

        json!({
            "name": self.name,
            "object_story_spec": {
                "page_id": page_id,
                "link_data": link_data,
            },
        })
    }
}

pub fn ad_graph_params(name: &str, ad_set_id: &str, creative_id: &str, status: AdStatus) -> Value {
    json!({
        "name": name,
        "adset_id": ad_set_id,
        "creative": { "creative_id": creative_id },
        "status": status,
    })
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AdResult {
    pub name: String,
    pub creative_id: Option<String>,
    pub ad_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AdSetResult {
    pub name: String,
    pub ad_set_id: Option<String>,
    pub ads: Vec<AdResult>,
}

/// Ids created for one campaign. `errors` lists the pieces that failed.
#[derive(Debug, Clone, Serialize, Default)]
pub struct CampaignResult {
    pub name: String,
    pub campaign_id: String,
    pub ad_sets: Vec<AdSetResult>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaunchOutcome {
    pub name: String,
    pub result: Option<CampaignResult>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LaunchRequest {
    pub campaigns: Vec<CampaignSpec>,
    pub delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub daily_budget: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
}

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info};

use crate::config::YouTubeConfig;
use crate::models::{CampaignPerformance, DataSource, PerformanceReport, VideoPage, VideoRecord};

const MAX_RESULTS_LIMIT: u32 = 50;
const MOCK_PAGES: u32 = 3;

/// YouTube Data API v3 and Google Ads reporting for the marketing dashboard.
///
/// Without credentials every call answers with deterministic mock data so the
/// dashboard can be developed offline.
#[derive(Debug, Clone)]
pub struct YouTubeAdsClient {
    client: Client,
    config: YouTubeConfig,
}

impl YouTubeAdsClient {
    pub fn new(config: YouTubeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn videos_are_mocked(&self) -> bool {
        self.config.api_key.is_none()
    }

    pub fn performance_is_mocked(&self) -> bool {
        self.config.access_token.is_none()
            || self.config.developer_token.is_none()
            || self.config.customer_id.is_none()
    }

    /// Latest uploads of a channel, one page at a time
    pub async fn search_channel_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<VideoPage> {
        let max_results = max_results.clamp(1, MAX_RESULTS_LIMIT);

        let Some(api_key) = self.config.api_key.as_deref() else {
            return Ok(mock_video_page(channel_id, page_token, max_results));
        };

        let max_results_param = max_results.to_string();
        let mut params = vec![
            ("part", "id"),
            ("channelId", channel_id),
            ("type", "video"),
            ("order", "date"),
            ("maxResults", max_results_param.as_str()),
            ("key", api_key),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let search: SearchResponse = self
            .get_json(&format!("{}/youtube/v3/search", self.config.youtube_base_url), &params)
            .await
            .context("YouTube search request failed")?;

        let ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect();

        let videos = if ids.is_empty() {
            Vec::new()
        } else {
            let joined = ids.join(",");
            let details: VideosResponse = self
                .get_json(
                    &format!("{}/youtube/v3/videos", self.config.youtube_base_url),
                    &[("part", "snippet,statistics"), ("id", joined.as_str()), ("key", api_key)],
                )
                .await
                .context("YouTube videos request failed")?;

            // The videos endpoint does not guarantee the search order
            let mut by_id: BTreeMap<String, VideoItem> =
                details.items.into_iter().map(|item| (item.id.clone(), item)).collect();
            ids.iter()
                .filter_map(|id| by_id.remove(id))
                .map(VideoItem::into_record)
                .collect()
        };

        info!("Fetched {} videos for channel {}", videos.len(), channel_id);

        Ok(VideoPage {
            videos,
            next_page_token: search.next_page_token,
            total_results: search.page_info.and_then(|info| info.total_results),
            source: DataSource::Live,
        })
    }

    /// Video campaign metrics between two dates (inclusive), one row per campaign
    pub async fn campaign_performance(&self, start: NaiveDate, end: NaiveDate) -> Result<PerformanceReport> {
        if end < start {
            anyhow::bail!("end date {} is before start date {}", end, start);
        }

        let (Some(access_token), Some(developer_token), Some(customer_id)) = (
            self.config.access_token.as_deref(),
            self.config.developer_token.as_deref(),
            self.config.customer_id.as_deref(),
        ) else {
            return Ok(PerformanceReport::new(
                start,
                end,
                mock_campaign_performance(start, end),
                DataSource::Mock,
            ));
        };

        let url = format!(
            "{}/customers/{}/googleAds:searchStream",
            self.config.ads_base_url, customer_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header("developer-token", developer_token)
            .json(&serde_json::json!({ "query": performance_query(start, end) }))
            .send()
            .await
            .context("Failed to send Google Ads request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Google Ads searchStream failed: {} - {}", status, error_text);
            anyhow::bail!("Failed to fetch campaign performance: {}", status);
        }

        let batches = response
            .json::<Vec<SearchStreamBatch>>()
            .await
            .context("Failed to parse Google Ads response")?;

        let campaigns = aggregate_rows(batches.into_iter().flat_map(|batch| batch.results));

        Ok(PerformanceReport::new(start, end, campaigns, DataSource::Live))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str, params: &[(&str, &str)]) -> Result<T> {
        let mut request = self.client.get(url).query(params);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("YouTube request to {} failed: {} - {}", url, status, error_text);
            anyhow::bail!("YouTube API returned {}", status);
        }

        response.json::<T>().await.context("Failed to parse YouTube response")
    }
}

/// GAQL for video campaigns in a date range
pub fn performance_query(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT campaign.id, campaign.name, campaign.status, metrics.impressions, \
         metrics.video_views, metrics.clicks, metrics.cost_micros \
         FROM campaign \
         WHERE campaign.advertising_channel_type = 'VIDEO' \
         AND segments.date BETWEEN '{}' AND '{}'",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}

/// Rows come back per campaign per day; fold them into one row per campaign
fn aggregate_rows(rows: impl Iterator<Item = AdsRow>) -> Vec<CampaignPerformance> {
    let mut campaigns: BTreeMap<String, CampaignPerformance> = BTreeMap::new();

    for row in rows {
        let entry = campaigns
            .entry(row.campaign.id.clone())
            .or_insert_with(|| CampaignPerformance {
                campaign_id: row.campaign.id.clone(),
                name: row.campaign.name.clone(),
                status: row.campaign.status.clone(),
                impressions: 0,
                views: 0,
                clicks: 0,
                cost_micros: 0,
                view_rate: 0.0,
                average_cpv_micros: 0,
            });
        entry.impressions += row.metrics.impressions;
        entry.views += row.metrics.video_views;
        entry.clicks += row.metrics.clicks;
        entry.cost_micros += row.metrics.cost_micros;
    }

    campaigns
        .into_values()
        .map(CampaignPerformance::with_derived_metrics)
        .collect()
}

/// FNV-1a, stable across builds so mock data stays the same between releases
fn mock_seed(parts: &[&str]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for part in parts {
        for byte in part.bytes().chain(std::iter::once(0x1f)) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    hash
}

const MOCK_TITLES: [&str; 8] = [
    "5 Habits of Top Tier Men",
    "Full Push Day Workout",
    "How I Cut 10kg Without Losing Strength",
    "Morning Routine for Discipline",
    "Meal Prep for the Week",
    "Brotherhood Q&A",
    "Beginner Strength Program Explained",
    "Why Most Men Quit the Gym",
];

/// Deterministic fake uploads. Pages past the last mock page are empty.
pub fn mock_video_page(channel_id: &str, page_token: Option<&str>, max_results: u32) -> VideoPage {
    let max_results = max_results.min(MAX_RESULTS_LIMIT);
    let page: u32 = page_token
        .and_then(|token| token.strip_prefix("mock-page-"))
        .and_then(|n| n.parse().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(1);
    let mut rng = StdRng::seed_from_u64(mock_seed(&[channel_id, &page.to_string(), &max_results.to_string()]));

    let base_date = DateTime::parse_from_rfc3339("2024-06-01T18:00:00Z")
        .map(|dt| dt.with_timezone(&Utc))
        .ok();

    let page_size = if page <= MOCK_PAGES { max_results } else { 0 };
    let videos = (0..page_size)
        .map(|i| {
            let index = (page - 1) * max_results + i;
            let views: u64 = rng.gen_range(500..250_000);
            VideoRecord {
                video_id: format!("mock{:08x}", mock_seed(&[channel_id, &index.to_string()]) as u32),
                title: MOCK_TITLES[rng.gen_range(0..MOCK_TITLES.len())].to_string(),
                description: "Mock video generated without YouTube credentials".to_string(),
                published_at: base_date
                    .and_then(|d| d.checked_sub_signed(ChronoDuration::days(i64::from(index) * 3))),
                thumbnail_url: None,
                view_count: views,
                like_count: views / rng.gen_range(20..60),
                comment_count: views / rng.gen_range(150..400),
            }
        })
        .collect();

    VideoPage {
        videos,
        next_page_token: (page < MOCK_PAGES).then(|| format!("mock-page-{}", page + 1)),
        total_results: Some(u64::from(MOCK_PAGES * max_results)),
        source: DataSource::Mock,
    }
}

const MOCK_CAMPAIGNS: [&str; 4] = [
    "Prelaunch - Awareness",
    "Prelaunch - Retargeting Viewers",
    "Prelaunch - Founder Offer",
    "Evergreen - Brotherhood",
];

pub fn mock_campaign_performance(start: NaiveDate, end: NaiveDate) -> Vec<CampaignPerformance> {
    let days = (end - start).num_days() as u64 + 1;
    let start_text = start.to_string();
    let end_text = end.to_string();
    let mut rng = StdRng::seed_from_u64(mock_seed(&[&start_text, &end_text]));

    MOCK_CAMPAIGNS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let impressions = days * rng.gen_range(2_000..12_000);
            let views = impressions * rng.gen_range(15..40) / 100;
            CampaignPerformance {
                campaign_id: format!("{}", 20_000_000 + i as u64),
                name: name.to_string(),
                status: "ENABLED".to_string(),
                impressions,
                views,
                clicks: views * rng.gen_range(1..6) / 100,
                cost_micros: views * rng.gen_range(10_000..40_000),
                view_rate: 0.0,
                average_cpv_micros: 0,
            }
            .with_derived_metrics()
        })
        .collect()
}

/// Google's JSON encodes int64 as strings; accept both
fn u64_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    page_info: Option<PageInfo>,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

impl VideoItem {
    fn into_record(self) -> VideoRecord {
        let thumbnails = self.snippet.thumbnails;
        let thumbnail_url = thumbnails
            .high
            .or(thumbnails.medium)
            .or(thumbnails.default)
            .map(|t| t.url);

        VideoRecord {
            video_id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            published_at: self.snippet.published_at,
            thumbnail_url,
            view_count: self.statistics.view_count,
            like_count: self.statistics.like_count,
            comment_count: self.statistics.comment_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// Counters are missing when the channel hides them
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    #[serde(default, deserialize_with = "u64_from_string_or_number")]
    view_count: u64,
    #[serde(default, deserialize_with = "u64_from_string_or_number")]
    like_count: u64,
    #[serde(default, deserialize_with = "u64_from_string_or_number")]
    comment_count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchStreamBatch {
    #[serde(default)]
    results: Vec<AdsRow>,
}

#[derive(Debug, Deserialize)]
struct AdsRow {
    campaign: AdsCampaign,
    #[serde(default)]
    metrics: AdsMetrics,
}

#[derive(Debug, Deserialize)]
struct AdsCampaign {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdsMetrics {
    #[serde(default, deserialize_with = "u64_from_string_or_number")]
    impressions: u64,
    #[serde(default, deserialize_with = "u64_from_string_or_number")]
    video_views: u64,
    #[serde(default, deserialize_with = "u64_from_string_or_number")]
    clicks: u64,
    #[serde(default, deserialize_with = "u64_from_string_or_number")]
    cost_micros: u64,
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where a marketing payload came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Mock,
}

/// Flat video row used by the marketing dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoPage {
    pub videos: Vec<VideoRecord>,
    pub next_page_token: Option<String>,
    pub total_results: Option<u64>,
    pub source: DataSource,
}

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    pub channel_id: String,
    pub page_token: Option<String>,
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignPerformance {
    pub campaign_id: String,
    pub name: String,
    pub status: String,
    pub impressions: u64,
    pub views: u64,
    pub clicks: u64,
    pub cost_micros: u64,
    pub view_rate: f64,
    /// Average cost per view in micros
    pub average_cpv_micros: u64,
}

impl CampaignPerformance {
    /// Fill the derived ratios from the raw counters
    pub fn with_derived_metrics(mut self) -> Self {
        self.view_rate = if self.impressions > 0 {
            self.views as f64 / self.impressions as f64
        } else {
            0.0
        };
        self.average_cpv_micros = if self.views > 0 {
            self.cost_micros / self.views
        } else {
            0
        };
        self
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct PerformanceTotals {
    pub impressions: u64,
    pub views: u64,
    pub clicks: u64,
    pub cost_micros: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub campaigns: Vec<CampaignPerformance>,
    pub totals: PerformanceTotals,
    pub source: DataSource,
}

impl PerformanceReport {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        campaigns: Vec<CampaignPerformance>,
        source: DataSource,
    ) -> Self {
        let totals = campaigns.iter().fold(PerformanceTotals::default(), |mut acc, c| {
            acc.impressions += c.impressions;
            acc.views += c.views;
            acc.clicks += c.clicks;
            acc.cost_micros += c.cost_micros;
            acc
        });

        Self {
            start_date,
            end_date,
            campaigns,
            totals,
            source,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(impressions: u64, views: u64, cost: u64) -> CampaignPerformance {
        CampaignPerformance {
            campaign_id: "1".to_string(),
            name: "Prelaunch".to_string(),
            status: "ENABLED".to_string(),
            impressions,
            views,
            clicks: 3,
            cost_micros: cost,
            view_rate: 0.0,
            average_cpv_micros: 0,
        }
        .with_derived_metrics()
    }

    #[test]
    fn test_derived_metrics() {
        let c = campaign(1_000, 250, 5_000_000);
        assert_eq!(c.view_rate, 0.25);
        assert_eq!(c.average_cpv_micros, 20_000);

        let empty = campaign(0, 0, 0);
        assert_eq!(empty.view_rate, 0.0);
        assert_eq!(empty.average_cpv_micros, 0);
    }

    #[test]
    fn test_report_totals() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let report = PerformanceReport::new(
            day,
            day,
            vec![campaign(100, 10, 1_000), campaign(200, 30, 2_000)],
            DataSource::Mock,
        );

        assert_eq!(
            report.totals,
            PerformanceTotals {
                impressions: 300,
                views: 40,
                clicks: 6,
                cost_micros: 3_000
            }
        );
    }
}

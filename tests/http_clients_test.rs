// Third-party API wrappers against wiremock servers

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use toptier::config::{FacebookConfig, MollieConfig, YouTubeConfig};
use toptier::models::{DataSource, PaymentStatus};
use toptier::services::{prelaunch_campaigns, FacebookAdsClient, MollieClient, NewPayment, YouTubeAdsClient};

fn mollie(server: &MockServer) -> MollieClient {
    MollieClient::new(&MollieConfig {
        api_key: Some("test_key".to_string()),
        base_url: server.uri(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_mollie_create_payment() {
    let server = MockServer::start().await;
    let package_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/v2/payments"))
        .and(header("authorization", "Bearer test_key"))
        .and(body_partial_json(json!({
            "amount": { "currency": "EUR", "value": "197.00" },
            "webhookUrl": "https://toptiermen.eu/api/webhooks/mollie",
            "metadata": { "package_id": package_id },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "resource": "payment",
            "id": "tr_WDqYK6vllg",
            "status": "open",
            "amount": { "currency": "EUR", "value": "197.00" },
            "_links": {
                "checkout": { "href": "https://www.mollie.com/checkout/select-method/WDqYK6vllg" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payment = mollie(&server)
        .create_payment(&NewPayment {
            package_id,
            amount_cents: 19_700,
            currency: "EUR".to_string(),
            description: "Top Tier Elite prelaunch package".to_string(),
            redirect_url: "https://toptiermen.eu/prelaunch/thank-you".to_string(),
            webhook_url: "https://toptiermen.eu/api/webhooks/mollie".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(payment.id, "tr_WDqYK6vllg");
    assert_eq!(payment.status, PaymentStatus::Open);
    assert_eq!(
        payment.checkout_url(),
        Some("https://www.mollie.com/checkout/select-method/WDqYK6vllg")
    );
}

#[tokio::test]
async fn test_mollie_create_payment_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/payments"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "status": 422,
            "title": "Unprocessable Entity",
            "detail": "The amount is lower than the minimum"
        })))
        .mount(&server)
        .await;

    let err = mollie(&server)
        .create_payment(&NewPayment {
            package_id: Uuid::new_v4(),
            amount_cents: 1,
            currency: "EUR".to_string(),
            description: "too cheap".to_string(),
            redirect_url: "https://toptiermen.eu".to_string(),
            webhook_url: "https://toptiermen.eu/api/webhooks/mollie".to_string(),
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("422"));
}

#[tokio::test]
async fn test_mollie_get_payment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/payments/tr_paid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "tr_paid",
            "status": "paid",
            "amount": { "currency": "EUR", "value": "97.00" },
            "paidAt": "2024-03-01T10:15:00+00:00",
            "_links": {}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/payments/tr_missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = mollie(&server);

    let paid = client.get_payment("tr_paid").await.unwrap().unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert!(paid.paid_at.is_some());
    assert_eq!(paid.checkout_url(), None);

    assert!(client.get_payment("tr_missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_mollie_without_api_key_fails_before_sending() {
    let client = MollieClient::new(&MollieConfig {
        api_key: None,
        base_url: "http://127.0.0.1:9".to_string(),
    })
    .unwrap();

    let err = client.get_payment("tr_x").await.unwrap_err();
    assert!(err.to_string().contains("MOLLIE_API_KEY"));
}

fn youtube(server: &MockServer) -> YouTubeAdsClient {
    YouTubeAdsClient::new(YouTubeConfig {
        api_key: Some("yt_key".to_string()),
        access_token: Some("ya29.token".to_string()),
        developer_token: Some("dev_token".to_string()),
        customer_id: Some("1234567890".to_string()),
        youtube_base_url: server.uri(),
        ads_base_url: server.uri(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_youtube_search_then_videos() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .and(query_param("channelId", "UCtoptier"))
        .and(query_param("type", "video"))
        .and(query_param("order", "date"))
        .and(query_param("pageToken", "CAUQAA"))
        .and(query_param("key", "yt_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nextPageToken": "CAoQAA",
            "pageInfo": { "totalResults": 42 },
            "items": [
                { "id": { "kind": "youtube#video", "videoId": "vid_b" } },
                { "id": { "kind": "youtube#video", "videoId": "vid_a" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .and(query_param("id", "vid_b,vid_a"))
        .and(query_param("part", "snippet,statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "vid_a",
                    "snippet": {
                        "title": "Full Push Day Workout",
                        "description": "Chest, shoulders, triceps",
                        "publishedAt": "2024-02-10T18:00:00Z",
                        "thumbnails": { "default": { "url": "https://i.ytimg.com/vi/vid_a/default.jpg" } }
                    },
                    "statistics": { "viewCount": "1520", "likeCount": "88" }
                },
                {
                    "id": "vid_b",
                    "snippet": {
                        "title": "Morning Routine for Discipline",
                        "publishedAt": "2024-02-12T06:00:00Z",
                        "thumbnails": {
                            "default": { "url": "https://i.ytimg.com/vi/vid_b/default.jpg" },
                            "high": { "url": "https://i.ytimg.com/vi/vid_b/hqdefault.jpg" }
                        }
                    },
                    "statistics": { "viewCount": "310", "likeCount": "25", "commentCount": "4" }
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = youtube(&server)
        .search_channel_videos("UCtoptier", Some("CAUQAA"), 2)
        .await
        .unwrap();

    assert_eq!(page.source, DataSource::Live);
    assert_eq!(page.next_page_token.as_deref(), Some("CAoQAA"));
    assert_eq!(page.total_results, Some(42));

    let ids: Vec<&str> = page.videos.iter().map(|v| v.video_id.as_str()).collect();
    assert_eq!(ids, vec!["vid_b", "vid_a"]);

    assert_eq!(
        page.videos[0].thumbnail_url.as_deref(),
        Some("https://i.ytimg.com/vi/vid_b/hqdefault.jpg")
    );
    assert_eq!(page.videos[0].comment_count, 4);
    assert_eq!(page.videos[1].view_count, 1520);
    assert_eq!(page.videos[1].comment_count, 0);
}

#[tokio::test]
async fn test_google_ads_rows_are_aggregated_per_campaign() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/customers/1234567890/googleAds:searchStream"))
        .and(header("developer-token", "dev_token"))
        .and(header("authorization", "Bearer ya29.token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "results": [
                    {
                        "campaign": { "id": "11", "name": "Prelaunch Awareness", "status": "ENABLED" },
                        "metrics": { "impressions": "1000", "videoViews": "250", "clicks": "12", "costMicros": "5000000" }
                    },
                    {
                        "campaign": { "id": "11", "name": "Prelaunch Awareness", "status": "ENABLED" },
                        "metrics": { "impressions": "1000", "videoViews": "150", "clicks": "8", "costMicros": "3000000" }
                    }
                ]
            },
            {
                "results": [
                    {
                        "campaign": { "id": "22", "name": "Retargeting", "status": "PAUSED" },
                        "metrics": { "impressions": "0" }
                    }
                ]
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
    let report = youtube(&server).campaign_performance(start, end).await.unwrap();

    assert_eq!(report.source, DataSource::Live);
    assert_eq!(report.campaigns.len(), 2);

    let awareness = &report.campaigns[0];
    assert_eq!(awareness.campaign_id, "11");
    assert_eq!(awareness.impressions, 2000);
    assert_eq!(awareness.views, 400);
    assert_eq!(awareness.clicks, 20);
    assert_eq!(awareness.cost_micros, 8_000_000);
    assert!((awareness.view_rate - 0.2).abs() < 1e-9);
    assert_eq!(awareness.average_cpv_micros, 20_000);

    let retargeting = &report.campaigns[1];
    assert_eq!(retargeting.views, 0);
    assert_eq!(retargeting.view_rate, 0.0);
}

#[tokio::test]
async fn test_youtube_without_credentials_is_mocked() {
    let client = YouTubeAdsClient::new(YouTubeConfig::default()).unwrap();
    assert!(client.videos_are_mocked());
    assert!(client.performance_is_mocked());

    let first = client.search_channel_videos("UCtoptier", None, 5).await.unwrap();
    let again = client.search_channel_videos("UCtoptier", None, 5).await.unwrap();

    assert_eq!(first.source, DataSource::Mock);
    assert_eq!(first.videos, again.videos);
    assert_eq!(first.videos.len(), 5);
}

fn facebook(server: &MockServer) -> FacebookAdsClient {
    FacebookAdsClient::new(FacebookConfig {
        access_token: Some("fb_token".to_string()),
        ad_account_id: Some("act_42".to_string()),
        page_id: Some("1001".to_string()),
        api_version: "v19.0".to_string(),
        base_url: server.uri(),
    })
    .unwrap()
}

async fn mount_created(server: &MockServer, edge: &str, id: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/v19.0/act_42/{}", edge)))
        .and(body_partial_json(json!({ "access_token": "fb_token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_facebook_campaign_with_failing_ad() {
    let server = MockServer::start().await;

    mount_created(&server, "campaigns", "120200000000001").await;
    mount_created(&server, "adsets", "120200000000002").await;
    mount_created(&server, "adcreatives", "120200000000003").await;

    Mock::given(method("POST"))
        .and(path("/v19.0/act_42/ads"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Invalid parameter", "type": "OAuthException", "code": 100 }
        })))
        .mount(&server)
        .await;

    let spec = prelaunch_campaigns("https://toptiermen.eu/prelaunch").remove(0);
    let result = facebook(&server).create_campaign(&spec).await.unwrap();

    assert_eq!(result.campaign_id, "120200000000001");
    assert_eq!(result.ad_sets.len(), 1);
    assert_eq!(result.ad_sets[0].ad_set_id.as_deref(), Some("120200000000002"));

    let ad = &result.ad_sets[0].ads[0];
    assert_eq!(ad.creative_id.as_deref(), Some("120200000000003"));
    assert_eq!(ad.ad_id, None);

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("Invalid parameter"));
}

#[tokio::test]
async fn test_facebook_launch_sequence_reports_each_campaign() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v19.0/act_42/campaigns"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Ad account is disabled" }
        })))
        .expect(4)
        .mount(&server)
        .await;

    let specs = prelaunch_campaigns("https://toptiermen.eu/prelaunch");
    let outcomes = facebook(&server)
        .launch_sequence(&specs, Duration::from_millis(5))
        .await;

    assert_eq!(outcomes.len(), specs.len());
    for (outcome, spec) in outcomes.iter().zip(&specs) {
        assert_eq!(outcome.name, spec.name);
        assert!(outcome.result.is_none());
        assert!(outcome.error.as_deref().unwrap().contains("Ad account is disabled"));
    }
}

#[tokio::test]
async fn test_facebook_list_campaigns() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v19.0/act_42/campaigns"))
        .and(query_param("access_token", "fb_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "1", "name": "Prelaunch - Awareness", "status": "PAUSED", "objective": "OUTCOME_AWARENESS" },
                { "id": "2", "name": "Prelaunch - Leads", "status": "ACTIVE" }
            ],
            "paging": { "cursors": { "before": "a", "after": "b" } }
        })))
        .mount(&server)
        .await;

    let campaigns = facebook(&server).list_campaigns().await.unwrap();

    assert_eq!(campaigns.len(), 2);
    assert_eq!(campaigns[0].objective.as_deref(), Some("OUTCOME_AWARENESS"));
    assert_eq!(campaigns[1].objective, None);
}

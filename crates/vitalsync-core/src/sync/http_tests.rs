//! Tests for the HTTP remote store against a local mock server.

#[cfg(test)]
mod tests {
    use super::super::http::*;
    use crate::error::ConfigError;
    use crate::storage::RemoteConfig;
    use crate::sync::remote::RemoteStore;
    use crate::sync::types::SyncError;
    use crate::health::HealthDataType;
    use chrono::NaiveDate;
    use mockito::Matcher;

    fn store(base_url: &str, token: Option<&str>) -> HttpRemoteStore {
        HttpRemoteStore::from_config(&RemoteConfig {
            base_url: base_url.to_string(),
            api_token: token.map(str::to_string),
            ..RemoteConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_upload_posts_body_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/healthkit/sync")
            .match_header("authorization", "Bearer secret")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({"device_id": "vitalsync-a"})))
            .with_status(200)
            .with_body(
                r#"{"status":"ok","message":"Received 3 records",
                    "received_counts":{"daily_steps":3},"sync_id":"s-1"}"#,
            )
            .create_async()
            .await;

        let result = store(&server.url(), Some("secret"))
            .upload(br#"{"device_id":"vitalsync-a"}"#.to_vec())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.sync_id, "s-1");
        assert_eq!(result.received(HealthDataType::Steps), 3);
    }

    #[tokio::test]
    async fn test_non_success_status_maps_to_server_error_with_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/healthkit/sync")
            .with_status(500)
            .with_body(r#"{"detail":"Failed to save sync data: disk full"}"#)
            .create_async()
            .await;

        let err = store(&server.url(), None).upload(b"{}".to_vec()).await.unwrap_err();
        assert_eq!(
            err,
            SyncError::ServerError {
                status: 500,
                message: "Failed to save sync data: disk full".into()
            }
        );
    }

    #[tokio::test]
    async fn test_undecodable_body_maps_to_decoding_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/me")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = store(&server.url(), None).me().await.unwrap_err();
        assert!(matches!(err, SyncError::DecodingFailed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_maps_to_network_error() {
        let err = store("http://127.0.0.1:1", None).me().await.unwrap_err();
        assert!(matches!(err, SyncError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_fetch_trend_sends_day_range() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/lifestyle/summary/vitalsync-a")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start".into(), "2024-01-01".into()),
                Matcher::UrlEncoded("end".into(), "2024-01-07".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"device_id":"vitalsync-a","start":"2024-01-01","end":"2024-01-07",
                    "days":[{"date":"2024-01-07","steps":8000,"workout_energy_kcal":310.5,
                             "workout_count":1,"sleep_hours":7.25,"diet_intake_kcal":1900.0,
                             "diet_entry_count":3,"net_kcal":1589.5}],
                    "totals":{"steps":8000},"warnings":[]}"#,
            )
            .create_async()
            .await;

        let summary = store(&server.url(), None)
            .fetch_trend(
                "vitalsync-a",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        let today = summary.day("2024-01-07").unwrap();
        assert_eq!(today.steps, 8000);
        assert_eq!(today.sleep_hours, 7.25);
        assert!(summary.day("2024-01-06").is_none());
    }

    #[tokio::test]
    async fn test_missing_exercise_plan_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/plans/exercise/u-1")
            .with_status(404)
            .with_body(r#"{"detail":"No confirmed plan"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/plans/exercise/u-2")
            .with_status(200)
            .with_body(r#"{"plan_id":"p-9","summary":"3x weekly zone 2","sessions":[]}"#)
            .create_async()
            .await;

        let remote = store(&server.url(), None);
        assert_eq!(remote.exercise_plan("u-1").await.unwrap(), None);
        let plan = remote.exercise_plan("u-2").await.unwrap().unwrap();
        assert_eq!(plan.plan_id, "p-9");
        assert!(plan.title.is_none());
    }

    #[tokio::test]
    async fn test_sync_history_unwraps_records() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/healthkit/history/vitalsync-a")
            .with_status(200)
            .with_body(
                r#"{"device_id":"vitalsync-a","count":1,"syncs":[{"sync_id":"s-1",
                    "synced_at":"2024-01-02T00:00:00Z","sync_start":"2024-01-01T00:00:00Z",
                    "sync_end":"2024-01-02T00:00:00Z","counts":{"daily_steps":2,"workouts":1}}]}"#,
            )
            .create_async()
            .await;

        let history = store(&server.url(), None).sync_history("vitalsync-a").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total(), 3);
    }

    #[tokio::test]
    async fn test_device_summary_parses_totals() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/healthkit/summary/vitalsync-a")
            .with_status(200)
            .with_body(
                r#"{"device_id":"vitalsync-a","total_syncs":3,
                    "first_sync":"2024-01-01T08:00:00Z","last_sync":"2024-01-03T08:00:00Z",
                    "total_counts":{"daily_steps":21,"heart_rate_samples":140,"workouts":2}}"#,
            )
            .create_async()
            .await;

        let summary = store(&server.url(), None).device_summary("vitalsync-a").await.unwrap();
        assert_eq!(summary.total_syncs, 3);
        assert_eq!(summary.last_sync.as_deref(), Some("2024-01-03T08:00:00Z"));
        assert_eq!(summary.total_counts["heart_rate_samples"], 140);
    }

    #[tokio::test]
    async fn test_device_summary_for_unknown_device_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/healthkit/summary/vitalsync-new")
            .with_status(200)
            .with_body(r#"{"device_id":"vitalsync-new","total_syncs":0}"#)
            .create_async()
            .await;

        let summary = store(&server.url(), None).device_summary("vitalsync-new").await.unwrap();
        assert_eq!(summary.total_syncs, 0);
        assert!(summary.first_sync.is_none());
        assert!(summary.total_counts.is_empty());
    }

    #[test]
    fn test_base_url_with_prefix_keeps_path() {
        let remote = store("https://example.test/backend/", None);
        assert_eq!(remote.base_url().path(), "/backend/");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = HttpRemoteStore::from_config(&RemoteConfig {
            base_url: "mailto:someone@example.test".into(),
            ..RemoteConfig::default()
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}

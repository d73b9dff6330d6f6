use anyhow::Result;
use httpmock::prelude::*;
use httpmock::Method::HEAD;
use serde_json::json;
use std::collections::BTreeSet;
use table_maint::core::loader::{parse_records, read_records_file};
use table_maint::domain::model::RunSummary;
use table_maint::{
    DatastoreSettings, LoadOptions, MaintError, MaintenanceEngine, MaintenancePlan, ResetOptions, RestDatastore,
};
use tempfile::TempDir;

const SENTINEL: &str = "neq.00000000-0000-0000-0000-000000000000";

fn store_for(server: &MockServer) -> RestDatastore {
    RestDatastore::connect(&DatastoreSettings {
        url: server.base_url(),
        api_key: "service-key".to_string(),
        schema: None,
        timeout_seconds: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_reset_and_reload_over_http() -> Result<()> {
    let server = MockServer::start();

    let delete_mock = server.mock(|when, then| {
        when.method(DELETE)
            .path("/rest/v1/exhibitions")
            .query_param("id", SENTINEL);
        then.status(204);
    });
    let count_mock = server.mock(|when, then| {
        when.method(HEAD).path("/rest/v1/exhibitions");
        then.status(200).header("Content-Range", "*/0");
    });
    let insert_a = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/exhibitions")
            .json_body(json!({"title": "A"}));
        then.status(201).json_body(json!([{"id": 101, "title": "A"}]));
    });
    let insert_b = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/exhibitions")
            .json_body(json!({"title": "B"}));
        then.status(201).json_body(json!([{"id": 102, "title": "B"}]));
    });

    let temp_dir = TempDir::new()?;
    let input_path = temp_dir.path().join("exhibitions.json");
    tokio::fs::write(
        &input_path,
        r#"[{"id": "x", "title": "A", "notes": null}, {"title": "B"}]"#,
    )
    .await?;
    let records = read_records_file(&input_path).await?;

    let store = store_for(&server);
    let engine = MaintenanceEngine::new(&store, ResetOptions::default(), LoadOptions::default());
    let report = engine
        .run(MaintenancePlan {
            table: "exhibitions".to_string(),
            reset: true,
            records: Some(records),
            only_indices: None,
        })
        .await?;

    delete_mock.assert();
    count_mock.assert_hits(1);
    insert_a.assert();
    insert_b.assert();

    let state = report.reset.unwrap();
    assert_eq!(state.rows_after, 0);
    assert_eq!(state.rows_before, None);

    let summary = report.load.unwrap();
    assert_eq!((summary.succeeded, summary.failed), (2, 0));
    let ids: Vec<_> = summary.successes.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, vec![Some(json!(101)), Some(json!(102))]);
    Ok(())
}

#[tokio::test]
async fn test_permission_denied_delete_raises_delete_failed() -> Result<()> {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(DELETE).path("/rest/v1/venues");
        then.status(403).json_body(json!({
            "code": "42501",
            "details": null,
            "hint": null,
            "message": "permission denied for table venues"
        }));
    });
    let count_mock = server.mock(|when, then| {
        when.method(HEAD).path("/rest/v1/venues");
        then.status(200).header("Content-Range", "*/8");
    });
    let insert_mock = server.mock(|when, then| {
        when.method(POST).path("/rest/v1/venues");
        then.status(201).json_body(json!([{"id": 1}]));
    });

    let store = store_for(&server);
    let engine = MaintenanceEngine::new(&store, ResetOptions::default(), LoadOptions::default());
    let result = engine
        .run(MaintenancePlan {
            table: "venues".to_string(),
            reset: true,
            records: Some(parse_records(json!([{"name": "Leeum"}]))?),
            only_indices: None,
        })
        .await;

    match result {
        Err(MaintError::DeleteFailed { table, message }) => {
            assert_eq!(table, "venues");
            assert!(message.contains("42501"));
        }
        other => panic!("expected DeleteFailed, got {:?}", other.map(|r| r.reset)),
    }
    count_mock.assert_hits(0);
    insert_mock.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn test_failed_verification_after_accepted_delete() -> Result<()> {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(DELETE).path("/rest/v1/venues");
        then.status(204);
    });
    server.mock(|when, then| {
        when.method(HEAD).path("/rest/v1/venues");
        then.status(503);
    });

    let store = store_for(&server);
    let engine = MaintenanceEngine::new(&store, ResetOptions::default(), LoadOptions::default());
    let result = engine
        .run(MaintenancePlan {
            table: "venues".to_string(),
            reset: true,
            ..MaintenancePlan::default()
        })
        .await;

    let error = result.unwrap_err();
    assert!(matches!(error, MaintError::VerificationFailed { .. }));
    assert_ne!(error.exit_code(), 0);
    Ok(())
}

#[tokio::test]
async fn test_second_of_three_rejected_then_retried_from_summary() -> Result<()> {
    let server = MockServer::start();
    let input = json!([
        {"name": "MMCA Seoul", "city": "Seoul"},
        {"name": "Leeum", "city": "Seoul"},
        {"name": "Busan Museum of Art", "city": "Busan"}
    ]);

    let first = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/venues")
            .json_body(json!({"name": "MMCA Seoul", "city": "Seoul"}));
        then.status(201).json_body(json!([{"id": 1, "name": "MMCA Seoul"}]));
    });
    let mut second = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/venues")
            .json_body(json!({"name": "Leeum", "city": "Seoul"}));
        then.status(409).json_body(json!({
            "code": "23505",
            "details": "Key (name)=(Leeum) already exists.",
            "hint": null,
            "message": "duplicate key value violates unique constraint \"venues_name_key\""
        }));
    });
    let third = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/venues")
            .json_body(json!({"name": "Busan Museum of Art", "city": "Busan"}));
        then.status(201).json_body(json!([{"id": 3, "name": "Busan Museum of Art"}]));
    });

    let store = store_for(&server);
    let engine = MaintenanceEngine::new(&store, ResetOptions::default(), LoadOptions::default());
    let summary = engine
        .run(MaintenancePlan {
            table: "venues".to_string(),
            records: Some(parse_records(input.clone())?),
            ..MaintenancePlan::default()
        })
        .await?
        .load
        .unwrap();

    assert_eq!((summary.succeeded, summary.failed), (2, 1));
    assert_eq!(summary.failures[0].index, 1);
    assert!(summary.failures[0].message.contains("already exists"));
    first.assert_hits(1);
    third.assert_hits(1);

    // The summary is saved, the conflict fixed, and only record 1 re-driven.
    let saved = serde_json::to_string(&summary)?;
    let restored: RunSummary = serde_json::from_str(&saved)?;
    let only: BTreeSet<usize> = restored.failed_indices().into_iter().collect();

    second.delete();
    let retried = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/venues")
            .json_body(json!({"name": "Leeum", "city": "Seoul"}));
        then.status(201).json_body(json!([{"id": 4, "name": "Leeum"}]));
    });

    let rerun = engine
        .run(MaintenancePlan {
            table: "venues".to_string(),
            records: Some(parse_records(input)?),
            only_indices: Some(only),
            ..MaintenancePlan::default()
        })
        .await?
        .load
        .unwrap();

    retried.assert_hits(1);
    first.assert_hits(1);
    third.assert_hits(1);
    assert_eq!((rerun.attempted, rerun.succeeded), (1, 1));
    assert_eq!(rerun.successes[0].index, 1);
    Ok(())
}

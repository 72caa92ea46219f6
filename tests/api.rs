// End-to-end tests driving the router in-process

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use club_attendance::{
    create_router,
    infrastructure::{Collection, MemoryStore},
    AppState, Config,
};

struct TestApp {
    router: Router,
    memory: MemoryStore,
}

impl TestApp {
    fn new() -> Self {
        let memory = MemoryStore::new();
        let state = AppState::with_store(Config::in_memory(), Arc::new(memory.clone()));
        Self {
            router: create_router(state),
            memory,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", "tester");
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_organization(&self, name: &str, rule: &str, max_members: u32) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/organizations",
                Some(json!({
                    "name": name,
                    "type": "club",
                    "maxMembers": max_members,
                    "settings": { "participationRule": rule },
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_member(&self, organization_id: &str, name: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/members",
            Some(json!({
                "name": name,
                "gender": "female",
                "birthYear": 1990,
                "district": "Mapo",
                "organizationId": organization_id,
            })),
        )
        .await
    }

    async fn member_id(&self, organization_id: &str, name: &str) -> String {
        let (status, body) = self.create_member(organization_id, name).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_event(
        &self,
        organization_id: &str,
        host_id: &str,
        date: &str,
        attendees: &[&str],
    ) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/events",
                Some(json!({
                    "organizationId": organization_id,
                    "title": "Weekly meetup",
                    "date": date,
                    "location": "Community hall",
                    "hostId": host_id,
                    "attendees": attendees,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["backend"], "memory");
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/api/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_organization_crud_and_conflict() {
    let app = TestApp::new();
    let id = app.create_organization("Hiking Club", "unlimited", 10).await;

    let (status, body) = app
        .send("POST", "/api/organizations", Some(json!({"name": "Hiking Club"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = app.send("GET", &format!("/api/organizations/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["createdBy"], "tester");
    assert_eq!(body["data"]["settings"]["participationRule"], "unlimited");

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/organizations/{}", id),
            Some(json!({"description": "Mountains every weekend"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "Mountains every weekend");

    let (status, body) = app.send("GET", "/api/organizations?search=hik&limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["hasNext"], false);

    let (status, _) = app.send("GET", "/api/organizations/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app
        .send("POST", "/api/organizations", Some(json!({"name": "X"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = app
        .send(
            "POST",
            "/api/organizations",
            Some(json!({"name": "Valid name", "settings": {"participationRule": "11"}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/api/organizations",
            Some(json!({"name": "Padded rule", "settings": {"participationRule": "05"}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("GET", "/api/members?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send("GET", "/api/organizations?page=18446744073709551615", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = app.send("GET", "/api/members?sortBy=password", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("GET", "/api/events?status=someday", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_member_rules() {
    let app = TestApp::new();
    let org = app.create_organization("Tiny Club", "unlimited", 2).await;

    let kim = app.member_id(&org, "Kim").await;
    let (status, body) = app.create_member(&org, "Kim").await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    app.member_id(&org, "Lee").await;
    let (status, body) = app.create_member(&org, "Park").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "capacity");

    let (_, body) = app.send("GET", &format!("/api/organizations/{}", org), None).await;
    assert_eq!(body["data"]["currentMembers"], 2);

    let (status, body) = app
        .send(
            "PATCH",
            &format!("/api/members/{}/status", kim),
            Some(json!({"status": "inactive"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "inactive");

    let (_, body) = app
        .send("GET", &format!("/api/members?organizationId={}&status=active", org), None)
        .await;
    assert_eq!(body["pagination"]["total"], 1);

    let (status, _) = app.send("DELETE", &format!("/api/members/{}", kim), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send("POST", &format!("/api/organizations/{}/sync-members", org), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currentMembers"], 1);
}

#[tokio::test]
async fn test_attendance_flow() {
    let app = TestApp::new();
    let org = app.create_organization("Hiking Club", "unlimited", 10).await;
    let kim = app.member_id(&org, "Kim").await;
    let lee = app.member_id(&org, "Lee").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/events",
            Some(json!({
                "organizationId": org,
                "title": "Night walk",
                "date": "2024-03-05T19:00:00Z",
                "location": "River park",
                "hostId": kim,
                "maxParticipants": 1,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let event = body["data"]["id"].as_str().unwrap().to_string();
    let attendance = format!("/api/events/{}/attendance", event);

    for _ in 0..2 {
        let (status, body) = app
            .send("POST", &attendance, Some(json!({"memberId": kim, "action": "add"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["currentParticipants"], 1);
    }

    let (status, body) = app
        .send("POST", &attendance, Some(json!({"memberId": lee, "action": "add"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "capacity");

    let (_, body) = app.send("GET", &format!("/api/events/{}", event), None).await;
    assert_eq!(body["data"]["currentParticipants"], 1);
    assert_eq!(body["data"]["attendees"][0]["memberId"], kim.as_str());
    assert_eq!(body["data"]["attendees"][0]["status"], "attended");

    let (status, body) = app
        .send("POST", &attendance, Some(json!({"memberId": kim, "action": "remove"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currentParticipants"], 0);

    let (status, body) = app
        .send(
            "PATCH",
            &format!("/api/events/{}/status", event),
            Some(json!({"status": "completed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = app
        .send(
            "POST",
            "/api/events",
            Some(json!({"organizationId": org, "date": "2024-03-05T19:00:00Z"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn test_cascading_delete_is_atomic() {
    let app = TestApp::new();
    let org = app.create_organization("Book Club", "unlimited", 10).await;
    for name in ["Kim", "Lee", "Park"] {
        app.member_id(&org, name).await;
    }

    app.memory.fail_deletes_in(Collection::Organizations).await;
    let (status, body) = app.send("DELETE", &format!("/api/organizations/{}", org), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "transaction");

    let (_, body) = app
        .send("GET", &format!("/api/members?organizationId={}", org), None)
        .await;
    assert_eq!(body["pagination"]["total"], 3);

    app.memory.clear_failures().await;
    let (status, body) = app.send("DELETE", &format!("/api/organizations/{}", org), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deletedMembers"], 3);

    let (_, body) = app
        .send("GET", &format!("/api/members?organizationId={}", org), None)
        .await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_organization_analytics_scenario() {
    let app = TestApp::new();
    let org = app.create_organization("Hiking Club", "2", 10).await;
    let m = app.member_id(&org, "Kim").await;
    let host = app.member_id(&org, "Lee").await;

    app.create_event(&org, &host, "2024-03-05T10:00:00Z", &[m.as_str()]).await;
    app.create_event(&org, &host, "2024-03-19T10:00:00Z", &[]).await;
    app.create_event(&org, &host, "2024-04-02T10:00:00Z", &[m.as_str()]).await;
    app.create_event(&org, &host, "2024-06-01T10:00:00Z", &[m.as_str()]).await;

    let (status, body) = app
        .send(
            "GET",
            &format!(
                "/api/analytics/organizations/{}?startDate=2024-03-01&endDate=2024-04-30&search=kim",
                org
            ),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let report = &body["data"];
    assert_eq!(report["requiredAttendance"], 4);
    assert_eq!(report["overallStats"]["totalEvents"], 3);

    let rows = report["memberStats"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["attendedEvents"], 2);
    assert_eq!(rows[0]["riskLevel"], "atRisk");
    assert_eq!(rows[0]["deficit"], 2);
    let rate = rows[0]["attendanceRate"].as_f64().unwrap();
    assert!((rate - 66.67).abs() < 0.01);

    let (status, body) = app
        .send(
            "GET",
            &format!("/api/analytics/organizations/{}/members/{}", org, m),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    // attended, missed, attended, attended
    assert_eq!(body["data"]["history"]["maxStreak"], 2);
    assert_eq!(body["data"]["history"]["currentStreak"], 2);
    assert_eq!(body["data"]["history"]["maxMissStreak"], 1);
    assert_eq!(body["data"]["history"]["monthlyAttendance"]["2024-06"], 1);
}

#[tokio::test]
async fn test_analytics_range_validation() {
    let app = TestApp::new();
    let org = app.create_organization("Hiking Club", "1", 10).await;

    let (status, _) = app
        .send(
            "GET",
            &format!("/api/analytics/organizations/{}?startDate=2024-01-01", org),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "GET",
            "/api/analytics/system?startDate=2024-05-01&endDate=2024-01-01",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("GET", "/api/analytics/organizations/missing", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_and_activity_trail() {
    let app = TestApp::new();
    let org = app.create_organization("Hiking Club", "unlimited", 10).await;
    let kim = app.member_id(&org, "Kim").await;
    app.create_event(&org, &kim, "2024-03-05T10:00:00Z", &[kim.as_str()]).await;

    let (status, body) = app.send("GET", "/api/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["totals"]["organizations"], 1);
    assert_eq!(data["totals"]["members"], 1);
    assert_eq!(data["totals"]["events"], 1);
    assert_eq!(data["totals"]["activityLogs"], 3);

    let actions: Vec<&str> = data["recentActivity"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|log| log["action"].as_str())
        .collect();
    assert!(actions.contains(&"organization_created"));
    assert!(actions.contains(&"member_added"));
    assert!(actions.contains(&"event_created"));

    let (_, body) = app
        .send("GET", &format!("/api/activity-logs?organizationId={}", org), None)
        .await;
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["data"][0]["userId"], "tester");

    let (status, body) = app
        .send(
            "POST",
            "/api/activity-logs",
            Some(json!({"organizationId": org, "action": "note", "details": "Rain check"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let log = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.send("DELETE", &format!("/api/activity-logs/{}", log), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send("GET", &format!("/api/activity-logs/{}", log), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_search_narrows_lists_not_totals() {
    let app = TestApp::new();
    let hiking = app.create_organization("Hiking Club", "unlimited", 10).await;
    let books = app.create_organization("Book Circle", "unlimited", 10).await;
    app.member_id(&hiking, "Kim").await;
    app.member_id(&books, "Lee").await;

    let (status, body) = app.send("GET", "/api/dashboard?search=BOOK", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["totals"]["organizations"], 2);
    assert_eq!(data["totals"]["members"], 2);

    let organizations = data["organizations"].as_array().unwrap();
    assert_eq!(organizations.len(), 1);
    assert_eq!(organizations[0]["name"], "Book Circle");
    assert!(data["members"].as_array().unwrap().is_empty());

    let (_, body) = app.send("GET", "/api/dashboard?search=lee", None).await;
    assert_eq!(body["data"]["members"][0]["name"], "Lee");
    assert!(body["data"]["organizations"].as_array().unwrap().is_empty());
}

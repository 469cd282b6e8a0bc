//! Integration tests for bagsbrats-server API

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bagsbrats_server::{
    accounts, create_router, scheduler, GoogleConfig, PasswordCost, ServerConfig, ServerState,
};
use chrono::{Duration, Utc};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        static_dir: "no-such-dir".to_string(),
        jwt_secret: "test-secret".to_string(),
        password_cost: PasswordCost::minimal(),
        pairing_seed: Some(7),
        ..ServerConfig::default()
    }
}

struct TestApp {
    router: Router,
    state: Arc<ServerState>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(test_config())
    }

    fn with_config(config: ServerConfig) -> Self {
        let state = Arc::new(ServerState::new(config).unwrap());
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Status and `Location` header of a redirecting GET
    async fn redirect(&self, uri: &str) -> (StatusCode, Option<String>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        (response.status(), location)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    async fn register(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/register",
            None,
            json!({ "email": email, "password": password, "name": email }),
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, json) = self
            .post("/auth/login", None, json!({ "email": email, "password": password }))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed for {}: {}", email, json);
        json["access_token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.register("admin@example.com", "secret").await;
        self.state
            .store
            .mutate(|db| accounts::promote_to_admin(db, "admin@example.com"))
            .await
            .unwrap();
        self.login("admin@example.com", "secret").await
    }

    /// Admin token plus an open tournament with manual check-in and the seeded roster
    async fn tournament_ready(&self) -> String {
        let admin = self.admin_token().await;
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let (status, _) = self
            .post(
                "/tournaments",
                Some(&admin),
                json!({ "name": "Fall League", "dates": [today] }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, json) = self.post("/admin/users/seed", Some(&admin), json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["created"], 24);
        let (status, _) = self
            .post("/admin/tournament/check-in", Some(&admin), json!({ "open": true }))
            .await;
        assert_eq!(status, StatusCode::OK);
        admin
    }

    /// Log a seeded player in by letter and check them in
    async fn check_in_player(&self, letter: char) -> String {
        let token = self
            .login(&format!("{0}@{0}.com", letter), &letter.to_string())
            .await;
        let (status, json) = self.post("/player/check-in", Some(&token), json!({})).await;
        assert_eq!(status, StatusCode::OK, "check-in failed: {}", json);
        token
    }

    async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, token, Some(body)).await
    }

    async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, token, None).await
    }

    /// One game as listed on the admin dashboard
    async fn admin_game(&self, admin: &str, game_id: &Value) -> Value {
        let (status, games) = self.get("/admin/games", Some(admin)).await;
        assert_eq!(status, StatusCode::OK);
        games
            .as_array()
            .unwrap()
            .iter()
            .find(|g| &g["_id"] == game_id)
            .cloned()
            .unwrap()
    }

    /// Admin token plus round 1 paired for the first `players` seeded letters
    async fn round_paired(&self, players: &str) -> (String, Value) {
        let admin = self.tournament_ready().await;
        for letter in players.chars() {
            self.check_in_player(letter).await;
        }
        let (status, json) = self.post("/admin/generate-pairings", Some(&admin), json!({})).await;
        assert_eq!(status, StatusCode::CREATED, "{}", json);
        (admin, json)
    }

    /// Token of the seeded player with this id
    async fn token_for(&self, admin: &str, user_id: &Value) -> String {
        let (_, users) = self.get("/admin/users", Some(admin)).await;
        let user = users
            .as_array()
            .unwrap()
            .iter()
            .find(|u| &u["_id"] == user_id)
            .unwrap();
        let email = user["email"].as_str().unwrap();
        let letter = &email[..1];
        self.login(email, letter).await
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();
    let (status, json) = app.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "bags_brats_api");
}

#[tokio::test]
async fn test_register_login_me() {
    let app = TestApp::new();

    let (status, json) = app.register("pat@example.com", "pw").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(json["user_id"].is_string());

    let token = app.login("PAT@example.com", "pw").await;
    let (status, me) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "pat@example.com");
    assert_eq!(me["role"], "player");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new();

    let (status, json) = app.post("/auth/register", None, json!({ "email": "x@example.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Email and password are required");

    app.register("dup@example.com", "pw").await;
    let (status, _) = app.register("dup@example.com", "other").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_bad_credentials() {
    let app = TestApp::new();
    app.register("pat@example.com", "pw").await;

    let (status, _) = app
        .post("/auth/login", None, json!({ "email": "pat@example.com", "password": "nope" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/auth/me", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    app.register("pat@example.com", "old").await;
    let token = app.login("pat@example.com", "old").await;

    let (status, json) = app
        .call(
            Method::PUT,
            "/user/password",
            Some(&token),
            Some(json!({ "current_password": "wrong", "new_password": "new" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Current password is incorrect");

    let (status, _) = app
        .call(
            Method::PUT,
            "/user/password",
            Some(&token),
            Some(json!({ "current_password": "old", "new_password": "new" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.login("pat@example.com", "new").await;
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = TestApp::new();
    app.register("pat@example.com", "pw").await;
    let token = app.login("pat@example.com", "pw").await;

    let (status, json) = app.get("/admin/users", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "Admin access required");

    let (status, _) = app.get("/admin/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_tournament_rules() {
    let app = TestApp::new();
    let admin = app.admin_token().await;

    let (status, _) = app
        .post("/tournaments", Some(&admin), json!({ "name": "Bad", "dates": ["10/19/2026"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/tournaments", Some(&admin), json!({ "name": "No dates" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = json!({ "name": "Fall", "dates": ["2026-10-19", "2026-10-20"], "game_minutes": 15 });
    let (status, json) = app.post("/tournaments", Some(&admin), body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["tournament"]["status"], "upcoming");
    assert_eq!(json["tournament"]["game_minutes"], 15);

    let (status, _) = app.post("/tournaments", Some(&admin), body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, active) = app.get("/tournaments/active", None).await;
    assert_eq!(active["name"], "Fall");
}

#[tokio::test]
async fn test_check_in_closed_without_tournament() {
    let app = TestApp::new();
    app.register("pat@example.com", "pw").await;
    let token = app.login("pat@example.com", "pw").await;

    let (status, json) = app.post("/player/check-in", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No active tournament today.");
}

#[tokio::test]
async fn test_pairings_need_four_players() {
    let app = TestApp::new();
    let admin = app.tournament_ready().await;
    for letter in ['a', 'b', 'c'] {
        app.check_in_player(letter).await;
    }

    let (status, json) = app.post("/admin/generate-pairings", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Not enough players checked in (min 4, found 3)");
}

#[tokio::test]
async fn test_full_round_lifecycle() {
    let app = TestApp::new();
    let admin = app.tournament_ready().await;
    for letter in "abcdefghi".chars() {
        app.check_in_player(letter).await;
    }

    // pairings: 9 players -> 2 courts, 1 sits out
    let (status, json) = app.post("/admin/generate-pairings", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    assert_eq!(json["round_number"], 1);
    assert_eq!(json["pairings"].as_array().unwrap().len(), 2);
    assert_eq!(json["sitting_out"].as_array().unwrap().len(), 1);
    let game = json["pairings"][0].clone();
    assert_eq!(game["status"], "upcoming");
    assert_eq!(game["team1_player_names"].as_array().unwrap().len(), 2);

    let (_, status_json) = app.get("/admin/round/status", Some(&admin)).await;
    assert_eq!(status_json["rounds"][0]["status"], "ready");
    assert_eq!(status_json["rounds"][1]["status"], "pending");

    // round 1 can't be paired twice
    let (status, _) = app
        .post("/admin/generate-pairings", Some(&admin), json!({ "round_number": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .post("/admin/round/start", Some(&admin), json!({ "round_number": 1 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert!(json["end_time"].is_string());

    let (status, _) = app
        .post("/admin/round/start", Some(&admin), json!({ "round_number": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, tournament) = app.get("/tournaments/active", None).await;
    assert_eq!(tournament["status"], "active");

    // the player's view has a running countdown
    let player = app.token_for(&admin, &game["team1_player_ids"][0]).await;
    let (_, mine) = app.get("/player/current-game", Some(&player)).await;
    assert_eq!(mine["_id"], game["_id"]);
    assert_eq!(mine["status"], "active");
    assert!(mine["remaining_seconds"].as_i64().unwrap() > 0);

    // finalize once
    let submit = format!("/games/{}/submit", game["_id"].as_str().unwrap());
    let (status, json) = app
        .post(&submit, Some(&player), json!({ "score1": 21, "score2": 15 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["game"]["status"], "finalized");

    let (status, json) = app
        .post(&submit, Some(&player), json!({ "score1": 0, "score2": 21 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Game already finalized");

    // stopping finalizes the remaining court
    let (status, json) = app
        .post("/admin/round/stop", Some(&admin), json!({ "round_number": 1 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["finalized"], 1);

    let (_, status_json) = app.get("/admin/round/status", Some(&admin)).await;
    assert_eq!(status_json["rounds"][0]["status"], "complete");

    let (_, standings) = app.get("/tournaments/standings", None).await;
    let standings = standings.as_array().unwrap();
    assert_eq!(standings.len(), 8);
    assert_eq!(standings[0]["wins"], 1);
    assert_eq!(standings[0]["total_points"], 21);

    // the player who sat out is first in line for round 2
    let (status, json) = app.post("/admin/generate-pairings", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["round_number"], 2);

    let (_, podium) = app.get("/admin/tournament/top-teams", Some(&admin)).await;
    assert_eq!(podium.as_array().unwrap().len(), 3);
    assert_eq!(podium[0]["rank"], 1);
    assert_eq!(podium[0]["wins"], 1);
}

#[tokio::test]
async fn test_non_participant_cannot_submit() {
    let app = TestApp::new();
    let admin = app.tournament_ready().await;
    for letter in "abcd".chars() {
        app.check_in_player(letter).await;
    }
    let outsider = app.login("x@x.com", "x").await;

    let (_, json) = app.post("/admin/generate-pairings", Some(&admin), json!({})).await;
    let submit = format!("/games/{}/submit", json["pairings"][0]["_id"].as_str().unwrap());

    let (status, _) = app
        .post(&submit, Some(&outsider), json!({ "score1": 21, "score2": 3 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(&submit, Some(&admin), json!({ "score1": -1, "score2": 3 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &format!("/games/{}/submit", uuid::Uuid::new_v4()),
            Some(&admin),
            json!({ "score1": 1, "score2": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_game_edits() {
    let app = TestApp::new();
    let admin = app.tournament_ready().await;
    for letter in "abcd".chars() {
        app.check_in_player(letter).await;
    }
    let (_, json) = app.post("/admin/generate-pairings", Some(&admin), json!({})).await;
    let game_id = json["pairings"][0]["_id"].clone();
    let uri = format!("/admin/games/{}", game_id.as_str().unwrap());

    let (status, _) = app.post(&uri, Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // same status plus scores only corrects the scores
    let (status, json) = app
        .post(&uri, Some(&admin), json!({ "score1": 9, "status": "upcoming" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["game"]["score1"], 9);
    assert_eq!(json["game"]["status"], "upcoming");

    let (status, json) = app.post(&uri, Some(&admin), json!({ "status": "active" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["game"]["end_time"].is_string());

    // a rejected transition leaves the game untouched, scores included
    let (status, _) = app
        .post(&uri, Some(&admin), json!({ "score1": 5, "status": "upcoming" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let game = app.admin_game(&admin, &game_id).await;
    assert_eq!(game["score1"], 9);
    assert_eq!(game["status"], "active");

    let (status, _) = app
        .post(&uri, Some(&admin), json!({ "score1": -3, "status": "finalized" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let game = app.admin_game(&admin, &game_id).await;
    assert_eq!(game["score1"], 9);
    assert_eq!(game["status"], "active");

    // scores alone finalize, then correct
    let (status, json) = app
        .post(&uri, Some(&admin), json!({ "score1": 21, "score2": 11 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["game"]["status"], "finalized");
    assert_eq!(json["game"]["score1"], 21);

    let (_, json) = app.post(&uri, Some(&admin), json!({ "score2": 19 })).await;
    assert_eq!(json["game"]["score1"], 21);
    assert_eq!(json["game"]["score2"], 19);
    assert_eq!(json["game"]["status"], "finalized");
}

#[tokio::test]
async fn test_blackout_hides_standings() {
    let app = TestApp::new();
    let admin = app.tournament_ready().await;
    let player = app.check_in_player('a').await;
    for letter in "bcd".chars() {
        app.check_in_player(letter).await;
    }
    let (_, json) = app.post("/admin/generate-pairings", Some(&admin), json!({})).await;
    let submit = format!("/games/{}/submit", json["pairings"][0]["_id"].as_str().unwrap());
    app.post(&submit, Some(&admin), json!({ "score1": 21, "score2": 7 }))
        .await;

    let (status, json) = app
        .post("/admin/tournament/blackout", Some(&admin), json!({ "blackout": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "blackout");

    let (_, hidden) = app.get("/tournaments/standings", Some(&player)).await;
    assert_eq!(hidden, json!([]));
    let (_, hidden) = app.get("/tournaments/standings", None).await;
    assert_eq!(hidden, json!([]));
    let (_, visible) = app.get("/tournaments/standings", Some(&admin)).await;
    assert_eq!(visible.as_array().unwrap().len(), 4);

    app.post("/admin/tournament/blackout", Some(&admin), json!({ "blackout": false }))
        .await;
    let (_, visible) = app.get("/tournaments/standings", Some(&player)).await;
    assert_eq!(visible.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_podium_reveal_order() {
    let app = TestApp::new();
    let admin = app.tournament_ready().await;
    for letter in "abcdefgh".chars() {
        app.check_in_player(letter).await;
    }
    let (_, json) = app.post("/admin/generate-pairings", Some(&admin), json!({})).await;
    for (i, game) in json["pairings"].as_array().unwrap().iter().enumerate() {
        let submit = format!("/games/{}/submit", game["_id"].as_str().unwrap());
        app.post(&submit, Some(&admin), json!({ "score1": 21, "score2": 10 + i }))
            .await;
    }
    app.post("/admin/tournament/complete", Some(&admin), json!({}))
        .await;

    let (status, _) = app
        .post("/admin/tournament/reveal", Some(&admin), json!({ "place": "first" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .post("/admin/tournament/reveal", Some(&admin), json!({ "place": "third" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["team"]["rank"], 3);

    let (_, revealed) = app.get("/tournaments/reveal", None).await;
    assert_eq!(revealed.as_array().unwrap().len(), 1);
    assert_eq!(revealed[0]["place"], "third");

    for place in ["second", "first"] {
        let (status, _) = app
            .post("/admin/tournament/reveal", Some(&admin), json!({ "place": place }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, revealed) = app.get("/tournaments/reveal", None).await;
    assert_eq!(revealed[2]["team"]["rank"], 1);
}

#[tokio::test]
async fn test_next_day_and_complete() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    app.post(
        "/tournaments",
        Some(&admin),
        json!({ "name": "Two Day", "dates": ["2026-10-19", "2026-10-20"] }),
    )
    .await;

    let (status, json) = app.post("/admin/tournament/next-day", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["current_day_index"], 1);

    let (status, _) = app.post("/admin/tournament/next-day", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/admin/tournament/complete", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, active) = app.get("/tournaments/active", None).await;
    assert!(active.is_null());
}

#[tokio::test]
async fn test_expired_games_announced_once() {
    let app = TestApp::new();
    let admin = app.tournament_ready().await;
    for letter in "abcd".chars() {
        app.check_in_player(letter).await;
    }
    app.post("/admin/generate-pairings", Some(&admin), json!({}))
        .await;
    app.post("/admin/round/start", Some(&admin), json!({ "round_number": 1 }))
        .await;

    let later = Utc::now() + Duration::minutes(30);
    assert_eq!(scheduler::announce_expired(&app.state, Utc::now()).await, 0);
    assert_eq!(scheduler::announce_expired(&app.state, later).await, 1);
    assert_eq!(scheduler::announce_expired(&app.state, later).await, 0);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let path = std::env::temp_dir().join(format!("bagsbrats-{}.json", uuid::Uuid::new_v4()));
    let config = ServerConfig {
        data_file: Some(path.clone()),
        ..test_config()
    };

    let app = TestApp::with_config(config.clone());
    app.register("pat@example.com", "pw").await;
    drop(app);

    let restarted = TestApp::with_config(config);
    restarted.login("pat@example.com", "pw").await;
    let (status, _) = restarted.register("pat@example.com", "pw").await;
    assert_eq!(status, StatusCode::CONFLICT);

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_google_oauth_unconfigured() {
    let app = TestApp::new();
    let (status, _) = app.get("/auth/google", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_time_info() {
    let app = TestApp::new();
    let (status, json) = app.get("/tournaments/time-info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["timezone"], "America/Chicago");
    assert_eq!(json["check_in_hour"], 17);
}

#[tokio::test]
async fn test_create_tournament_bounds() {
    let app = TestApp::new();
    let admin = app.admin_token().await;

    for body in [
        json!({ "name": "Long", "dates": ["2026-10-19"], "game_minutes": 9_000_000_000_000_000i64 }),
        json!({ "name": "Long", "dates": ["2026-10-19"], "game_minutes": 1441 }),
        json!({ "name": "Zero", "dates": ["2026-10-19"], "game_minutes": 0 }),
        json!({ "name": "Many", "dates": ["2026-10-19"], "rounds_per_day": 51 }),
        json!({ "name": "None", "dates": ["2026-10-19"], "rounds_per_day": 0 }),
    ] {
        let (status, json) = app.post("/tournaments", Some(&admin), body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} -> {}", body, json);
    }
    let (_, active) = app.get("/tournaments/active", None).await;
    assert!(active.is_null());

    let (status, json) = app
        .post(
            "/tournaments",
            Some(&admin),
            json!({ "name": "Marathon", "dates": ["2026-10-19"], "game_minutes": 1440, "rounds_per_day": 50 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
}

#[tokio::test]
async fn test_bad_stored_game_length_rejected_without_side_effects() {
    let app = TestApp::new();
    let (admin, json) = app.round_paired("abcd").await;
    let game_id = json["pairings"][0]["_id"].clone();
    app.state
        .store
        .mutate(|db| {
            db.open_tournament_mut()?.game_minutes = 9_000_000_000_000_000;
            Ok(())
        })
        .await
        .unwrap();

    let start = format!("/games/{}/start", game_id.as_str().unwrap());
    let edit = format!("/admin/games/{}", game_id.as_str().unwrap());
    for (uri, body) in [
        ("/admin/round/start", json!({ "round_number": 1 })),
        ("/admin/tournament/start-all", json!({})),
        (start.as_str(), json!({})),
        (edit.as_str(), json!({ "status": "active" })),
    ] {
        let (status, json) = app.post(uri, Some(&admin), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} -> {}", uri, json);
        assert!(json["error"].as_str().unwrap().contains("Game length"));
    }

    // the store is still usable and nothing started
    let (_, rounds) = app.get("/admin/round/status", Some(&admin)).await;
    assert_eq!(rounds["rounds"][0]["status"], "ready");
    let game = app.admin_game(&admin, &game_id).await;
    assert_eq!(game["status"], "upcoming");
    let (_, tournament) = app.get("/tournaments/active", None).await;
    assert_eq!(tournament["status"], "upcoming");
}

#[tokio::test]
async fn test_start_all_shares_one_deadline() {
    let app = TestApp::new();
    let (admin, json) = app.round_paired("abcdefgh").await;
    assert_eq!(json["pairings"].as_array().unwrap().len(), 2);

    let (status, json) = app
        .post("/admin/tournament/start-all", Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["games_started"], 2);
    let end_time = json["end_time"].clone();
    assert!(end_time.is_string());

    let (_, games) = app.get("/admin/games", Some(&admin)).await;
    let games = games.as_array().unwrap();
    assert_eq!(games.len(), 2);
    for game in games {
        assert_eq!(game["status"], "active");
        assert_eq!(game["end_time"], end_time);
    }
    let (_, tournament) = app.get("/tournaments/active", None).await;
    assert_eq!(tournament["status"], "active");

    let (status, json) = app
        .post("/admin/tournament/start-all", Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No upcoming games to start");
}

#[tokio::test]
async fn test_start_single_game() {
    let app = TestApp::new();
    let (admin, json) = app.round_paired("abcd").await;
    let player = app.login("a@a.com", "a").await;
    let uri = format!("/games/{}/start", json["pairings"][0]["_id"].as_str().unwrap());

    let (_, tournament) = app.get("/tournaments/active", None).await;
    assert_eq!(tournament["status"], "upcoming");

    let (status, _) = app.post(&uri, Some(&player), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app.post(&uri, Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert!(json["end_time"].is_string());

    let (_, tournament) = app.get("/tournaments/active", None).await;
    assert_eq!(tournament["status"], "active");

    let (status, json) = app.post(&uri, Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Cannot move game from active to active");
}

#[tokio::test]
async fn test_next_day_blocked_while_round_active() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let today = Utc::now().date_naive();
    let dates: Vec<String> = [today, today + Duration::days(7)]
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    let (status, _) = app
        .post("/tournaments", Some(&admin), json!({ "name": "Weekly", "dates": dates }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.post("/admin/users/seed", Some(&admin), json!({})).await;
    app.post("/admin/tournament/check-in", Some(&admin), json!({ "open": true }))
        .await;
    for letter in "abcd".chars() {
        app.check_in_player(letter).await;
    }
    app.post("/admin/generate-pairings", Some(&admin), json!({})).await;
    let (status, _) = app
        .post("/admin/round/start", Some(&admin), json!({ "round_number": 1 }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app.post("/admin/tournament/next-day", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Round 1 is still active");

    app.post("/admin/round/stop", Some(&admin), json!({ "round_number": 1 }))
        .await;
    let (status, json) = app.post("/admin/tournament/next-day", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["current_day_index"], 1);
}

#[tokio::test]
async fn test_profile_email_conflict() {
    let app = TestApp::new();
    app.register("pat@example.com", "pw").await;
    app.register("sam@example.com", "pw").await;
    let sam = app.login("sam@example.com", "pw").await;

    let (status, json) = app
        .put("/user/profile", Some(&sam), json!({ "email": "PAT@example.com" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "Email already in use");

    let (status, json) = app
        .put(
            "/user/profile",
            Some(&sam),
            json!({ "email": "sam@example.com", "name": "Sammy" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Sammy");
    assert_eq!(json["email"], "sam@example.com");
}

#[tokio::test]
async fn test_proxy_players_and_self_guards() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let (_, me) = app.get("/auth/me", Some(&admin)).await;
    let admin_id = me["_id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post("/admin/proxy-register", Some(&admin), json!({ "name": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .post(
            "/admin/proxy-register",
            Some(&admin),
            json!({ "name": "Grandpa Joe", "email": "Joe@Example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    let proxy_id = json["user_id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(
            "/admin/proxy-register",
            Some(&admin),
            json!({ "name": "Joe Again", "email": "joe@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, users) = app.get("/admin/users", Some(&admin)).await;
    let proxy = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["_id"] == proxy_id.as_str())
        .unwrap();
    assert_eq!(proxy["is_proxy"], true);
    assert_eq!(proxy["email"], "joe@example.com");
    assert_eq!(proxy["has_password"], false);

    // an admin can neither demote nor delete themselves
    let (status, json) = app
        .post(
            &format!("/admin/users/{}/role", admin_id),
            Some(&admin),
            json!({ "role": "player" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Cannot remove your own admin role");
    let (status, json) = app.delete(&format!("/admin/users/{}", admin_id), Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Cannot delete your own account");
    let (_, me) = app.get("/auth/me", Some(&admin)).await;
    assert_eq!(me["role"], "admin");

    let (status, json) = app
        .post(
            &format!("/admin/users/{}/role", proxy_id),
            Some(&admin),
            json!({ "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["role"], "admin");

    let uri = format!("/admin/users/{}", proxy_id);
    let (status, _) = app.delete(&uri, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&uri, Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_google_callback_without_network() {
    let app = TestApp::with_config(ServerConfig {
        google: Some(GoogleConfig {
            client_id: "client-123".to_string(),
            client_secret: "shh".to_string(),
            redirect_uri: "http://localhost:5001/auth/google/callback".to_string(),
        }),
        ..test_config()
    });

    let (status, json) = app.get("/auth/google", None).await;
    assert_eq!(status, StatusCode::OK);
    let auth_url = json["auth_url"].as_str().unwrap();
    assert!(auth_url.starts_with("https://accounts.google.com/"));
    assert!(auth_url.contains("client_id=client-123"));

    let (status, location) = app.redirect("/auth/google/callback?error=access_denied").await;
    assert!(status.is_redirection());
    assert_eq!(
        location.as_deref(),
        Some("http://localhost:5173/login?error=access_denied")
    );

    let (status, json) = app.get("/auth/google/callback", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing authorization code");

    let (status, json) = app
        .get("/auth/google/callback?code=abc&state=forged", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid OAuth state");
}

async fn next_json<S>(socket: &mut S) -> Value
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let message = tokio::time::timeout(std::time::Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for socket message")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_websocket_rooms() {
    let app = TestApp::new();
    let admin = app.tournament_ready().await;
    let (_, tournament) = app.get("/tournaments/active", None).await;
    let tournament_id = tournament["_id"].as_str().unwrap().to_string();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    let server = tokio::spawn(async move { axum::serve(listener, router).await });

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();

    socket
        .send(Message::Text(json!({ "event": "ping" }).to_string()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut socket).await["event"], "pong");

    socket
        .send(Message::Text(
            json!({ "event": "join_tournament", "data": { "tournament_id": tournament_id } })
                .to_string(),
        ))
        .await
        .unwrap();
    let joined = next_json(&mut socket).await;
    assert_eq!(joined["event"], "joined");
    assert_eq!(joined["data"]["tournament_id"], tournament_id.as_str());

    let (status, _) = app
        .post("/admin/tournament/blackout", Some(&admin), json!({ "blackout": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let event = next_json(&mut socket).await;
    assert_eq!(event["event"], "blackout_status");
    assert_eq!(event["data"]["is_blackout"], true);

    // a second socket joins through the query string
    let (mut auto, _) = tokio_tungstenite::connect_async(format!(
        "ws://{}/ws?tournament_id={}",
        addr, tournament_id
    ))
    .await
    .unwrap();
    auto.send(Message::Text(json!({ "event": "ping" }).to_string()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut auto).await["event"], "pong");

    app.post("/admin/tournament/check-in", Some(&admin), json!({ "open": false }))
        .await;
    for socket in [&mut socket, &mut auto] {
        let event = next_json(socket).await;
        assert_eq!(event["event"], "check_in_status");
        assert_eq!(event["data"]["open"], false);
    }

    socket
        .send(Message::Text(json!({ "event": "bogus" }).to_string()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut socket).await["event"], "error");

    server.abort();
}

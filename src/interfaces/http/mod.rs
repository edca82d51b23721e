mod auth;
mod errors;
mod leads;
mod saved;
pub mod state;

use crate::domain::error::AppError;
use actix_cors::Cors;
use actix_web::{dev::Server, get, web, App, HttpRequest, HttpResponse, HttpServer, Responder, ResponseError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

pub use state::AppState;

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub app: Arc<AppState>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[get("/profile")]
async fn profile(req: HttpRequest, data: web::Data<HttpState>) -> impl Responder {
    match auth::authenticate(&req, &data.app).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => e.error_response(),
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    HttpResponse::Ok().json(&*logs)
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

/// Routes under `/api`, plus JSON errors for malformed query strings and bodies.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _| {
        AppError::ValidationError(err.to_string()).into()
    }))
    .app_data(web::JsonConfig::default().error_handler(|err, _| {
        AppError::ValidationError(err.to_string()).into()
    }))
    .service(
        web::scope("/api")
            .service(leads::search_leads)
            .service(leads::private_clinics)
            .service(leads::scraped_leads)
            .service(leads::enrich_ods)
            .service(leads::enrich_places)
            .service(saved::export_saved)
            .service(saved::enrich_saved)
            .service(saved::update_notes)
            .service(saved::list_saved)
            .service(saved::save_lead)
            .service(saved::remove_lead)
            .service(profile)
            .service(get_logs),
    );
}

pub fn start_server(
    app: Arc<AppState>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
    bind_address: (String, u16),
) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { app, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // the dashboard is served from another origin

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(bind_address)?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::fakes::{ods_summary, FakeCqc, FakeOds, FakePlaces, InMemorySavedLeads};
    use crate::application::{
        EnrichmentUseCase, LeadSearchUseCase, PrivateClinicsUseCase, SavedLeadsUseCase,
    };
    use crate::domain::error::Result;
    use crate::domain::user::UserIdentity;
    use crate::infrastructure::api_clients::identity::LocalIdentity;
    use crate::infrastructure::api_clients::IdentityProvider;
    use actix_web::http::{header, StatusCode};
    use actix_web::test;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Accepts exactly one token.
    struct SingleTokenIdentity;

    #[async_trait]
    impl IdentityProvider for SingleTokenIdentity {
        async fn user_for_token(&self, access_token: Option<&str>) -> Result<UserIdentity> {
            match access_token {
                Some("good-token") => Ok(UserIdentity {
                    id: "user-1".to_string(),
                    email: Some("a@clinic.example".to_string()),
                    display_name: None,
                    avatar_url: None,
                }),
                Some(_) => Err(AppError::Unauthorized("Invalid or expired session".to_string())),
                None => Err(AppError::Unauthorized("Missing bearer token".to_string())),
            }
        }
    }

    fn state(identity: Arc<dyn IdentityProvider>) -> web::Data<HttpState> {
        let ods = Arc::new(FakeOds::with_page(
            vec![
                ods_summary("FA1", "Leeds Pharmacy", "RO182", "LEEDS"),
                ods_summary("FA2", "York Pharmacy", "RO182", "YORK"),
            ],
            2,
        ));
        let app = AppState {
            lead_search: LeadSearchUseCase::new(ods.clone()),
            private_clinics: PrivateClinicsUseCase::new(Arc::new(FakeCqc::missing_key())),
            scraped_leads: None,
            enrichment: EnrichmentUseCase::new(ods.clone(), Arc::new(FakePlaces::default())),
            saved_leads: SavedLeadsUseCase::new(Arc::new(InMemorySavedLeads::default()), ods)
                .with_enrich_pause(Duration::ZERO),
            identity,
        };
        web::Data::new(HttpState {
            app: Arc::new(app),
            logs: Arc::new(Mutex::new(Vec::new())),
        })
    }

    macro_rules! service {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn test_lead_search_filters_by_town() {
        let data = state(Arc::new(LocalIdentity::new("local")));
        let app = service!(data);

        let req = test::TestRequest::get()
            .uri("/api/leads?town=leeds&limit=10")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["total"], 2);
        assert_eq!(body["hasMore"], false);
        assert_eq!(body["leads"][0]["ODS_Code"], "FA1");
        assert_eq!(body["leads"].as_array().map(Vec::len), Some(1));
    }

    #[actix_web::test]
    async fn test_invalid_query_is_json_400() {
        let data = state(Arc::new(LocalIdentity::new("local")));
        let app = service!(data);

        for uri in ["/api/leads?limit=0", "/api/leads?limit=abc"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body: Value = test::read_body_json(resp).await;
            assert!(body["error"].is_string());
        }
    }

    #[actix_web::test]
    async fn test_missing_cqc_key_is_500_with_message() {
        let data = state(Arc::new(LocalIdentity::new("local")));
        let app = service!(data);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/leads/private").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "CQC API Key missing. Add CQC_API_KEY to .env");
    }

    #[actix_web::test]
    async fn test_scraped_leads_without_database() {
        let data = state(Arc::new(LocalIdentity::new("local")));
        let app = service!(data);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/leads/scraped").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_enrich_requires_ods_code() {
        let data = state(Arc::new(LocalIdentity::new("local")));
        let app = service!(data);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/leads/enrich")
                .set_json(json!({}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "ODS Code is required"}));

        let req = test::TestRequest::post()
            .uri("/api/leads/enrich")
            .set_json(json!({"odsCode": "FA1"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["enriched"]["phoneNumber"], "0113 496 0000");
    }

    #[actix_web::test]
    async fn test_saved_leads_round_trip() {
        let data = state(Arc::new(LocalIdentity::new("local")));
        let app = service!(data);

        let req = test::TestRequest::post()
            .uri("/api/leads/saved")
            .set_json(json!({"lead": {"Name": "Boots", "ODS_Code": "FA1", "Status": "Active"}}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Lead saved");
        assert!(body["lead"]["SavedAt"].is_string());

        let req = test::TestRequest::patch()
            .uri("/api/leads/saved/FA1/notes")
            .set_json(json!({"notes": "call back Tuesday"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["lead"]["Notes"], "call back Tuesday");

        let req = test::TestRequest::get().uri("/api/leads/saved").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["leads"].as_array().map(Vec::len), Some(1));

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/leads/saved/export").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"my_saved_leads_"));
        let csv = test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&csv).contains("Boots"));

        let req = test::TestRequest::post().uri("/api/leads/saved/enrich").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"enriched": 1, "failed": 0, "skipped": 0}));

        let req = test::TestRequest::delete()
            .uri("/api/leads/saved?odsCode=FA1")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Lead removed");
    }

    #[actix_web::test]
    async fn test_saved_lead_validation() {
        let data = state(Arc::new(LocalIdentity::new("local")));
        let app = service!(data);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/leads/saved")
                .set_json(json!({"lead": {"Name": "No code"}}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(
            &app,
            test::TestRequest::delete().uri("/api/leads/saved").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(
            &app,
            test::TestRequest::patch()
                .uri("/api/leads/saved/NOPE/notes")
                .set_json(json!({"notes": "x"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_saved_leads_require_token() {
        let data = state(Arc::new(SingleTokenIdentity));
        let app = service!(data);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/leads/saved").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Missing bearer token");

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/leads/saved")
                .insert_header((header::AUTHORIZATION, "Bearer good-token"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/profile")
            .insert_header((header::AUTHORIZATION, "Bearer good-token"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["id"], "user-1");
    }

    #[actix_web::test]
    async fn test_profile_in_local_mode_and_logs() {
        let data = state(Arc::new(LocalIdentity::new("local")));
        add_log(&data.logs, "INFO", "Test", "hello");
        let app = service!(data);

        let req = test::TestRequest::get().uri("/api/profile").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["id"], "local");

        let req = test::TestRequest::get().uri("/api/logs").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["message"], "hello");
    }

    #[actix_web::test]
    async fn test_log_buffer_is_bounded() {
        let logs = Mutex::new(Vec::new());
        for i in 0..(MAX_LOG_ENTRIES + 5) {
            add_log(&logs, "INFO", "Test", &i.to_string());
        }
        let logs = logs.lock().unwrap();
        assert_eq!(logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(logs[0].message, "5");
    }
}

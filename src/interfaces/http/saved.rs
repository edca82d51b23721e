use super::auth::authenticate;
use super::{add_log, HttpState};
use crate::domain::error::{AppError, Result};
use crate::domain::user::UserIdentity;
use actix_web::http::header;
use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse, Responder, ResponseError};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveQuery {
    pub ods_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotesBody {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Authenticates, then runs `action`; failures become JSON error responses.
async fn with_user<F, Fut>(req: &HttpRequest, data: &HttpState, action: F) -> HttpResponse
where
    F: FnOnce(UserIdentity) -> Fut,
    Fut: std::future::Future<Output = Result<HttpResponse>>,
{
    let result = match authenticate(req, &data.app).await {
        Ok(user) => action(user).await,
        Err(e) => Err(e),
    };

    result.unwrap_or_else(|e| {
        let level = match &e {
            AppError::Unauthorized(_) | AppError::ValidationError(_) | AppError::NotFound(_) => {
                "WARN"
            }
            _ => "ERROR",
        };
        add_log(&data.logs, level, "SavedLeads", &e.to_string());
        e.error_response()
    })
}

#[get("/leads/saved")]
async fn list_saved(req: HttpRequest, data: web::Data<HttpState>) -> impl Responder {
    let state = data.get_ref();
    with_user(&req, state, |user| async move {
        let leads = state.app.saved_leads.list(&user.id).await?;
        Ok(HttpResponse::Ok().json(json!({ "leads": leads })))
    })
    .await
}

#[post("/leads/saved")]
async fn save_lead(
    req: HttpRequest,
    data: web::Data<HttpState>,
    body: web::Json<Value>,
) -> impl Responder {
    let state = data.get_ref();
    with_user(&req, state, |user| async move {
        let payload = body.get("lead").cloned().unwrap_or(Value::Null);
        let (outcome, lead) = state.app.saved_leads.save(&user.id, &payload).await?;
        add_log(
            &state.logs,
            "INFO",
            "SavedLeads",
            &format!("{}: {}", outcome.message(), lead.code()),
        );
        Ok(HttpResponse::Ok().json(json!({ "message": outcome.message(), "lead": lead })))
    })
    .await
}

#[delete("/leads/saved")]
async fn remove_lead(
    req: HttpRequest,
    data: web::Data<HttpState>,
    query: web::Query<RemoveQuery>,
) -> impl Responder {
    let state = data.get_ref();
    with_user(&req, state, |user| async move {
        state.app
            .saved_leads
            .remove(&user.id, query.ods_code.as_deref())
            .await?;
        Ok(HttpResponse::Ok().json(json!({ "message": "Lead removed" })))
    })
    .await
}

#[patch("/leads/saved/{ods_code}/notes")]
async fn update_notes(
    req: HttpRequest,
    data: web::Data<HttpState>,
    path: web::Path<String>,
    body: web::Json<NotesBody>,
) -> impl Responder {
    let ods_code = path.into_inner();
    let notes = body.into_inner().notes;
    let state = data.get_ref();
    with_user(&req, state, |user| async move {
        let lead = state.app.saved_leads.annotate(&user.id, &ods_code, notes).await?;
        Ok(HttpResponse::Ok().json(json!({ "message": "Notes updated", "lead": lead })))
    })
    .await
}

#[post("/leads/saved/enrich")]
async fn enrich_saved(req: HttpRequest, data: web::Data<HttpState>) -> impl Responder {
    let state = data.get_ref();
    with_user(&req, state, |user| async move {
        add_log(&state.logs, "INFO", "SavedLeads", "Enriching saved leads");
        let report = state.app.saved_leads.enrich_all(&user.id).await?;
        add_log(
            &state.logs,
            "INFO",
            "SavedLeads",
            &format!(
                "Enrich all: {} enriched, {} failed, {} skipped",
                report.enriched, report.failed, report.skipped
            ),
        );
        Ok(HttpResponse::Ok().json(report))
    })
    .await
}

#[get("/leads/saved/export")]
async fn export_saved(req: HttpRequest, data: web::Data<HttpState>) -> impl Responder {
    let state = data.get_ref();
    with_user(&req, state, |user| async move {
        let export = state.app.saved_leads.export_csv(&user.id).await?;
        Ok(HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.file_name),
            ))
            .body(export.body))
    })
    .await
}

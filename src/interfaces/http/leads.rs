use super::{add_log, HttpState};
use crate::application::use_cases::enrichment::{OdsEnrichRequest, PlacesEnrichRequest};
use crate::application::use_cases::lead_search::LeadSearchRequest;
use crate::application::use_cases::private_clinics::PrivateClinicRequest;
use crate::application::use_cases::scraped_leads::ScrapedLeadRequest;
use actix_web::{get, post, web, HttpResponse, Responder, ResponseError};
use serde_json::json;

#[get("/leads")]
async fn search_leads(
    data: web::Data<HttpState>,
    query: web::Query<LeadSearchRequest>,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "NHS",
        &format!(
            "Searching ODS (role={:?} town={:?} offset={})",
            query.role, query.town, query.offset
        ),
    );

    match data.app.lead_search.execute(&query).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => {
            add_log(&data.logs, "ERROR", "NHS", &format!("Lead search failed: {}", e));
            e.error_response()
        }
    }
}

#[get("/leads/private")]
async fn private_clinics(
    data: web::Data<HttpState>,
    query: web::Query<PrivateClinicRequest>,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "CQC",
        &format!(
            "Listing private clinics (service={} offset={})",
            query.service.as_deref().unwrap_or("all"),
            query.offset
        ),
    );

    match data.app.private_clinics.execute(&query).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => {
            add_log(&data.logs, "ERROR", "CQC", &format!("Private clinic listing failed: {}", e));
            e.error_response()
        }
    }
}

#[get("/leads/scraped")]
async fn scraped_leads(
    data: web::Data<HttpState>,
    query: web::Query<ScrapedLeadRequest>,
) -> impl Responder {
    let result = match data.app.scraped_leads() {
        Ok(use_case) => use_case.execute(&query).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => {
            add_log(&data.logs, "ERROR", "Scraped", &format!("Scraped lead listing failed: {}", e));
            e.error_response()
        }
    }
}

#[post("/leads/enrich")]
async fn enrich_ods(
    data: web::Data<HttpState>,
    body: web::Json<OdsEnrichRequest>,
) -> impl Responder {
    match data.app.enrichment.ods_contact_details(&body).await {
        Ok(enriched) => HttpResponse::Ok().json(json!({ "enriched": enriched })),
        Err(e) => {
            add_log(&data.logs, "ERROR", "NHS", &format!("ODS enrichment failed: {}", e));
            e.error_response()
        }
    }
}

#[post("/leads/enrich/places")]
async fn enrich_places(
    data: web::Data<HttpState>,
    body: web::Json<PlacesEnrichRequest>,
) -> impl Responder {
    match data.app.enrichment.places_profile(&body).await {
        Ok(result) => {
            if let Some(message) = &result.message {
                add_log(&data.logs, "WARN", "Places", message);
            }
            HttpResponse::Ok().json(result)
        }
        Err(e) => {
            add_log(&data.logs, "ERROR", "Places", &format!("Places enrichment failed: {}", e));
            e.error_response()
        }
    }
}

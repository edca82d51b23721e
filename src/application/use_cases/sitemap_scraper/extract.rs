use super::categories::infer_categories;
use crate::domain::scraped::{GeoPoint, PracticeRawData, ScrapedPractice, DOCTIFY_SOURCE};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

const MEDICAL_TYPES: [&str; 5] = [
    "MedicalClinic",
    "Dentist",
    "Hospital",
    "Physician",
    "MedicalBusiness",
];

const BLOCKED_WEBSITE_DOMAINS: [&str; 9] = [
    "doctify",
    "google",
    "facebook",
    "twitter",
    "instagram",
    "youtube",
    "linkedin",
    "apple.com",
    "tiktok",
];

static JSON_LD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static TEL_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href^="tel:"]"#).unwrap());
static MAIL_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href^="mailto:"]"#).unwrap());
static EXTERNAL_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="://"][target="_blank"]"#).unwrap());
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());
static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());

static POSTCODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[A-Z]{1,2}\d[A-Z\d]?\s*\d[A-Z]{2}\b").unwrap());
static RATING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d\.\d)\s*/\s*5").unwrap());
static REVIEW_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:verified\s+)?reviews?").unwrap());

fn is_medical(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(kind)) => MEDICAL_TYPES.contains(&kind.as_str()),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| MEDICAL_TYPES.contains(&kind)),
        _ => false,
    }
}

/// First JSON-LD object on the page typed as a medical business.
fn medical_json_ld(document: &Html) -> Option<Value> {
    for script in document.select(&JSON_LD) {
        let text: String = script.text().collect();
        let parsed: Value = match serde_json::from_str(text.trim()) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Skipping unparseable JSON-LD block");
                continue;
            }
        };

        let items = match parsed {
            Value::Array(items) => items,
            other => vec![other],
        };
        if let Some(item) = items.into_iter().find(is_medical) {
            return Some(item);
        }
    }
    None
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `logo`/`image` may be a URL string, an `ImageObject` or a list of either.
fn image_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => text_field(value, "url"),
        Value::Array(items) => items.iter().find_map(image_value),
        _ => None,
    }
}

fn named_list(value: Option<&Value>) -> Vec<String> {
    let items = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
        None => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(_) => text_field(item, "name"),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn link_target(document: &Html, selector: &Selector, scheme: &str) -> Option<String> {
    document
        .select(selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim_start_matches(scheme).trim())
        .map(|target| target.split('?').next().unwrap_or(target).to_string())
        .find(|target| !target.is_empty())
}

fn external_website(document: &Html) -> Option<String> {
    document
        .select(&EXTERNAL_LINK)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| {
            let lower = href.to_lowercase();
            !BLOCKED_WEBSITE_DOMAINS
                .iter()
                .any(|domain| lower.contains(domain))
        })
        .map(str::to_string)
}

fn slug_of(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parses a listing page. Returns `None` when no practice name can be found.
pub fn extract_practice(url: &str, html: &str) -> Option<ScrapedPractice> {
    let document = Html::parse_document(html);
    let ld = medical_json_ld(&document).unwrap_or(Value::Null);
    let address = ld.get("address").cloned().unwrap_or(Value::Null);

    let name = text_field(&ld, "name").or_else(|| {
        document
            .select(&HEADING)
            .next()
            .map(|h1| collapse_whitespace(&h1.text().collect::<String>()))
            .filter(|s| !s.is_empty())
    })?;

    let body_text = document
        .select(&BODY)
        .next()
        .map(|body| collapse_whitespace(&body.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default();

    let street = text_field(&address, "streetAddress");
    let city = text_field(&address, "addressLocality");
    let postcode = text_field(&address, "postalCode").or_else(|| {
        POSTCODE
            .find(&body_text)
            .map(|m| m.as_str().to_uppercase())
    });

    let phone = text_field(&ld, "telephone").or_else(|| link_target(&document, &TEL_LINK, "tel:"));
    let email = link_target(&document, &MAIL_LINK, "mailto:");

    let rating = RATING
        .captures(&body_text)
        .and_then(|caps| caps[1].parse::<f64>().ok());
    let review_count = REVIEW_COUNT
        .captures(&body_text)
        .and_then(|caps| caps[1].parse::<i32>().ok())
        .unwrap_or(0);

    let description = text_field(&ld, "description")
        .or_else(|| meta_content(&document, &META_DESCRIPTION));

    let image_url = match ld
        .get("logo")
        .and_then(image_value)
        .or_else(|| ld.get("image").and_then(image_value))
    {
        Some(image) if !image.contains("w=256") => Some(image),
        fallback => meta_content(&document, &OG_IMAGE).or(fallback),
    };

    let geo = ld.get("geo").and_then(|geo| {
        Some(GeoPoint {
            lat: number_field(geo, "latitude")?,
            lng: number_field(geo, "longitude")?,
        })
    });

    let categories = infer_categories(url, &name);

    Some(ScrapedPractice {
        source: DOCTIFY_SOURCE.to_string(),
        url: url.to_string(),
        address: street,
        postcode,
        city,
        phone,
        email,
        website: external_website(&document),
        specialties: named_list(ld.get("medicalSpecialty")),
        categories,
        rating,
        review_count,
        description,
        image_url,
        raw_data: PracticeRawData {
            slug: slug_of(url),
            geo,
            opening_hours: ld.get("openingHours").cloned(),
            employees: named_list(ld.get("employee")),
        },
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.doctify.com/uk/practice/harley-hair-clinic";

    fn listing(json_ld: &str, body: &str) -> String {
        format!(
            r#"<html><head>
            <meta name="description" content="Meta description">
            <meta property="og:image" content="https://cdn.example/og.jpg">
            <script type="application/ld+json">{{"@type": "BreadcrumbList"}}</script>
            <script type="application/ld+json">{}</script>
            </head><body>{}</body></html>"#,
            json_ld, body
        )
    }

    #[test]
    fn test_extract_practice_from_json_ld() {
        let html = listing(
            r#"{
                "@type": ["MedicalClinic", "LocalBusiness"],
                "name": "Harley Hair Clinic",
                "telephone": "020 7000 1111",
                "description": "FUE specialists",
                "logo": {"url": "https://cdn.example/logo.png"},
                "address": {"streetAddress": "10 Harley St", "postalCode": "W1G 9PF", "addressLocality": "London"},
                "geo": {"latitude": "51.5203", "longitude": -0.1477},
                "medicalSpecialty": [{"name": "Trichology"}, "Dermatology"],
                "openingHours": ["Mo-Fr 09:00-17:00"],
                "employee": [{"name": "Dr A Smith"}, {"name": "Dr B Jones"}]
            }"#,
            r#"<h1>Ignored heading</h1>
            <p>4.8 / 5 from 212 verified reviews</p>
            <a href="mailto:hello@harleyhair.example?subject=Hi">Email</a>
            <a href="https://www.facebook.com/harleyhair" target="_blank">fb</a>
            <a href="https://harleyhair.example" target="_blank">Website</a>"#,
        );

        let practice = extract_practice(URL, &html).unwrap();

        assert_eq!(practice.name, "Harley Hair Clinic");
        assert_eq!(practice.source, DOCTIFY_SOURCE);
        assert_eq!(practice.address.as_deref(), Some("10 Harley St"));
        assert_eq!(practice.postcode.as_deref(), Some("W1G 9PF"));
        assert_eq!(practice.city.as_deref(), Some("London"));
        assert_eq!(practice.phone.as_deref(), Some("020 7000 1111"));
        assert_eq!(practice.email.as_deref(), Some("hello@harleyhair.example"));
        assert_eq!(practice.website.as_deref(), Some("https://harleyhair.example"));
        assert_eq!(practice.rating, Some(4.8));
        assert_eq!(practice.review_count, 212);
        assert_eq!(practice.description.as_deref(), Some("FUE specialists"));
        assert_eq!(practice.image_url.as_deref(), Some("https://cdn.example/logo.png"));
        assert_eq!(practice.specialties, vec!["Trichology", "Dermatology"]);
        assert_eq!(practice.categories, vec!["hair-loss"]);
        assert_eq!(
            practice.raw_data.geo,
            Some(GeoPoint {
                lat: 51.5203,
                lng: -0.1477
            })
        );
        assert_eq!(practice.raw_data.employees, vec!["Dr A Smith", "Dr B Jones"]);
        assert_eq!(practice.raw_data.slug, "harley-hair-clinic");
        assert!(practice.raw_data.opening_hours.is_some());
    }

    #[test]
    fn test_extract_practice_falls_back_to_page_markup() {
        let html = listing(
            r#"{"@type": "Organization", "name": "Not a clinic"}"#,
            r#"<h1>  Harley   Hair Clinic </h1>
            <p>Visit us at 10 Harley St, w1g 9pf</p>
            <a href="tel:02070002222">Call</a>"#,
        );

        let practice = extract_practice(URL, &html).unwrap();

        assert_eq!(practice.name, "Harley Hair Clinic");
        assert_eq!(practice.postcode.as_deref(), Some("W1G 9PF"));
        assert_eq!(practice.address, None);
        assert_eq!(practice.phone.as_deref(), Some("02070002222"));
        assert_eq!(practice.description.as_deref(), Some("Meta description"));
        assert_eq!(practice.image_url.as_deref(), Some("https://cdn.example/og.jpg"));
        assert_eq!(practice.rating, None);
        assert_eq!(practice.review_count, 0);
        assert!(practice.website.is_none());
    }

    #[test]
    fn test_small_logo_prefers_og_image() {
        let html = listing(
            r#"{"@type": "Dentist", "name": "Smile Co", "image": "https://cdn.example/logo.png?w=256"}"#,
            "",
        );
        let practice = extract_practice(URL, &html).unwrap();
        assert_eq!(practice.image_url.as_deref(), Some("https://cdn.example/og.jpg"));
    }

    #[test]
    fn test_page_without_name_is_skipped() {
        assert!(extract_practice(URL, "<html><body><p>Not found</p></body></html>").is_none());
    }
}

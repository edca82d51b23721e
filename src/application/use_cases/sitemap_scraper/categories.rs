use once_cell::sync::Lazy;
use regex::Regex;

pub const GENERAL_CATEGORY: &str = "general";

static CATEGORY_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("weight-loss", r"weight|slim|bariatric|diet"),
        ("hair-loss", r"hair|transplant|trichol|fue|fht"),
        ("cosmetic", r"cosmetic|aesthetic|beauty|botox|filler"),
        ("dental", r"dental|dentist|orthodont|smile|teeth"),
        ("fertility", r"fertil|ivf|embryo"),
        ("physiotherapy", r"physio|osteo|chiropract"),
        ("eye-care", r"eye|ophthalm|laser|lasik|optom"),
        ("mental-health", r"mental|psych|counsel|therap"),
        ("dermatology", r"dermat|skin"),
        ("cardiology", r"cardio|heart"),
    ]
    .into_iter()
    .map(|(slug, pattern)| (slug, Regex::new(pattern).unwrap()))
    .collect()
});

/// Keyword match over the listing URL and name. Never empty.
pub fn infer_categories(url: &str, name: &str) -> Vec<String> {
    let text = format!("{} {}", url, name).to_lowercase();
    let mut categories: Vec<String> = CATEGORY_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(&text))
        .map(|(slug, _)| slug.to_string())
        .collect();

    if categories.is_empty() {
        categories.push(GENERAL_CATEGORY.to_string());
    }
    categories
}

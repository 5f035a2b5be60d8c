//! Generate a sample history database with realistic clipboard content.
//!
//! Every item goes through the same redaction and analysis as a live
//! capture, so the result exercises search filters and suggestions.
//!
//! Usage:
//!     cargo run --release --bin generate-sample-db [output_path] [count]
//!
//! Default output: ./clipsense_sample.db

use clipsense::analyzer::ContentAnalyzer;
use clipsense::database::Database;
use clipsense::models::NewClip;
use clipsense::redaction::{Redactor, RedactionConfig};
use rand::Rng;
use std::env;
use std::path::PathBuf;

/// Number of items to generate when no count is given
const DEFAULT_ITEMS: usize = 500;

/// Share of items marked as favorite
const FAVORITE_RATE: f64 = 0.05;

const URLS: &[&str] = &[
    "https://github.com/rust-lang/rust/issues/12345",
    "https://docs.rs/tokio/latest/tokio/",
    "https://example.com/search?q=clipboard&page=2#results",
    "www.rust-lang.org",
    "ftp://files.example.org/pub/release.tar.gz",
];

const EMAILS: &[&str] = &[
    "alice@example.com",
    "mailto:support@company.io",
    "first.last+news@mail.example.org",
];

const PHONES: &[&str] = &["+1 (555) 123-4567", "020 7946 0958", "+49 30 901820"];

const COLORS: &[&str] = &["#ff5733", "#3498db", "rgb(46, 204, 113)", "hsl(280, 60%, 50%)", "#FFF"];

const SNIPPETS: &[&str] = &[
    r#"{"name": "clipsense", "version": "0.1.0", "features": ["search", "tags"]}"#,
    "[1, 2, 3, 5, 8, 13]",
    "<?xml version=\"1.0\"?><config><entry key=\"a\">1</entry></config>",
    "fn main() {\n    let items = vec![1, 2, 3];\n    println!(\"{:?}\", items);\n}",
    "const total = items.reduce((sum, x) => sum + x, 0);\nexport default total;",
    "SELECT id, name FROM users WHERE active = 1 ORDER BY name",
    "# Release notes\n\n- Faster search\n- **New** tag filters\n",
    "550e8400-e29b-41d4-a716-446655440000",
    "Q2xpcFNlbnNlIHNhbXBsZQ==",
];

const LOCATORS: &[&str] = &[
    "192.168.1.42",
    "2001:db8::ff00:42:8329",
    "/usr/local/bin/clipsense",
    "C:\\Users\\sam\\Documents\\report.docx",
    "40.7128, -74.0060",
    "2024-03-15T09:30:00Z",
];

/// Masked before analysis. Wallet addresses are runs of 32+ alphanumerics,
/// so they land here as masked text rather than as `crypto_address`.
const SENSITIVE: &[&str] = &[
    "password=correcthorsebattery",
    "0x742d35Cc6634C0532925a3b844Bc454e4438f44e",
    "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
    "api_key: sk_live_abcdef1234567890",
    "Bearer eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxMjM0In0",
];

/// Lorem ipsum words for plain text items
const LOREM_WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit",
    "sed", "do", "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore",
    "magna", "aliqua", "enim", "ad", "minim", "veniam", "quis", "nostrud",
];

const TAGS: &[&str] = &["work", "personal", "snippet", "todo", "reference"];

fn pick<'a>(rng: &mut impl Rng, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

fn generate_text(rng: &mut impl Rng) -> String {
    match rng.gen_range(0..100) {
        0..=19 => pick(rng, URLS).to_string(),
        20..=27 => pick(rng, EMAILS).to_string(),
        28..=32 => pick(rng, PHONES).to_string(),
        33..=39 => pick(rng, COLORS).to_string(),
        40..=59 => pick(rng, SNIPPETS).to_string(),
        60..=69 => pick(rng, LOCATORS).to_string(),
        70..=72 => pick(rng, SENSITIVE).to_string(),
        _ => {
            let len = rng.gen_range(3..=40);
            let words: Vec<&str> = (0..len).map(|_| pick(rng, LOREM_WORDS)).collect();
            let mut sentence = words.join(" ");
            // Capitalize first letter
            if let Some(first) = sentence.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            sentence.push('.');
            sentence
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let output_path = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("clipsense_sample.db"));
    let count = args
        .get(2)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_ITEMS);

    // Remove existing file
    if output_path.exists() {
        std::fs::remove_file(&output_path).expect("Failed to remove existing database");
    }

    println!("Generating sample database...");
    println!("Output: {}", output_path.display());

    let db = Database::open(&output_path).expect("Failed to create database");
    let redactor = Redactor::new(RedactionConfig::default());
    let analyzer = ContentAnalyzer::default();

    let mut rng = rand::thread_rng();
    let mut detected_total = 0usize;
    let mut sensitive_total = 0usize;

    for i in 0..count {
        let text = generate_text(&mut rng);
        let redaction = redactor.redact(&text);
        let detected = analyzer.analyze(&redaction.content);
        detected_total += usize::from(!detected.is_empty());

        let mut clip = NewClip::from_redaction(redaction, detected);
        sensitive_total += usize::from(clip.metadata.is_sensitive);
        clip.is_favorite = rng.gen_bool(FAVORITE_RATE);
        if rng.gen_bool(0.2) {
            clip.tags.insert(pick(&mut rng, TAGS).to_string());
        }

        db.insert_clip(&clip).expect("Failed to insert clip");

        if (i + 1) % 100 == 0 {
            println!("  Generated {}/{} items...", i + 1, count);
        }
    }

    println!();
    println!("Database created: {}", output_path.display());
    println!("  Items: {}", count);
    println!("  With a detected type: {}", detected_total);
    println!("  Sensitive (masked): {}", sensitive_total);
}

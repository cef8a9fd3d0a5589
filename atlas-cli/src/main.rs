//! atlas-cli — command-line frontend for the Atlas knowledge base
//!
//! Talks to the Atlas HTTP API. All output goes to stdout; errors and
//! connection failures go to stderr with a non-zero exit code.
//!
//! # Subcommands
//! - `list [--category <name>] [--json]` — list items
//! - `get <id> [--json]`                 — show one item
//! - `add --title .. --content .. --category .. [--location ..] [--lat ..] [--lon ..]`
//! - `update <id> --title .. --content .. --category .. [...]`
//! - `delete <id>`                       — delete an item
//! - `categories`                        — category names with counts
//! - `ask <question> [-n <top_k>] [--json]` — ask the knowledge base
//! - `status`                            — show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";
const DEFAULT_TOP_K: u32 = 4;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "atlas-cli",
    version,
    about = "Atlas knowledge base — geo-tagged notes with retrieval-augmented answers"
)]
struct Cli {
    /// Atlas HTTP server URL (overrides ATLAS_HTTP_URL env var)
    #[arg(long, env = "ATLAS_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List knowledge items, newest first
    List {
        /// Only show items in this category
        #[arg(long)]
        category: Option<String>,

        /// Output raw JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Show a single knowledge item
    Get {
        /// Item id
        id: i64,

        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a knowledge item
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,

        #[arg(long)]
        category: String,

        /// Free-text location (replaced by reverse geocoding when coordinates are given)
        #[arg(long)]
        location: Option<String>,

        /// Latitude in decimal degrees
        #[arg(long)]
        lat: Option<f64>,

        /// Longitude in decimal degrees
        #[arg(long)]
        lon: Option<f64>,
    },

    /// Replace an existing knowledge item
    Update {
        /// Item id
        id: i64,

        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        lat: Option<f64>,

        #[arg(long)]
        lon: Option<f64>,
    },

    /// Delete a knowledge item
    Delete {
        /// Item id
        id: i64,
    },

    /// List categories with item counts
    Categories,

    /// Ask a question against the knowledge base
    Ask {
        /// Question text
        question: String,

        /// Number of knowledge chunks to retrieve
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_K)]
        top_k: u32,

        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show Atlas server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

/// A knowledge item as returned by the Atlas HTTP API
#[derive(Debug, Deserialize)]
pub struct ApiItem {
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    pub category: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One retrieval source in an ask response
#[derive(Debug, Deserialize)]
pub struct ApiSource {
    pub item_id: i64,
    pub title: String,
    pub category: String,
    pub score: f64,
}

/// The full ask response from POST /ask
#[derive(Debug, Deserialize)]
pub struct ApiAnswer {
    pub query: String,
    pub response: String,
    #[serde(default)]
    pub sources: Vec<ApiSource>,
    pub took_ms: Option<u64>,
}

// ============================================================================
// Output formatting
// ============================================================================

/// One line per item: "#12  [landmark]  Lighthouse  (Cape Point)"
pub fn format_item_line(item: &ApiItem) -> String {
    let id = item.id.map_or_else(|| "?".to_string(), |i| i.to_string());
    let mut line = format!("#{}  [{}]  {}", id, item.category, item.title);
    if let Some(location) = &item.location {
        line.push_str(&format!("  ({})", location));
    }
    line
}

/// Multi-line detail view of a single item.
pub fn format_item_detail(item: &ApiItem) -> String {
    let mut out = String::new();
    let id = item.id.map_or_else(|| "?".to_string(), |i| i.to_string());
    out.push_str(&format!("Id:        {}\n", id));
    out.push_str(&format!("Title:     {}\n", item.title));
    out.push_str(&format!("Category:  {}\n", item.category));
    if let Some(location) = &item.location {
        out.push_str(&format!("Location:  {}\n", location));
    }
    if let (Some(lat), Some(lon)) = (item.latitude, item.longitude) {
        out.push_str(&format!("Position:  {:.4}, {:.4}\n", lat, lon));
    }
    out.push_str(&format!("\n{}\n", item.content));
    out
}

/// Ask output: answer text, then sources with scores as percentages.
pub fn format_answer(answer: &ApiAnswer) -> String {
    let mut out = String::new();
    out.push_str(&answer.response);
    out.push('\n');
    if !answer.sources.is_empty() {
        out.push_str("\nSources:\n");
        for s in &answer.sources {
            out.push_str(&format!(
                "  #{}  [{}]  {}  ({:.0}%)\n",
                s.item_id,
                s.category,
                s.title,
                s.score * 100.0
            ));
        }
    }
    if let Some(took_ms) = answer.took_ms {
        out.push_str(&format!("\n({} ms)\n", took_ms));
    }
    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn http_client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send a request and exit with a message on connection or HTTP failure.
fn check_response(
    resp: Result<reqwest::blocking::Response, reqwest::Error>,
    url: &str,
) -> reqwest::blocking::Response {
    let resp = match resp {
        Ok(r) => r,
        Err(e) => {
            eprintln!("atlas-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("atlas-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    resp
}

fn do_list(server: &str, category: Option<&str>, json_output: bool) -> anyhow::Result<()> {
    let client = http_client(30)?;
    let mut url = format!("{}/knowledge", server);
    if let Some(cat) = category {
        url.push_str(&format!("?category={}", cat));
    }

    let resp = check_response(client.get(&url).send(), &url);

    if json_output {
        let body: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let items: Vec<ApiItem> = resp.json()?;
    if items.is_empty() {
        eprintln!("No knowledge items found");
        return Ok(());
    }
    for item in &items {
        println!("{}", format_item_line(item));
    }

    Ok(())
}

fn do_get(server: &str, id: i64, json_output: bool) -> anyhow::Result<()> {
    let client = http_client(30)?;
    let url = format!("{}/knowledge/{}", server, id);
    let resp = check_response(client.get(&url).send(), &url);

    if json_output {
        let body: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let item: ApiItem = resp.json()?;
    print!("{}", format_item_detail(&item));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn do_save(
    server: &str,
    id: Option<i64>,
    title: &str,
    content: &str,
    category: &str,
    location: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> anyhow::Result<()> {
    let client = http_client(30)?;

    let mut body = serde_json::json!({
        "title": title,
        "content": content,
        "category": category,
    });
    if let Some(obj) = body.as_object_mut() {
        if let Some(location) = location {
            obj.insert("location".to_string(), serde_json::json!(location));
        }
        if let Some(lat) = lat {
            obj.insert("latitude".to_string(), serde_json::json!(lat));
        }
        if let Some(lon) = lon {
            obj.insert("longitude".to_string(), serde_json::json!(lon));
        }
    }

    let (url, resp) = match id {
        Some(id) => {
            let url = format!("{}/knowledge/{}", server, id);
            let resp = client.put(&url).json(&body).send();
            (url, resp)
        }
        None => {
            let url = format!("{}/knowledge", server);
            let resp = client.post(&url).json(&body).send();
            (url, resp)
        }
    };

    let resp = check_response(resp, &url);
    let item: ApiItem = resp.json()?;
    let verb = if id.is_some() { "Updated" } else { "Created" };
    println!("{} {}", verb, format_item_line(&item));
    Ok(())
}

fn do_delete(server: &str, id: i64) -> anyhow::Result<()> {
    let client = http_client(30)?;
    let url = format!("{}/knowledge/{}", server, id);
    check_response(client.delete(&url).send(), &url);
    println!("Deleted #{}", id);
    Ok(())
}

fn do_categories(server: &str) -> anyhow::Result<()> {
    let client = http_client(30)?;
    let url = format!("{}/categories", server);
    let resp = check_response(client.get(&url).send(), &url);

    let categories: Vec<serde_json::Value> = resp.json()?;
    if categories.is_empty() {
        eprintln!("No categories yet");
        return Ok(());
    }
    for c in &categories {
        println!(
            "{:>5}  {}",
            c["count"].as_i64().unwrap_or(0),
            c["category"].as_str().unwrap_or("?")
        );
    }
    Ok(())
}

fn do_ask(server: &str, question: &str, top_k: u32, json_output: bool) -> anyhow::Result<()> {
    // RAG calls an LLM, so allow more time than the CRUD endpoints
    let client = http_client(120)?;
    let url = format!("{}/ask", server);
    let body = serde_json::json!({
        "query": question,
        "top_k": top_k,
    });

    let resp = check_response(client.post(&url).json(&body).send(), &url);

    if json_output {
        let body: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let answer: ApiAnswer = resp.json()?;
    print!("{}", format_answer(&answer));
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = http_client(10)?;
    let url = format!("{}/health", server);
    let resp = client.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Atlas server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:      {}", body["version"].as_str().unwrap_or("?"));
            println!("PostgreSQL:   {}", body["postgresql"].as_str().unwrap_or("?"));
            println!("pgvector:     {}", body["pgvector"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("atlas-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("atlas-cli: cannot reach {} — {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::List { category, json } => do_list(&server, category.as_deref(), json),
        Commands::Get { id, json } => do_get(&server, id, json),
        Commands::Add {
            title,
            content,
            category,
            location,
            lat,
            lon,
        } => do_save(
            &server,
            None,
            &title,
            &content,
            &category,
            location.as_deref(),
            lat,
            lon,
        ),
        Commands::Update {
            id,
            title,
            content,
            category,
            location,
            lat,
            lon,
        } => do_save(
            &server,
            Some(id),
            &title,
            &content,
            &category,
            location.as_deref(),
            lat,
            lon,
        ),
        Commands::Delete { id } => do_delete(&server, id),
        Commands::Categories => do_categories(&server),
        Commands::Ask {
            question,
            top_k,
            json,
        } => do_ask(&server, &question, top_k, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("atlas-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_item(id: Option<i64>, title: &str, category: &str) -> ApiItem {
        ApiItem {
            id,
            title: title.to_string(),
            content: "Some content".to_string(),
            category: category.to_string(),
            location: None,
            latitude: None,
            longitude: None,
        }
    }

    // ========================================================================
    // TEST 1: item line — id, category, title
    // ========================================================================
    #[test]
    fn test_format_item_line_basic() {
        let item = mock_item(Some(12), "Lighthouse", "landmark");
        assert_eq!(format_item_line(&item), "#12  [landmark]  Lighthouse");
    }

    // ========================================================================
    // TEST 2: item line — location appended in parentheses
    // ========================================================================
    #[test]
    fn test_format_item_line_with_location() {
        let mut item = mock_item(Some(3), "Lighthouse", "landmark");
        item.location = Some("Cape Point".to_string());
        assert_eq!(
            format_item_line(&item),
            "#3  [landmark]  Lighthouse  (Cape Point)"
        );
    }

    // ========================================================================
    // TEST 3: item line — missing id renders as '?'
    // ========================================================================
    #[test]
    fn test_format_item_line_no_id() {
        let item = mock_item(None, "Note", "misc");
        assert!(format_item_line(&item).starts_with("#?"));
    }

    // ========================================================================
    // TEST 4: detail view — coordinates only when both present
    // ========================================================================
    #[test]
    fn test_format_item_detail_coordinates() {
        let mut item = mock_item(Some(1), "Lighthouse", "landmark");
        item.latitude = Some(-34.3568);
        item.longitude = Some(18.4921);
        let out = format_item_detail(&item);
        assert!(out.contains("Position:  -34.3568, 18.4921"));

        item.longitude = None;
        let out = format_item_detail(&item);
        assert!(
            !out.contains("Position:"),
            "a single coordinate must not render a position"
        );
    }

    // ========================================================================
    // TEST 5: detail view — location line only when present
    // ========================================================================
    #[test]
    fn test_format_item_detail_location_optional() {
        let item = mock_item(Some(1), "Note", "misc");
        let out = format_item_detail(&item);
        assert!(!out.contains("Location:"));
        assert!(out.contains("Some content"));
    }

    // ========================================================================
    // TEST 6: answer — sources rendered with percentage scores
    // ========================================================================
    #[test]
    fn test_format_answer_with_sources() {
        let answer = ApiAnswer {
            query: "where is the lighthouse".to_string(),
            response: "At Cape Point.".to_string(),
            sources: vec![ApiSource {
                item_id: 7,
                title: "Lighthouse".to_string(),
                category: "landmark".to_string(),
                score: 0.87,
            }],
            took_ms: Some(42),
        };

        let out = format_answer(&answer);
        assert!(out.starts_with("At Cape Point."));
        assert!(out.contains("Sources:"));
        assert!(out.contains("#7  [landmark]  Lighthouse  (87%)"));
        assert!(out.contains("(42 ms)"));
    }

    // ========================================================================
    // TEST 7: answer — no sources section when retrieval found nothing
    // ========================================================================
    #[test]
    fn test_format_answer_without_sources() {
        let answer = ApiAnswer {
            query: "anything".to_string(),
            response: "No relevant knowledge found.".to_string(),
            sources: vec![],
            took_ms: None,
        };

        let out = format_answer(&answer);
        assert!(!out.contains("Sources:"));
        assert!(!out.contains("ms)"));
    }

    // ========================================================================
    // TEST 8: ask response deserializes with absent optional fields
    // ========================================================================
    #[test]
    fn test_api_answer_deserializes_minimal() {
        let json = r#"{"query": "q", "response": "r"}"#;
        let answer: ApiAnswer = serde_json::from_str(json).unwrap();
        assert!(answer.sources.is_empty());
        assert!(answer.took_ms.is_none());
    }
}

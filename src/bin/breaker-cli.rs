use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "breaker-cli")]
#[command(about = "Management CLI for the worker-gateway circuit breaker", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "ADMIN_API_KEY", default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show breaker state, counters and rates
    Metrics,
    /// Show the most recent breaker events
    Events {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Force the breaker open
    Trip {
        reason: String,
    },
    /// Force the breaker closed and clear its window
    Reset {
        reason: String,
    },
    /// Run a health probe through the health breaker
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Metrics => client.get(format!("{base}/admin/breaker/metrics")),
        Commands::Events { limit } => client
            .get(format!("{base}/admin/breaker/events"))
            .query(&[("limit", limit)]),
        Commands::Trip { reason } => client
            .post(format!("{base}/admin/breaker/trip"))
            .json(&json!({ "reason": reason })),
        Commands::Reset { reason } => client
            .post(format!("{base}/admin/breaker/reset"))
            .json(&json!({ "reason": reason })),
        Commands::Health => client.get(format!("{base}/admin/breaker/health")),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

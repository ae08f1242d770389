use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "shield-cli")]
#[command(about = "Management CLI for Request Shield rules", long_about = None)]
struct Cli {
    /// Base URL of the admin API, including its prefix.
    #[arg(short, long, default_value = "http://localhost:8080/api/waf", env = "SHIELD_ADMIN_URL")]
    url: String,

    /// Bearer token, if the admin API requires one.
    #[arg(short, long, env = "SHIELD_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether request filtering is enabled
    Status,
    /// Turn request filtering on
    Enable,
    /// Turn request filtering off (every request passes)
    Disable,
    /// Manage rules
    #[command(subcommand)]
    Rules(RuleCommands),
    /// Re-read rules from the rules file
    Reload,
    /// Write current rules to the rules file
    Save,
    /// Dry-run a query string and/or path against block rules
    Test {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        path: Option<String>,
    },
}

#[derive(Subcommand)]
enum RuleCommands {
    /// List rules in evaluation order
    List,
    /// Show one rule
    Get { id: String },
    /// Create a rule
    Add {
        pattern: String,
        #[arg(long, default_value = "block")]
        action: String,
        #[arg(long, default_value = "query")]
        scope: String,
        /// Lower runs first; omitted means 1000
        #[arg(long)]
        priority: Option<i32>,
        #[arg(long)]
        id: Option<String>,
        /// Create the rule disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Update fields of a rule. The rule's enabled flag is always sent.
    Update {
        id: String,
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
        #[arg(long)]
        disabled: bool,
    },
    /// Delete a rule
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/').to_string();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    let request = |method: Method, path: &str| -> RequestBuilder {
        client
            .request(method, format!("{}{}", base, path))
            .headers(headers.clone())
    };

    let builder = match cli.command {
        Commands::Status => request(Method::GET, "/enabled"),
        Commands::Enable => request(Method::POST, "/enabled").query(&[("enabled", "true")]),
        Commands::Disable => request(Method::POST, "/enabled").query(&[("enabled", "false")]),
        Commands::Reload => request(Method::POST, "/rules:reload"),
        Commands::Save => request(Method::POST, "/rules:save"),
        Commands::Test { query, path } => {
            let mut params = Vec::new();
            if let Some(q) = query {
                params.push(("query", q));
            }
            if let Some(p) = path {
                params.push(("path", p));
            }
            request(Method::POST, "/test").query(&params)
        }
        Commands::Rules(RuleCommands::List) => request(Method::GET, "/rules"),
        Commands::Rules(RuleCommands::Get { id }) => request(Method::GET, &format!("/rules/{}", id)),
        Commands::Rules(RuleCommands::Add {
            pattern,
            action,
            scope,
            priority,
            id,
            disabled,
        }) => {
            let mut body = json!({
                "pattern": pattern,
                "action": action,
                "scope": scope,
                "enabled": !disabled,
            });
            if let Some(priority) = priority {
                body["priority"] = json!(priority);
            }
            if let Some(id) = id {
                body["id"] = json!(id);
            }
            request(Method::POST, "/rules").json(&body)
        }
        Commands::Rules(RuleCommands::Update {
            id,
            pattern,
            action,
            scope,
            priority,
            disabled,
        }) => {
            let mut body = Map::new();
            body.insert("enabled".into(), json!(!disabled));
            for (field, value) in [("pattern", pattern), ("action", action), ("scope", scope)] {
                if let Some(value) = value {
                    body.insert(field.into(), json!(value));
                }
            }
            if let Some(priority) = priority {
                body.insert("priority".into(), json!(priority));
            }
            request(Method::PUT, &format!("/rules/{}", id)).json(&Value::Object(body))
        }
        Commands::Rules(RuleCommands::Delete { id }) => request(Method::DELETE, &format!("/rules/{}", id)),
    };

    print_response(builder.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

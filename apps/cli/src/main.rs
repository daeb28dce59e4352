use std::io::Read;

use anyhow::{bail, Context as AnyhowContext, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use clap::{ArgAction, Parser, Subcommand};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(
    name = "shorouk",
    about = "Command line client for the radiology API server",
    version,
    arg_required_else_help = true
)]
struct Cli {
    /// Server base URL (without the /api/v1 prefix).
    #[arg(
        long,
        global = true,
        env = "SHOROUK_URL",
        default_value = "http://localhost:3000"
    )]
    url: String,
    /// Access token for authenticated commands.
    #[arg(long, global = true, env = "SHOROUK_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Pretty-print JSON output.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pretty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the server's dependency health.
    Health,

    /// Log in and print the issued tokens.
    Login {
        /// Username or email address.
        username: String,
        /// Password. Read from stdin when omitted.
        #[arg(long, env = "SHOROUK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Print only the access token (handy for `export SHOROUK_TOKEN=...`).
        #[arg(long, action = ArgAction::SetTrue)]
        token_only: bool,
    },

    /// Query the audit trail (admin).
    AuditLogs {
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        entity_type: Option<String>,
        #[arg(long)]
        entity_id: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Staff account commands (admin).
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Hash a password the way the server stores it (for seeding databases).
    HashPassword {
        /// Plaintext password. Read from stdin when omitted.
        password: Option<String>,
    },

    /// Print CLI version.
    Version,
}

#[derive(Subcommand)]
enum UserCommands {
    /// List staff accounts.
    List {
        /// Filter by role (admin, nurse, doctor).
        #[arg(long)]
        role: Option<String>,
        /// Filter by active flag.
        #[arg(long)]
        active: Option<bool>,
        /// Substring of username, full name or email.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

struct ApiClient {
    http: Client,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    fn new(url: &str, token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("shorouk-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base: format!("{}/api/v1", url.trim_end_matches('/')),
            token,
        })
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.base, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;
        let value: Value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .with_context(|| format!("Server returned non-JSON response ({status})"))?
        };

        if !status.is_success() {
            bail!("{}", describe_error(status, &value));
        }
        Ok(value)
    }

    fn require_token(&self) -> Result<()> {
        if self.token.is_none() {
            bail!("This command needs an access token: pass --token or set SHOROUK_TOKEN");
        }
        Ok(())
    }
}

fn describe_error(status: StatusCode, body: &Value) -> String {
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("request failed");
    let mut out = format!("{status}: {message}");
    if let Some(details) = body.get("details").and_then(Value::as_array) {
        for detail in details {
            let field = detail.get("field").and_then(Value::as_str).unwrap_or("?");
            let msg = detail.get("message").and_then(Value::as_str).unwrap_or("");
            out.push_str(&format!("\n  {field}: {msg}"));
        }
    }
    out
}

/// Builds `?a=b&c=d` from the parameters that are set.
fn query_string(params: &[(&str, Option<String>)]) -> String {
    let pairs: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(|v| format!("{key}={}", urlencoding::encode(v)))
        })
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

fn read_secret_from_stdin(what: &str) -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .with_context(|| format!("Failed to read {what} from stdin"))?;
    let secret = buf.trim_end_matches(['\r', '\n']).to_string();
    if secret.is_empty() {
        bail!("No {what} given");
    }
    Ok(secret)
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.url, cli.token.clone())?;

    match cli.command {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Health => {
            let report = client.send(Method::GET, "/admin/health", None).await?;
            print_json(&report, cli.pretty)?;
        }
        Commands::Login {
            username,
            password,
            token_only,
        } => {
            let password = match password {
                Some(p) => p,
                None => read_secret_from_stdin("password")?,
            };
            let body = json!({ "username": username, "password": password });
            let response = client.send(Method::POST, "/auth/login", Some(&body)).await?;
            if token_only {
                let token = response
                    .get("token")
                    .and_then(Value::as_str)
                    .context("Login response carries no token")?;
                println!("{token}");
            } else {
                print_json(&response, cli.pretty)?;
            }
        }
        Commands::AuditLogs {
            user_id,
            action,
            entity_type,
            entity_id,
            limit,
            offset,
        } => {
            client.require_token()?;
            let query = query_string(&[
                ("user_id", user_id),
                ("action", action),
                ("entity_type", entity_type),
                ("entity_id", entity_id),
                ("limit", Some(limit.to_string())),
                ("offset", Some(offset.to_string())),
            ]);
            let logs = client
                .send(Method::GET, &format!("/admin/audit-logs{query}"), None)
                .await?;
            print_json(&logs, cli.pretty)?;
        }
        Commands::Users {
            command:
                UserCommands::List {
                    role,
                    active,
                    search,
                    limit,
                },
        } => {
            client.require_token()?;
            let query = query_string(&[
                ("role", role),
                ("is_active", active.map(|a| a.to_string())),
                ("search", search),
                ("limit", Some(limit.to_string())),
            ]);
            let users = client
                .send(Method::GET, &format!("/users{query}"), None)
                .await?;
            print_json(&users, cli.pretty)?;
        }
        Commands::HashPassword { password } => {
            let password = match password {
                Some(p) => p,
                None => read_secret_from_stdin("password")?,
            };
            println!("{}", hash_password(&password)?);
        }
    }

    Ok(())
}

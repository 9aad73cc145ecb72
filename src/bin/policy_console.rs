//! Policy Console Command Line Interface
//!
//! Terminal front end for the policy registry: sign in, list and inspect
//! Cerbos policies, create/edit/validate/delete them, publish Rego to the OPA
//! registry, and run SQL through the query service.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (token is stored under ~/.policy-console/token)
//! policy_console login --email admin@example.com
//!
//! # List policies
//! policy_console list
//!
//! # Create a resource policy from a file
//! policy_console create --path iceberg/sales.yaml --file sales.yaml
//!
//! # Run a query
//! echo 'select * from iceberg.sales.orders' | policy_console query
//! ```
//!
//! Exit codes: 0 success, 1 error, 2 login required.

use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use policy_console::heuristics::DEFAULT_RESOURCE_KIND;
use policy_console::opa::{published_message, DEFAULT_POLICY_NAME, DEFAULT_POLICY_PATH};
use policy_console::{
    ConsoleConfig, ConsoleError, DeleteOutcome, OpaPublisher, PolicyConsole, PolicyListView,
    QueryOutcome, QueryPanel, Session, SessionGuard,
};
use policy_types::PolicyKind;

#[derive(Parser)]
#[command(name = "policy_console")]
#[command(version = "0.1.0")]
#[command(about = "Manage Cerbos/OPA policies and run queries against the policy registry")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Registry base URL (overrides POLICY_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Token file (overrides POLICY_TOKEN_FILE)
    #[arg(long, global = true)]
    token_file: Option<PathBuf>,

    /// Output format: json, text, or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange email/password for a token and store it
    Login {
        #[arg(long)]
        email: String,

        /// Password (prompted on stdin if omitted)
        #[arg(long, env = "POLICY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List Cerbos policies
    List,

    /// Show one policy
    View { path: String },

    /// Create a policy (starts from the kind's template unless --file is given)
    Create {
        #[arg(long)]
        path: String,

        /// Template to start from: resource or principal
        #[arg(long, default_value = "resource", conflicts_with = "file")]
        kind: PolicyKind,

        /// Resource kind written into a resource template
        #[arg(long, conflicts_with = "file")]
        resource: Option<String>,

        /// Policy document (template used if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Update an existing policy
    Edit {
        path: String,

        /// Switch kind; replaces the content with that kind's template
        #[arg(long, conflicts_with = "file")]
        kind: Option<PolicyKind>,

        /// Retarget a resource policy
        #[arg(long, conflicts_with = "file")]
        resource: Option<String>,

        /// New document (reads stdin if neither --file nor a switch is given)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Validate a policy document without saving it
    Validate {
        /// Input file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete a policy
    Delete {
        path: String,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Run SQL through the query service
    Query {
        /// SQL text (reads --file or stdin if omitted)
        text: Option<String>,

        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// OPA policy registry
    #[command(subcommand)]
    Opa(OpaCommands),
}

#[derive(Subcommand)]
enum OpaCommands {
    /// List stored OPA policies
    List,

    /// Store Rego text and publish it
    Publish {
        #[arg(long, default_value = DEFAULT_POLICY_NAME)]
        name: String,

        #[arg(long, default_value = DEFAULT_POLICY_PATH)]
        path: String,

        /// Rego source (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

const EXIT_LOGIN_REQUIRED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,policy_console=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => return report(&e, format),
    };
    let login_url = config.login_url.clone();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_login_required(&e) => {
            if format == OutputFormat::Json {
                println!(
                    "{}",
                    serde_json::json!({ "error": "login_required", "login_url": login_url })
                );
            } else {
                eprintln!(
                    "{}: not signed in or session expired. Sign in at {} or run `policy_console login`.",
                    "login required".yellow().bold(),
                    login_url
                );
            }
            ExitCode::from(EXIT_LOGIN_REQUIRED)
        }
        Err(e) => report(&e, format),
    }
}

fn load_config(cli: &Cli) -> Result<ConsoleConfig> {
    let mut config = ConsoleConfig::from_env()?;
    if let Some(base) = &cli.api_base {
        config = config.with_api_base(base.trim_end_matches('/'));
    }
    if let Some(path) = &cli.token_file {
        config = config.with_token_file(path);
    }
    Ok(config)
}

fn is_login_required(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ConsoleError>()
        .is_some_and(ConsoleError::is_login_required)
}

fn report(e: &anyhow::Error, format: OutputFormat) -> ExitCode {
    if format == OutputFormat::Json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("{}: {:#}", "error".red().bold(), e);
    }
    ExitCode::FAILURE
}

async fn run(cli: Cli, config: ConsoleConfig) -> Result<()> {
    let format = cli.format;
    let guard = SessionGuard::from_config(config);

    match cli.command {
        Commands::Login { email, password } => cmd_login(&guard, &email, password, format).await,
        Commands::Logout => {
            guard.logout()?;
            print_status(format, "Signed out");
            Ok(())
        }
        Commands::Whoami => cmd_whoami(&guard.require().await?, format),
        Commands::List => cmd_list(&guard.require().await?, format).await,
        Commands::View { path } => cmd_view(&guard.require().await?, &path, format).await,
        Commands::Create {
            path,
            kind,
            resource,
            file,
        } => {
            let session = guard.require().await?;
            cmd_create(&session, path, kind, resource, file, format).await
        }
        Commands::Edit {
            path,
            kind,
            resource,
            file,
        } => {
            let session = guard.require().await?;
            cmd_edit(&session, &path, kind, resource, file, format).await
        }
        Commands::Validate { file } => {
            cmd_validate(&guard.require().await?, file, format).await
        }
        Commands::Delete { path, yes } => {
            cmd_delete(&guard.require().await?, &path, yes, format).await
        }
        Commands::Query { text, file } => {
            let session = guard.require().await?;
            cmd_query(&session, text, file, format).await
        }
        Commands::Opa(command) => {
            let session = guard.require().await?;
            cmd_opa(&session, command, format).await
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

async fn cmd_login(
    guard: &SessionGuard<policy_console::FileTokenStore>,
    email: &str,
    password: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_line("Password: ")?,
    };
    let client = guard.anonymous_client()?;
    let user = guard.login(&client, email, &password).await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "success": true, "user": user }))?,
        OutputFormat::Text | OutputFormat::Pretty => {
            println!("{} Signed in as {}", "OK".green().bold(), email);
        }
    }
    Ok(())
}

fn cmd_whoami(session: &Session, format: OutputFormat) -> Result<()> {
    let Some(user) = session.user() else {
        anyhow::bail!("user info unavailable; the registry did not answer /users/me");
    };

    match format {
        OutputFormat::Json => print_json(user)?,
        OutputFormat::Text | OutputFormat::Pretty => {
            let name = [user.first_name.as_deref(), user.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            println!("{}", user.email.bold());
            if !name.is_empty() {
                println!("  Name:  {}", name);
            }
            if !user.roles.is_empty() {
                println!("  Roles: {}", user.roles.join(", "));
            }
        }
    }
    Ok(())
}

async fn cmd_list(session: &Session, format: OutputFormat) -> Result<()> {
    let console = PolicyConsole::new(session.policy_registry());
    let Some(view) = console.refresh().await? else {
        return Ok(());
    };

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Text => print!("{}", view),
        OutputFormat::Pretty => match &view {
            PolicyListView::Empty { message } => println!("{}", message.dimmed()),
            PolicyListView::Cards { heading, cards } => {
                println!("{}", heading.bold());
                for card in cards {
                    println!();
                    println!("{}", card.label.cyan().bold());
                    println!("  Path:     {}", card.path);
                    println!("  Type:     {}", card.kind_label());
                    if card.shows_resource() {
                        println!("  Resource: {}", card.resource_kind);
                    }
                    println!("  Version:  {}", card.version);
                }
            }
        },
    }
    Ok(())
}

async fn cmd_view(session: &Session, path: &str, format: OutputFormat) -> Result<()> {
    let console = PolicyConsole::new(session.policy_registry());
    let view = console.view(path).await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Text => print!("{}", view.content),
        OutputFormat::Pretty => {
            println!("{}", view.title.bold());
            println!("{} {}", "Type:".dimmed(), view.kind);
            println!();
            println!("{}", view.content);
        }
    }
    Ok(())
}

async fn cmd_create(
    session: &Session,
    path: String,
    kind: PolicyKind,
    resource: Option<String>,
    file: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut console = PolicyConsole::new(session.policy_registry());
    let form = console.form_mut();
    form.open_create(kind);
    form.set_path(path)?;
    if let Some(resource) = resource.filter(|r| r != DEFAULT_RESOURCE_KIND) {
        form.select_resource_kind(&resource)?;
    }
    if let Some(file) = file {
        form.set_draft(read_file(&file)?)?;
    }

    let record = console.save().await?;
    print_saved(format, "Policy created successfully", &record.path)
}

async fn cmd_edit(
    session: &Session,
    path: &str,
    kind: Option<PolicyKind>,
    resource: Option<String>,
    file: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut console = PolicyConsole::new(session.policy_registry());
    let form = console.form_mut();
    form.open_edit(path).await?;

    let switched = kind.is_some() || resource.is_some();
    if let Some(kind) = kind {
        form.select_kind(kind)?;
    }
    if let Some(resource) = resource {
        form.select_resource_kind(&resource)?;
    }
    match file {
        Some(file) => form.set_draft(read_file(&file)?)?,
        None if !switched => form.set_draft(read_input(None)?)?,
        None => {}
    }

    let record = console.save().await?;
    print_saved(format, "Policy updated successfully", &record.path)
}

async fn cmd_validate(session: &Session, file: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let source = read_input(file)?;
    let mut console = PolicyConsole::new(session.policy_registry());
    let form = console.form_mut();
    form.open_create(PolicyKind::default());
    form.set_draft(source)?;
    let result = form.validate().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text | OutputFormat::Pretty => {
            if result.valid {
                println!(
                    "{} {}",
                    "OK".green().bold(),
                    result.message.as_deref().unwrap_or("Policy is valid!")
                );
            } else {
                println!("{} Validation errors:", "FAIL".red().bold());
                for error in &result.errors {
                    println!("  - {}", error);
                }
            }
        }
    }

    if result.valid {
        Ok(())
    } else {
        Err(ConsoleError::ValidationFailed(result.errors).into())
    }
}

async fn cmd_delete(session: &Session, path: &str, yes: bool, format: OutputFormat) -> Result<()> {
    let console = PolicyConsole::new(session.policy_registry());
    let confirm = |prompt: &str| yes || ask_yes_no(prompt);

    match console.delete(path, &confirm).await? {
        DeleteOutcome::Deleted => print_saved(format, "Policy deleted successfully", path),
        DeleteOutcome::Cancelled => {
            print_status(format, "Delete cancelled");
            Ok(())
        }
    }
}

async fn cmd_query(
    session: &Session,
    text: Option<String>,
    file: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let sql = match text {
        Some(text) => text,
        None => read_input(file)?,
    };
    let panel = QueryPanel::new(session.query_service());
    let Some(outcome) = panel.execute(&sql).await? else {
        return Ok(());
    };

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Text | OutputFormat::Pretty => {
            let status = outcome.status_message();
            if format == OutputFormat::Pretty {
                println!("{}", status.green());
            } else {
                println!("{}", status);
            }
            if let QueryOutcome::Table { table, .. } = &outcome {
                print!("{}", table);
            }
        }
    }
    Ok(())
}

async fn cmd_opa(session: &Session, command: OpaCommands, format: OutputFormat) -> Result<()> {
    let publisher = OpaPublisher::new(session.opa_registry());

    match command {
        OpaCommands::List => {
            let policies = publisher.list().await?;
            match format {
                OutputFormat::Json => print_json(&policies)?,
                OutputFormat::Text | OutputFormat::Pretty => {
                    for p in &policies {
                        let state = if p.published { "published" } else { "draft" };
                        println!(
                            "{:>5}  {:<20} {:<30} v{} {}",
                            p.id,
                            p.name,
                            p.path,
                            p.version.unwrap_or(0),
                            state
                        );
                    }
                }
            }
        }
        OpaCommands::Publish { name, path, file } => {
            let rego = read_input(file)?;
            let id = publisher.publish(&name, &path, &rego).await?;
            match format {
                OutputFormat::Json => {
                    print_json(&serde_json::json!({ "success": true, "id": id }))?
                }
                OutputFormat::Text | OutputFormat::Pretty => {
                    println!("{} {}", "OK".green().bold(), published_message(id))
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{}", text);
    Ok(())
}

fn print_status(format: OutputFormat, message: &str) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "message": message })),
        OutputFormat::Text | OutputFormat::Pretty => println!("{}", message),
    }
}

fn print_saved(format: OutputFormat, message: &str, path: &str) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&serde_json::json!({ "success": true, "path": path, "message": message }))
        }
        OutputFormat::Text | OutputFormat::Pretty => {
            println!("{} {}: {}", "OK".green().bold(), message, path);
            Ok(())
        }
    }
}

fn read_file(path: &PathBuf) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => read_file(&path),
        None => {
            if io::stdin().is_terminal() {
                anyhow::bail!("No input provided. Use --file or pipe input via stdin.");
            }
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{}", prompt);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn ask_yes_no(prompt: &str) -> bool {
    match prompt_line(&format!("{} [y/N] ", prompt)) {
        Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

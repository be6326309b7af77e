mod config;
mod serve;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use stockwise_odata::{ErpClient, QueryBuilder, QuerySpec};
use stockwise_reports::{config_error, dispatch, find_tool, strip_target, unknown_tool, TOOLS};
use tracing_subscriber::EnvFilter;

/// Output format for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Log filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "stockwise_odata=info,stockwise_reports=info,stockwise_cli=info";
const VERBOSE_FILTER: &str = "stockwise_odata=debug,stockwise_reports=debug,stockwise_cli=debug";

/// Procurement and inventory reports over an ERP OData API.
#[derive(Parser)]
#[command(
    name = "stockwise",
    version,
    about = "Procurement and inventory reports over an ERP OData API"
)]
struct Cli {
    /// Output format for listings (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// TOML config file; SAP_* environment variables are used when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log request URLs and retry decisions
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available report tools
    Tools,

    /// Run one report tool and print its JSON result
    Call {
        /// Tool name, optionally prefixed with `<target>___`
        tool: String,
        /// Parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
        /// Single parameter as key=value (repeatable, overrides --params)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        param: Vec<String>,
    },

    /// Render the request URL for an entity query without sending it
    Url {
        /// Entity path, e.g. /sap/opu/odata/sap/API_MATERIAL_STOCK_SRV/A_MaterialStock
        entity: String,
        /// OData filter expression
        #[arg(long)]
        filter: Option<String>,
        /// Comma-separated field selection, most important first
        #[arg(long)]
        select: Option<String>,
        /// Sort expression, e.g. "PurchaseOrder desc"
        #[arg(long)]
        orderby: Option<String>,
        /// Maximum rows
        #[arg(long)]
        top: Option<u32>,
    },

    /// Start the HTTP tool server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Tools => cmd_tools(cli.output),
        Commands::Call {
            tool,
            params,
            param,
        } => cmd_call(cli.config.as_deref(), &tool, params.as_deref(), &param),
        Commands::Url {
            entity,
            filter,
            select,
            orderby,
            top,
        } => {
            let mut spec = QuerySpec::new(entity);
            spec.filter = filter;
            spec.order_by = orderby;
            spec.top = top;
            if let Some(select) = select {
                spec.select = select
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(String::from)
                    .collect();
            }
            cmd_url(cli.config.as_deref(), &spec);
        }
        Commands::Serve { port } => {
            let erp = match config::load(cli.config.as_deref()) {
                Ok(erp) => erp,
                Err(e) => {
                    eprintln!("error: {}", e);
                    process::exit(1);
                }
            };
            let client = Arc::new(ErpClient::new(Arc::new(erp)));
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("error: failed to create tokio runtime: {}", e);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(port, client)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
    }
}

/// Logs go to stderr so stdout stays pure JSON.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &Value) {
    let pretty =
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}

fn cmd_tools(output: OutputFormat) {
    match output {
        OutputFormat::Json => match serde_json::to_value(TOOLS) {
            Ok(tools) => print_json(&serde_json::json!({ "tools": tools })),
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
        OutputFormat::Text => {
            for tool in TOOLS {
                println!("{}", tool.name);
                println!("    {}", tool.description);
                for p in tool.params {
                    let marker = if p.required { " (required)" } else { "" };
                    println!("      --param {}=<{:?}>{}  {}", p.name, p.kind, marker, p.description);
                }
            }
        }
    }
}

/// Merge `--params` JSON with `--param key=value` pairs.
fn collect_params(json: Option<&str>, pairs: &[String]) -> Result<Map<String, Value>, String> {
    let mut params = match json {
        None => Map::new(),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => return Err(format!("--params must be a JSON object, got {}", other)),
            Err(e) => return Err(format!("--params is not valid JSON: {}", e)),
        },
    };
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("--param expects key=value, got '{}'", pair))?;
        params.insert(key.trim().to_string(), Value::String(value.to_string()));
    }
    Ok(params)
}

fn cmd_call(config_path: Option<&Path>, tool: &str, params_json: Option<&str>, pairs: &[String]) {
    if find_tool(tool).is_none() {
        print_json(&unknown_tool(strip_target(tool)));
        process::exit(1);
    }
    let params = match collect_params(params_json, pairs) {
        Ok(params) => params,
        Err(msg) => {
            eprintln!("error: {}", msg);
            process::exit(2);
        }
    };
    let erp = match config::load(config_path) {
        Ok(erp) => erp,
        Err(config::LoadError::Config(e)) => {
            print_json(&config_error(&e));
            process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let client = ErpClient::new(Arc::new(erp));
    let result = dispatch(&client, tool, &params);
    print_json(&result);
    if result.get("status").and_then(Value::as_str) == Some("error") {
        process::exit(1);
    }
}

fn cmd_url(config_path: Option<&Path>, spec: &QuerySpec) {
    match config::load(config_path) {
        Ok(erp) => println!("{}", QueryBuilder::new(&erp).build(spec)),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

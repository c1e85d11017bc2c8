use clap::{Parser, Subcommand};
use scopeflow::config::EngineConfig;
use scopeflow::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Resolve configurations, validate flows and simulate navigation decisions
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional path to an engine configuration TOML file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a flow definition and print errors and warnings
    Validate {
        /// Path to the flow JSON file
        flow_path: String,
    },
    /// Decide the next action for a screen
    Decide {
        /// Path to the flow JSON file
        flow_path: String,
        /// Current screen id
        screen: String,
        /// Optional path to a context JSON file
        #[arg(long)]
        context: Option<String>,
    },
    /// Resolve the active configuration record for a scope
    Resolve {
        /// Path to a JSON array of configuration records
        records_path: String,
        /// Screen or flow id to resolve
        entity: String,
        #[arg(long)]
        product: String,
        #[arg(long)]
        partner: Option<String>,
        #[arg(long)]
        branch: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => EngineConfig::default(),
    };
    init_logging(&config);

    // The CLI has no script runtime of its own; custom-code leaves evaluate to false.
    let engine = Engine::from_config(config, Arc::new(DisabledRunner));

    match cli.command {
        Command::Validate { flow_path } => run_validate(&engine, &flow_path),
        Command::Decide {
            flow_path,
            screen,
            context,
        } => run_decide(&engine, &flow_path, &screen, context.as_deref()),
        Command::Resolve {
            records_path,
            entity,
            product,
            partner,
            branch,
        } => {
            let scope = ConfigScope {
                scope_type: match (&partner, &branch) {
                    (_, Some(_)) => ScopeType::Branch,
                    (Some(_), None) => ScopeType::Partner,
                    (None, None) => ScopeType::Product,
                },
                product_code: product,
                partner_code: partner,
                branch_code: branch,
            };
            run_resolve(&engine, &records_path, &entity, &scope)
        }
    }
}

fn init_logging(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_validate(engine: &Engine, flow_path: &str) {
    let flow = FlowConfig::from_file(flow_path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load flow: {}", e)));

    let report = engine.validate_flow(&flow);

    println!("\nFlow '{}' ({})", flow.flow_id, flow.scope);
    println!("Screens:            {}", report.summary.screens);
    println!("Conditional Routes: {}", report.summary.conditional_routes);
    println!("Warnings:           {}", report.summary.warnings);

    for error in &report.errors {
        println!("  [error]   {}", error);
    }
    for warning in &report.warnings {
        println!("  [warning] {}", warning);
    }

    if report.is_valid {
        println!("\n-> Flow is valid and can be activated");
    } else {
        println!(
            "\n-> Flow is invalid: {} error(s) block activation",
            report.errors.len()
        );
        std::process::exit(2);
    }
}

fn run_decide(engine: &Engine, flow_path: &str, screen: &str, context_path: Option<&str>) {
    let flow = FlowConfig::from_file(flow_path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load flow: {}", e)));
    let context = match context_path {
        Some(path) => EvaluationContext::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load context: {}", e))),
        None => {
            println!("No context file provided. Using an empty context.");
            EvaluationContext::new()
        }
    };

    let start = Instant::now();
    let decision = engine
        .decide(&flow, screen, &context)
        .unwrap_or_else(|e| exit_with_error(&format!("Navigation failed: {}", e)));
    let duration = start.elapsed();

    println!("\nDecision for screen '{}':", screen);
    println!("  -> Action: {}", decision.action);
    if let Some(target) = &decision.target_screen {
        println!("  -> Target: {}", target);
    }
    println!("  -> Reason: {}", decision.reason);
    for diagnostic in &decision.diagnostics {
        println!("  [diagnostic] {}", diagnostic);
    }
    println!("\nDecided in {:?}", duration);
}

fn run_resolve(engine: &Engine, records_path: &str, entity: &str, scope: &ConfigScope) {
    let content = fs::read_to_string(records_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read records file '{}': {}",
            records_path, e
        ))
    });
    let records: Vec<ConfigRecord> = serde_json::from_str(&content)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse records JSON: {}", e)));

    match engine.resolve(entity, scope, &records) {
        Ok(resolved) => {
            println!("\nResolved '{}' for {}:", entity, scope);
            println!("  -> Record: {} (v{})", resolved.config.id, resolved.config.version);
            println!("  -> Level:  {}", resolved.resolved_from);
            for step in &resolved.inheritance_chain {
                println!("     {}", step);
            }
            for diagnostic in &resolved.diagnostics {
                println!("  [diagnostic] {}", diagnostic);
            }
        }
        Err(ResolveError::NotFound { chain, .. }) => {
            for step in &chain {
                println!("     {}", step);
            }
            exit_with_error(&format!(
                "'{}' has no active PRODUCT-level configuration for product '{}'",
                entity, scope.product_code
            ));
        }
        Err(e) => exit_with_error(&format!("Resolution failed: {}", e)),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}

use corpus_gateway::config::Config;
use corpus_gateway::routing::RouteTable;
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: gateway-validate <config-file>");
        eprintln!("\nExample:");
        eprintln!("  gateway-validate config.yaml");
        process::exit(1);
    }

    let config_path = &args[1];

    println!("Validating configuration file: {}", config_path);
    println!("{}", "=".repeat(60));

    let config = match Config::from_yaml_file(config_path).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Configuration is invalid!\n");
            eprintln!("Error: {}", e);

            if e.to_string().contains("YAML") || e.to_string().contains("parsing") {
                eprintln!("\nHint: Check for YAML syntax errors:");
                eprintln!("  - Proper indentation (use spaces, not tabs)");
                eprintln!("  - Missing colons or dashes");
                eprintln!("  - Unclosed quotes");
            } else if e.to_string().contains("missing field") {
                eprintln!("\nHint: Required fields are missing.");
                eprintln!("  - `backend.base_url` must always be set");
            }

            eprintln!("\n{}", "=".repeat(60));
            process::exit(1);
        }
    };

    println!("✓ Configuration is valid!\n");

    println!("Backend:");
    println!("  - Base URL: {}", config.backend.base_url);
    println!("  - Timeout: {}s", config.backend.timeout);
    println!("  - Extra headers: {}", config.backend.headers.len());

    println!("\nServer:");
    println!("  - Timeout: {}s", config.server.timeout);
    println!("  - Max body size: {} bytes", config.server.max_body_size);

    let mut warnings = Vec::new();
    if config
        .backend
        .api_token
        .as_deref()
        .map_or(true, str::is_empty)
    {
        warnings.push("No backend API token configured".to_string());
    }
    if config.backend.timeout < config.server.timeout {
        warnings.push(format!(
            "Backend timeout ({}s) is shorter than the server timeout ({}s)",
            config.backend.timeout, config.server.timeout
        ));
    }

    match RouteTable::api() {
        Ok(table) => {
            println!("\nAPI rules (evaluated in order):");
            for (i, rule) in table.rules().iter().enumerate() {
                println!(
                    "  {:>2}. /api/{} -> {}",
                    i + 1,
                    rule.pattern(),
                    rule.endpoint().name()
                );
            }
        }
        Err(e) => {
            eprintln!("✗ Built-in rule table does not compile: {}", e);
            process::exit(1);
        }
    }

    if !warnings.is_empty() {
        println!("\n⚠ Warnings:");
        for warning in warnings {
            println!("  - {}", warning);
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("Configuration validation complete!");
}

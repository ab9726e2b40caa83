use clap::Parser;
use form_autofill::cli::commands::{cmd_fill, cmd_key, cmd_match, cmd_profile, field_from_args};
use form_autofill::cli::config::{Cli, Commands, load_config, resolve_store_path};
use form_autofill::error::AutofillError;
use form_autofill::profile::store::Store;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let store_path = resolve_store_path(cli.store.as_deref(), &config).to_string();

    let outcome = match cli.command {
        Commands::Fill {
            url,
            threshold,
            dry_run,
        } => cmd_fill(&url, threshold, dry_run, &config, &store_path).map(|_| ()),
        Commands::Match {
            name,
            input_type,
            label,
            placeholder,
        } => field_from_args(&name, &input_type, label.as_deref(), placeholder.as_deref())
            .map_err(Box::<dyn std::error::Error>::from)
            .and_then(|field| cmd_match(&field, &config, &store_path).map(|_| ())),
        Commands::Profile { action } => {
            let mut store = Store::open(&store_path)?;
            cmd_profile(&action, &mut store)
        }
        Commands::Key { action } => {
            let mut store = Store::open(&store_path)?;
            cmd_key(&action, &mut store)
        }
    };

    // Configuration problems get a one-line reason rather than a debug dump
    if let Err(e) = &outcome {
        if let Some(autofill_err) = e.downcast_ref::<AutofillError>() {
            if autofill_err.is_configuration() {
                eprintln!("autofill aborted: {}", autofill_err);
                std::process::exit(2);
            }
        }
    }
    outcome
}

/// Log level from `-v` count, overridable with `RUST_LOG`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("form_autofill={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

use anyhow::{Context, Result};
use clap::Parser;
use followup_dash::{
    cli::{Cli, OutputFormat},
    config::DashboardConfig,
    csv_output::CsvOutput,
    ingest,
    json_output::JsonOutput,
    session::Session,
    text_output,
};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Print dataset columns, one per line
fn print_columns(columns: &[String]) {
    println!("Columns in data ({}):", columns.len());
    for column in columns {
        println!("  {}", column);
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_toml(path)?,
        None => DashboardConfig::default_config()?,
    };
    args.apply_to(&mut config)?;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let Some(data_path) = &args.data else {
        anyhow::bail!("Must specify a dataset. Usage: followup-dash DATA [OPTIONS]");
    };

    let store = ingest::load_path(data_path)
        .with_context(|| format!("Failed to load dataset: {}", data_path.display()))?;

    if args.list_columns {
        print_columns(store.columns());
        return Ok(());
    }

    let session = Session::open(
        store,
        &config.subject_column,
        &config.reconciled_attribute_columns,
    )
    .context("Attribute reconciliation failed")?;

    let request = config.to_request()?;
    let report = session.run(&request).context("Count request failed")?;

    match args.format {
        OutputFormat::Text => print!("{}", text_output::render(&report)),
        OutputFormat::Csv => print!("{}", CsvOutput::new(args.row_totals).to_csv(&report)),
        OutputFormat::Json => {
            let output = JsonOutput::new(
                Some(data_path.display().to_string()),
                &config.reconciled_attribute_columns,
                session.reconciliation(),
                &request,
                report,
            );
            println!("{}", output.to_json()?);
        }
    }

    Ok(())
}

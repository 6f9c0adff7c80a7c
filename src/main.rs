use clap::Parser;
use form_mirror::cli::commands::{cmd_extract, cmd_fill, cmd_serve};
use form_mirror::cli::config::{
    Cli, Commands, load_config, resolve_extract, resolve_fill, resolve_serve,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "info,form_mirror=info",
        1 => "info,form_mirror=debug",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Extract {
            url,
            output,
            driver,
            trace,
        } => {
            let settings = resolve_extract(url, output, driver, trace, &config.extract);
            cmd_extract(&settings, cli.verbose)?;
        }
        Commands::Serve {
            port,
            store,
            schema,
        } => {
            let settings = resolve_serve(port, store, schema, &config.serve);
            cmd_serve(&settings, cli.verbose)?;
        }
        Commands::Fill {
            schema,
            api_base,
            values,
        } => {
            let settings = resolve_fill(schema, api_base, &config.client);
            let accepted = cmd_fill(&settings, &values, cli.verbose)?;
            if !accepted {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

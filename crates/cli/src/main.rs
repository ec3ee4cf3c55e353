mod cli;
mod commands;
mod tracing;

use crate::tracing::{TracingConfig, TracingFormat, correlation_id};

fn main() -> miette::Result<()> {
    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: if cli.json {
            TracingFormat::Json
        } else {
            TracingFormat::Compact
        },
        level: cli.level.into(),
        ..TracingConfig::default()
    };
    crate::tracing::init_tracing(tracing_config)?;

    let _span = ::tracing::info_span!("pkgkey", correlation_id = %correlation_id()).entered();
    commands::execute(cli.command, cli.json)
}

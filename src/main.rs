use carryover::args::{Args, Command, EntrySubcommand, TemplateSubcommand};
use carryover::{commands, Config, Mode, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // When CARRYOVER_IN_TEST_MODE is set and non-zero in length, the mode will be Mode::Testing
    // and nothing is read from or written to the data directory.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.debounce_ms())
            .await?
            .print(),

        Command::Show(month) => {
            let config = Config::load(home).await?;
            commands::show(config, mode, month).await?.print()
        }

        Command::Trend(trend_args) => {
            let config = Config::load(home).await?;
            commands::trend(config, mode, trend_args).await?.print()
        }

        Command::Entry(entry_args) => {
            let config = Config::load(home).await?;
            match entry_args.action() {
                EntrySubcommand::Add(a) => commands::entry_add(config, mode, a).await?.print(),
                EntrySubcommand::Set(a) => commands::entry_set(config, mode, a).await?.print(),
                EntrySubcommand::Delete(a) => {
                    commands::entry_delete(config, mode, a).await?.print()
                }
                EntrySubcommand::Clear(a) => commands::entry_clear(config, mode, a).await?.print(),
                EntrySubcommand::Apply(a) => commands::entry_apply(config, mode, a).await?.print(),
            }
        }

        Command::Template(template_args) => {
            let config = Config::load(home).await?;
            match template_args.action() {
                TemplateSubcommand::List => commands::template_list(config, mode).await?.print(),
                TemplateSubcommand::AddFixed(a) => {
                    commands::template_add_fixed(config, mode, a).await?.print()
                }
                TemplateSubcommand::AddDebt(a) => {
                    commands::template_add_debt(config, mode, a).await?.print()
                }
                TemplateSubcommand::UpdateFixed(a) => {
                    commands::template_update_fixed(config, mode, a)
                        .await?
                        .print()
                }
                TemplateSubcommand::UpdateDebt(a) => {
                    commands::template_update_debt(config, mode, a)
                        .await?
                        .print()
                }
                TemplateSubcommand::RemoveFixed(a) => {
                    commands::template_remove_fixed(config, mode, a)
                        .await?
                        .print()
                }
                TemplateSubcommand::RemoveDebt(a) => {
                    commands::template_remove_debt(config, mode, a)
                        .await?
                        .print()
                }
            }
        }

        Command::Theme(theme_args) => {
            let config = Config::load(home).await?;
            commands::theme(config, mode, theme_args).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

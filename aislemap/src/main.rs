use aislemap::handlers::{
    data_layout, handle_analyze, handle_capture, handle_download, handle_verify, report_error,
};
use aislemap::print_banner;
use commands::command_argument_builder;
use std::process::ExitCode;
use tracing::Level;

mod commands;

#[tokio::main]
async fn main() -> ExitCode {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return ExitCode::SUCCESS;
    }

    let layout = data_layout(&chosen_command);

    let result = match chosen_command.subcommand() {
        Some(("verify", primary_command)) => handle_verify(primary_command),
        Some(("capture", primary_command)) => handle_capture(primary_command, &layout).await,
        Some(("analyze", primary_command)) => handle_analyze(primary_command, &layout),
        Some(("download", primary_command)) => handle_download(primary_command, &layout).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

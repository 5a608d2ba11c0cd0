use crate::CLAP_STYLING;
use aislemap_core::layout::DEFAULT_DATA_DIR;
use clap::{arg, command};

fn proxy_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"proxy-host" <HOST>)
            .required(false)
            .help("Host where mitmproxy listens")
            .default_value("localhost"),
    )
    .arg(
        arg!(--"proxy-port" <PORT>)
            .required(false)
            .help("mitmproxy listener port")
            .value_parser(clap::value_parser!(u16))
            .default_value("8080"),
    )
    .arg(
        arg!(--"web-port" <PORT>)
            .required(false)
            .help("mitmweb UI port")
            .value_parser(clap::value_parser!(u16))
            .default_value("8081"),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("aislemap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("aislemap")
        .about("Find and download in-store map data from a retail app's API")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging on stderr")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-d --"data-dir" <PATH>)
                .required(false)
                .global(true)
                .help("Root directory for captured/, analyzed/ and maps/")
                .default_value(DEFAULT_DATA_DIR),
        )
        .subcommand_required(false)
        .subcommand(
            proxy_args(command!("verify").about(
                "Check that adb, the emulator, the app and mitmproxy are ready for capturing",
            ))
            .arg(
                arg!(--"package" <PACKAGE>)
                    .required(false)
                    .help("Android package name of the companion app")
                    .default_value("com.target.ui"),
            ),
        )
        .subcommand(
            proxy_args(
                command!("capture")
                    .about("Guide a capture session through mitmproxy and save the captured requests"),
            )
            .arg(
                arg!(-o --"output" <NAME>)
                    .required(false)
                    .help("File name for the captured session (default: session_<timestamp>.json)"),
            )
            .arg(
                arg!(--"poll")
                    .required(false)
                    .help("Poll the mitmweb flow list and buffer requests until Ctrl+C")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                arg!(--"interval" <SECONDS>)
                    .required(false)
                    .help("Seconds between polls")
                    .value_parser(clap::value_parser!(u64).range(1..))
                    .default_value("2"),
            )
            .arg(
                arg!(--"web-token" <TOKEN>)
                    .required(false)
                    .help("Access token printed by mitmweb on startup, if it requires one"),
            ),
        )
        .subcommand(
            command!("analyze")
                .about("Analyze a capture file (HAR or session JSON) for store map endpoints")
                .arg(
                    arg!(<CAPTURE_FILE>)
                        .help("Captured traffic file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-k --"keyword" <KEYWORD>)
                        .required(false)
                        .help("Keyword to match in paths and queries; repeat to build a custom list")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"domain" <SUBSTRING>)
                        .required(false)
                        .help("Only consider requests whose domain contains this text"),
                ),
        )
        .subcommand(
            command!("download")
                .about("Download the map for a store using endpoints found by `analyze`")
                .arg(
                    arg!(--"store-id" <ID>)
                        .required(false)
                        .help("Store ID (e.g., T-1234)"),
                )
                .arg(
                    arg!(--"coordinates" <LAT_LNG>)
                        .required(false)
                        .help("Store coordinates as lat,lng")
                        .allow_hyphen_values(true),
                )
                .arg(
                    arg!(--"output-dir" <PATH>)
                        .required(false)
                        .help("Output directory for maps (default: <data-dir>/maps)"),
                )
                .arg(
                    arg!(--"endpoint" <URL_TEMPLATE>)
                        .required(false)
                        .help("Map endpoint to GET, with {store_id} as placeholder (default: placeholder data)"),
                )
                .arg(
                    arg!(-H --"header" <HEADER>)
                        .required(false)
                        .help("Extra request header as 'Name: Value'; repeatable")
                        .action(clap::ArgAction::Append),
                ),
        )
}

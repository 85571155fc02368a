use std::num::NonZeroUsize;

use log::{debug, error, info, warn};

use apply_conf::apply;
use generate_conf::generate;

mod apply_conf;
mod config;
mod generate_conf;
mod read_sheet;
mod ssh;
mod types;

const APP_NAME: &str = "fgmac";

const SUB_CMD_GENERATE: &str = "generate";
const SUB_CMD_APPLY: &str = "apply";

const DEFAULT_INPUT_FILE: &str = "mac_addresses.xlsx";
const DEFAULT_SHEET_NAME: &str = "Sheet1";

fn input_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        clap::Arg::new("INPUT")
            .long("input")
            .default_value(DEFAULT_INPUT_FILE)
            .help("Spreadsheet with address names in column A and MAC addresses in column B"),
    )
    .arg(
        clap::Arg::new("SHEET")
            .long("sheet")
            .default_value(DEFAULT_SHEET_NAME)
            .help("Name of the sheet to read; its first row is treated as a header"),
    )
    .arg(
        clap::Arg::new("VERBOSE")
            .long("verbose")
            .action(clap::ArgAction::SetTrue)
            .help("Enables DEBUG log level"),
    )
}

fn main() {
    let app = clap::Command::new(APP_NAME)
        .version(clap::crate_version!())
        .about("Provision MAC address objects and groups on a FortiGate")
        .subcommand_required(true)
        .subcommand(input_args(
            clap::Command::new(SUB_CMD_GENERATE)
                .about("Generate the CLI commands without connecting to the firewall")
                .arg(
                    clap::Arg::new("OUTPUT-DIR")
                        .default_value("_out")
                        .long("output-dir")
                        .help("Destination dir storing the commands and the group mapping"),
                ),
        ))
        .subcommand(input_args(
            clap::Command::new(SUB_CMD_APPLY)
                .about("Push address objects and groups to the firewall over SSH")
                .arg(
                    clap::Arg::new("BATCH-SIZE")
                        .long("batch-size")
                        .default_value("50")
                        .value_parser(clap::value_parser!(NonZeroUsize))
                        .help("Number of commands per progress step"),
                ),
        ));

    let matches = app.get_matches();

    match matches.subcommand() {
        Some((SUB_CMD_GENERATE, cmd)) => {
            let (input, sheet) = input_paths(cmd);
            let output_dir = cmd
                .get_one::<String>("OUTPUT-DIR")
                .expect("--output-dir is required");

            setup_logger(cmd);
            load_dotenv();

            match generate(input, sheet, output_dir) {
                Ok(..) => {
                    info!("Generating commands finished");
                }
                Err(err) => {
                    error!("Generating commands failed: {err:#}");
                    std::process::exit(1)
                }
            }
        }
        Some((SUB_CMD_APPLY, cmd)) => {
            let (input, sheet) = input_paths(cmd);
            let batch_size = *cmd
                .get_one::<NonZeroUsize>("BATCH-SIZE")
                .expect("--batch-size is required");

            setup_logger(cmd);
            load_dotenv();

            match apply(input, sheet, batch_size) {
                Ok(..) => {
                    info!("Applying MAC addresses finished");
                }
                Err(err) => {
                    error!("Applying MAC addresses failed: {err:#}");
                    std::process::exit(1)
                }
            }
        }
        _ => unreachable!("Unrecognized subcommand"),
    }
}

fn input_paths(cmd: &clap::ArgMatches) -> (&str, &str) {
    let input = cmd
        .get_one::<String>("INPUT")
        .map(String::as_str)
        .expect("--input is required");
    let sheet = cmd
        .get_one::<String>("SHEET")
        .map(String::as_str)
        .expect("--sheet is required");

    (input, sheet)
}

/// Seed the environment from `.env`; variables already set take precedence.
fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {path:?}"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("Ignoring .env file: {err}"),
    }
}

fn setup_logger(matches: &clap::ArgMatches) {
    let verbose_arg = "VERBOSE";

    let mut log_builder = env_logger::Builder::new();
    if matches
        .try_get_one::<bool>(verbose_arg)
        .is_ok_and(|arg| arg.is_some_and(|&value| value))
    {
        log_builder.filter(None, log::LevelFilter::Debug);
    } else {
        log_builder.filter(None, log::LevelFilter::Info);
    }
    log_builder.init();
}

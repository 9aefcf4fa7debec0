use barflow::cli::{ServerCli, run_server};
use clap::Parser;

fn main() -> std::process::ExitCode {
    run_server(ServerCli::parse())
}

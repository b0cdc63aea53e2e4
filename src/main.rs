use clap::Parser;
use adaptrader::cli::{run, Cli};
use adaptrader::logging::init_tracing;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}

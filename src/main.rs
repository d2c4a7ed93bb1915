mod cli;

use colored::Colorize;
use tracing_subscriber::EnvFilter;

fn main() {
    // logs go to stderr so a schema printed on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let command_line_interface = cli::CommandLineInterface::load();
    if let Err(error) = command_line_interface.run() {
        eprintln!("{} {error:#}", "error:".red());
        std::process::exit(1);
    }
}

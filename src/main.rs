use clap::Parser;

use bdh::cli::{Cli, WrapperCommand, is_wrapper_invocation};
use bdh::{commands, run_bd};

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("bdh: {err:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn run() -> anyhow::Result<i32> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    // A leading `--` always means "this is for bd", even when the next
    // token collides with a wrapper command name.
    if args.first().map(String::as_str) == Some("--") {
        args.remove(0);
        init_tracing(false);
        return run_bd(args).await;
    }

    if !is_wrapper_invocation(&args) {
        init_tracing(false);
        return run_bd(args).await;
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        WrapperCommand::Status => commands::status().await,
        WrapperCommand::Workspaces { all } => commands::workspaces(all).await,
    }
}

fn init_tracing(verbose: bool) {
    if let Err(err) = bdh_utils::logging::init_tracing(verbose) {
        eprintln!("bdh: failed to initialize logging: {err}");
    }
}

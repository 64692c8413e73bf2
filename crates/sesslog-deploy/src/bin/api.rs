// Deploy or delete the API gateway stack (gateway fronting the ingest
// function, IP allow-listed by up to three CIDR ranges).

use clap::Parser;
use sesslog_config::DeployConfig;
use sesslog_deploy::aws::{self, LambdaPermissions, SamStackOps};
use sesslog_deploy::lifecycle::{run_api_stack, ApiStackDeps, StackCommand};

#[derive(Parser)]
#[command(
    name = "sesslog-deploy-api",
    about = "Deploy or delete the sesslog API gateway stack"
)]
struct Cli {
    /// Command to run: deploy or delete
    command: String,

    /// Extra arguments forwarded unmodified to `sam deploy` / `sam delete`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    extra_args: Vec<String>,
}

#[tokio::main]
async fn main() {
    sesslog_deploy::init_tracing();
    std::process::exit(run().await);
}

async fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { 1 } else { 0 };
        }
    };

    let command = match cli.command.parse::<StackCommand>() {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("usage: sesslog-deploy-api <deploy|delete> [extra sam args...]");
            return err.exit_code();
        }
    };

    let config = match DeployConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {:#}", err);
            return 2;
        }
    };
    if command == StackCommand::Deploy {
        if let Err(err) = config.api.validate() {
            eprintln!("configuration error: {:#}", err);
            return 2;
        }
    }

    let sdk = aws::sdk_config(&config.aws).await;
    let permissions = LambdaPermissions::new(&sdk);
    let stacks = SamStackOps::new(&sdk, &config.aws);

    match run_api_stack(
        command,
        &config.api,
        ApiStackDeps {
            permissions: &permissions,
            stacks: &stacks,
        },
        &cli.extra_args,
    )
    .await
    {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!("{}", err);
            err.exit_code()
        }
    }
}

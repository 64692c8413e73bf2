// Deploy or delete the VPC stack (ingest function attached to a VPC, with
// S3 gateway and SSM interface endpoints that are created or reused).

use clap::Parser;
use sesslog_config::DeployConfig;
use sesslog_deploy::aws::{self, Ec2Inventory, SamStackOps};
use sesslog_deploy::lifecycle::{run_vpc_stack, StackCommand, VpcStackDeps};

#[derive(Parser)]
#[command(
    name = "sesslog-deploy-vpc",
    about = "Deploy or delete the sesslog VPC function stack"
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
            eprintln!("usage: sesslog-deploy-vpc <deploy|delete> [extra sam args...]");
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
        if let Err(err) = config.vpc.validate() {
            eprintln!("configuration error: {:#}", err);
            return 2;
        }
    }

    let sdk = aws::sdk_config(&config.aws).await;
    let inventory = Ec2Inventory::new(&sdk);
    let stacks = SamStackOps::new(&sdk, &config.aws);

    match run_vpc_stack(
        command,
        &config.vpc,
        &config.aws.region,
        VpcStackDeps {
            inventory: &inventory,
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

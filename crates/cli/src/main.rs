mod commands;
mod error;
mod util;

use commands::{DbCommand, SeesawCli, SeesawSubcommand};
use error::CliError;

#[tokio::main]
async fn main() -> miette::Result<()> {
    util::init_tracing();
    run().await?;
    Ok(())
}

async fn run() -> Result<(), CliError> {
    let args = SeesawCli::parse_args();

    match args.command {
        SeesawSubcommand::Spam { args } => commands::spam(*args).await?,

        SeesawSubcommand::Fund {
            store,
            account,
            amount,
        } => commands::fund(&store, account, amount)?,

        SeesawSubcommand::Balance { store } => commands::balance(&store)?,

        SeesawSubcommand::Db { store, command } => {
            let db_path = store.resolve_config()?.db_path;
            match command {
                DbCommand::Drop => commands::db::drop_db(&db_path).await?,
                DbCommand::Reset => commands::db::reset_db(&db_path).await?,
            }
        }
    }
    Ok(())
}

use clap::Parser;
use erp_admin::{cli, commands, config, error};
use cli::{Cli, Commands};
use commands::ListOptions;
use config::Config;
use error::{AppError, Result};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` があればそれを優先する
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,erp_admin=debug,erp_admin_common=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    let api_url = cli.api_url.as_deref();

    match cli.command {
        Commands::List { domain, page, page_size, search, sort_by, desc, filters } => {
            let store = commands::open_store(&config, api_url, domain)?;
            let options = ListOptions { page, page_size, search, sort_by, desc, filters };
            print_json(&commands::list(&store, options).await?)?;
        }

        Commands::Get { domain, id } => {
            let store = commands::open_store(&config, api_url, domain)?;
            print_json(&commands::get(&store, id).await?)?;
        }

        Commands::Create { domain, payload } => {
            let payload = commands::read_payload(&payload)?;
            let store = commands::open_store(&config, api_url, domain)?;
            print_json(&commands::create(&store, payload).await?)?;
        }

        Commands::Update { domain, id, payload } => {
            let payload = commands::read_payload(&payload)?;
            let store = commands::open_store(&config, api_url, domain)?;
            print_json(&commands::update(&store, id, payload).await?)?;
        }

        Commands::Delete { domain, id, yes } => {
            if !yes && !commands::confirm_delete(domain, id)? {
                return Err(AppError::Cancelled);
            }
            let store = commands::open_store(&config, api_url, domain)?;
            commands::delete(&store, id).await?;
            println!("✔ {} #{} を削除しました", domain.resource().name, id);
        }

        Commands::Attach { domain, id, files } => {
            let store = commands::open_store(&config, api_url, domain)?;
            print_json(&commands::attach(&store, id, &files).await?)?;
        }

        Commands::Download { domain, id, file_name, output } => {
            let store = commands::open_store(&config, api_url, domain)?;
            let path = commands::download(&store, id, &file_name, output.as_deref()).await?;
            println!("✔ 保存しました: {}", path.display());
        }

        Commands::Detach { domain, id, attachment_id } => {
            let store = commands::open_store(&config, api_url, domain)?;
            commands::detach(&store, id, attachment_id).await?;
            println!("✔ 添付ファイル #{} を削除しました", attachment_id);
        }

        Commands::Config { set_token, clear_token, set_api_url, show } => {
            if commands::configure(&mut config, set_token, clear_token, set_api_url)? {
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show {
                println!("設定:");
                for line in commands::describe_config(&config, api_url).lines() {
                    println!("  {}", line);
                }
            }
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

use std::path::Path;

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use crate::catalog::{Catalog, QueryParams};
use crate::config::Config;
use crate::database::Database;
use crate::error::StorefrontError;
use crate::seed::Seed;

#[derive(Parser)]
#[command(
    name = "storefront",
    version,
    about = "Storefront: catalog browsing and merchant product service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the server (default if no command specified)
    Serve,

    /// Populate the database with a demo catalog (safe to run repeatedly)
    Seed,

    /// Query storefront products and print the page as JSON
    Products {
        /// Query string, e.g. "categories=Shoes&price_range=10-50&page=2"
        #[arg(long = "query", short = 'q', default_value = "")]
        query: String,
    },

    /// Query stores and print the page as JSON
    Stores {
        /// Query string, e.g. "active=true&sort=productCount.desc"
        #[arg(long = "query", short = 'q', default_value = "")]
        query: String,
    },

    /// Query one store's product table and print the page as JSON
    #[command(name = "store-products")]
    StoreProducts {
        /// Store id
        #[arg(long = "store-id", short = 's')]
        store_id: String,

        /// Query string, e.g. "name=deck&from=2024-01-01&to=2024-12-31"
        #[arg(long = "query", short = 'q', default_value = "")]
        query: String,
    },
}

impl Cli {
    pub fn handle_command_line(data_dir: &Path) -> Result<(), StorefrontError> {
        let args = Cli::parse();

        let config = Config::get();
        let db = Database::open(
            &config.database.resolve_path(data_dir),
            config.database.pool_size,
        )?;

        // Default to Serve if no command specified
        match args.command.unwrap_or(Command::Serve) {
            Command::Serve => Self::start_server(db),
            command => {
                println!("{}", Self::run_command(&command, &db)?);
                Ok(())
            }
        }
    }

    /// Runs a non-server command and renders its result as pretty JSON. Query
    /// commands use the fallible catalog calls so storage errors are reported
    /// instead of printing an empty page.
    fn run_command(command: &Command, db: &Database) -> Result<String, StorefrontError> {
        match command {
            Command::Serve => Err(StorefrontError::Error(
                "serve does not produce output".to_string(),
            )),
            Command::Seed => Self::to_json(&Seed::seed_demo_catalog(db)?),
            Command::Products { query } => Self::to_json(&Catalog::try_get_products(
                db,
                &QueryParams::from_query_string(query),
            )?),
            Command::Stores { query } => Self::to_json(&Catalog::try_get_stores(
                db,
                &QueryParams::from_query_string(query),
            )?),
            Command::StoreProducts { store_id, query } => {
                Self::to_json(&Catalog::try_get_store_products(
                    db,
                    store_id,
                    &QueryParams::from_query_string(query),
                )?)
            }
        }
    }

    fn to_json<T: Serialize>(value: &T) -> Result<String, StorefrontError> {
        Ok(serde_json::to_string_pretty(value)?)
    }

    fn start_server(db: Database) -> Result<(), StorefrontError> {
        let host = Config::get().server.host.clone();
        let port = Config::get().server.port;

        info!("Starting server on {}:{}", host, port);

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| StorefrontError::Error(format!("Failed to create runtime: {}", e)))?;

        rt.block_on(async {
            let web_server = crate::server::WebServer::new(host, port, db);
            web_server.start().await
        })
    }
}

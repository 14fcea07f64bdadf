use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feature_toggle::{api, client::ToggleClient, db, render};

#[derive(Parser)]
#[command(name = "ftoggle")]
#[command(about = "Hierarchical feature toggles with per-group entitlements")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the feature toggle server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Address to bind to
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,

        /// Database file (defaults to FEATURE_TOGGLE_DB, then the platform data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Check whether a feature is enabled on a running server
    Check {
        feature_id: i64,

        /// Resolve for this user instead of anonymously
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List the features enabled on a running server
    Enabled {
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Render the feature tree, marking features enabled for a user
    Tree {
        #[arg(short, long)]
        user: Option<String>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "feature_toggle=debug,tower_http=debug".into()),
    );

    // Logs go to stderr so query output on stdout stays scriptable
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(port: u16, bind: &str, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Starting feature toggle server on port {}", port);

    let db_path = db_path.or_else(|| std::env::var_os("FEATURE_TOGGLE_DB").map(PathBuf::from));
    let db = match db_path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;

    let app = api::create_router(db);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind, port)).await?;
    tracing::info!("Feature toggle server listening on http://{}:{}", bind, port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn client_for(user: Option<String>) -> ToggleClient {
    let client = ToggleClient::from_env();
    match user {
        Some(user) => client.with_user(user),
        None => client,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port, bind, db }) => serve(port, &bind, db).await?,
        Some(Commands::Check { feature_id, user }) => {
            let enabled = client_for(user).is_enabled(feature_id).await?;
            println!("{}", if enabled { "enabled" } else { "disabled" });
        }
        Some(Commands::Enabled { user }) => {
            for feature in client_for(user).enabled_features().await? {
                println!("{}\t{}", feature.id, feature.name);
            }
        }
        Some(Commands::Tree { user }) => {
            let client = client_for(user);
            let tree = client.feature_tree().await?;
            let enabled: HashSet<i64> = client
                .enabled_features()
                .await?
                .into_iter()
                .map(|f| f.id)
                .collect();
            print!("{}", render::render_tree(&tree, &enabled));
        }
        None => serve(3000, "127.0.0.1", None).await?,
    }

    Ok(())
}

use axum::http::{HeaderValue, Method, header};
use serde::Deserialize;
use server::{SelfActionPolicy, ServerState};
use socialgraph_db::{client::DbClient, store::DbError};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error preparing database: {0}")]
    Database(#[from] DbError),
    #[error("Invalid CORS origin: {0:?}")]
    CorsOrigin(String),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    #[serde(default = "default_max_connections")]
    database_max_connections: u32,
    #[serde(default = "enabled")]
    run_migrations: bool,
    #[serde(default = "default_cors_origins")]
    cors_origins: Vec<String>,
    #[serde(default = "enabled")]
    allow_self_subscription: bool,
    #[serde(default = "enabled")]
    allow_self_reaction: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn enabled() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:8080".to_owned(),
        "http://127.0.0.1:8080".to_owned(),
    ]
}

impl Env {
    fn policy(&self) -> SelfActionPolicy {
        SelfActionPolicy {
            allow_self_subscription: self.allow_self_subscription,
            allow_self_reaction: self.allow_self_reaction,
        }
    }
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "socialgraph_api=debug,\
                socialgraph_db=debug,\
                socialgraph_common=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, InitError> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| InitError::CorsOrigin(origin.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true))
}

async fn wait_for_shutdown(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "Could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                error!(%err, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Shutting down");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let db = DbClient::connect(&env.database_url, env.database_max_connections).await?;
    if env.run_migrations {
        db.migrate().await?;
        info!("Applied database migrations");
    }

    let state = ServerState {
        store: Arc::new(db),
        policy: env.policy(),
    };

    let app = server::routes()
        .with_state(state)
        .layer(cors_layer(&env.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Env, cors_layer};

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn env_fills_in_defaults() {
        let env: Env = envy::from_iter(vars(&[
            ("SERVER_ADDRESS", "127.0.0.1"),
            ("SERVER_PORT", "3000"),
            ("DATABASE_URL", "postgres://localhost/socialgraph"),
        ]))
        .unwrap();

        assert_eq!(env.database_max_connections, 5);
        assert!(env.run_migrations);
        assert_eq!(
            env.cors_origins,
            ["http://localhost:8080", "http://127.0.0.1:8080"]
        );
        assert!(env.policy().allow_self_subscription);
        assert!(env.policy().allow_self_reaction);
    }

    #[test]
    fn env_reads_overrides() {
        let env: Env = envy::from_iter(vars(&[
            ("SERVER_ADDRESS", "0.0.0.0"),
            ("SERVER_PORT", "8000"),
            ("DATABASE_URL", "postgres://db/socialgraph"),
            ("CORS_ORIGINS", "https://a.example,https://b.example"),
            ("ALLOW_SELF_REACTION", "false"),
        ]))
        .unwrap();

        assert_eq!(env.cors_origins, ["https://a.example", "https://b.example"]);
        assert!(!env.policy().allow_self_reaction);
        assert!(env.policy().allow_self_subscription);
    }

    #[test]
    fn env_requires_database_url() {
        let env = envy::from_iter::<_, Env>(vars(&[
            ("SERVER_ADDRESS", "127.0.0.1"),
            ("SERVER_PORT", "3000"),
        ]));

        assert!(env.is_err());
    }

    #[test]
    fn cors_rejects_unprintable_origins() {
        assert!(cors_layer(&["http://localhost:8080".to_owned()]).is_ok());
        assert!(cors_layer(&["bad\norigin".to_owned()]).is_err());
    }
}

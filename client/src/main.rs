//! SorteoHub command-line client.
//!
//! Thin driver over the client stores, mostly for poking at a backend:
//!
//! ```text
//! sorteohub list [search]        public raffles
//! sorteohub show <raffle-id>     availability of one raffle
//! sorteohub login <email> <pw>   sign in and persist the session
//! sorteohub me                   verify the stored session
//! sorteohub logout               forget the stored session
//! ```
//!
//! The session is kept in `SORTEOHUB_STORAGE` (default `sorteohub-session.json`).

use anyhow::{Context, bail};
use sorteohub_client::auth::{AuthAction, AuthEnvironment, AuthReducer, AuthState, AuthStore};
use sorteohub_client::raffles::{
    ListStatus, RaffleAction, RaffleEnvironment, RaffleReducer, RaffleStore, RaffleStoreState,
};
use sorteohub_client::types::{Credentials, RaffleFilters};
use sorteohub_client::{
    ApiClient, AppSignal, ClientConfig, FileKeyValueStore, FilterMode, InMemorySignalBus, Partition,
    RaffleId,
};
use sorteohub_core::environment::KeyValueStore;
use sorteohub_core::signal_bus::SignalBus;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_STORAGE_PATH: &str = "sorteohub-session.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sorteohub=info,sorteohub_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env().context("invalid client configuration")?;
    let storage_path =
        std::env::var("SORTEOHUB_STORAGE").unwrap_or_else(|_| DEFAULT_STORAGE_PATH.to_string());
    let storage: Arc<dyn KeyValueStore> = Arc::new(
        FileKeyValueStore::open(&storage_path)
            .with_context(|| format!("cannot open session storage at {storage_path}"))?,
    );
    info!(api_url = %config.api_url, storage = %storage_path, "Configuration loaded");

    let api = Arc::new(ApiClient::new(&config, Arc::clone(&storage))?);
    let timeout = config.timeout() + Duration::from_secs(1);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["list", search @ ..] => list(api, search.join(" "), timeout).await,
        ["show", id] => show(api, id, timeout).await,
        ["login", email, password] => login(api, storage, email, password, timeout).await,
        ["me"] => me(api, storage, timeout).await,
        ["logout"] => {
            let store = auth_store(api, storage);
            let mut handle = store.send(AuthAction::Logout).await?;
            handle.wait_with_timeout(timeout).await?;
            println!("Sesión cerrada");
            Ok(())
        },
        _ => bail!("usage: sorteohub <list [search] | show <id> | login <email> <password> | me | logout>"),
    }
}

fn raffle_store(api: Arc<ApiClient>) -> RaffleStore {
    let signals: Arc<dyn SignalBus<AppSignal>> = Arc::new(InMemorySignalBus::new());
    RaffleStore::new(
        RaffleStoreState::default(),
        RaffleReducer::new(),
        RaffleEnvironment::new(api, signals),
    )
}

fn auth_store(api: Arc<ApiClient>, storage: Arc<dyn KeyValueStore>) -> AuthStore {
    AuthStore::new(
        AuthState::default(),
        AuthReducer::new(),
        AuthEnvironment::new(api, storage),
    )
}

async fn list(api: Arc<ApiClient>, search: String, timeout: Duration) -> anyhow::Result<()> {
    let store = raffle_store(api);
    let filters = RaffleFilters {
        search: Some(search).filter(|s| !s.trim().is_empty()),
        ..RaffleFilters::default()
    };
    let mut handle = store.send(RaffleAction::LoadList { filters }).await?;
    handle.wait_with_timeout(timeout).await?;

    let list = store.state(|s| s.list.clone()).await;
    match list.status {
        ListStatus::Failed(error) => bail!(error.user_message()),
        ListStatus::Empty => println!("No hay rifas que coincidan"),
        _ => {
            for raffle in &list.raffles {
                let counts = Partition::from_raffle(raffle).counts();
                println!(
                    "{}  {}  {}  {}/{} libres",
                    raffle.id, raffle.title, raffle.unit_price, counts.free, counts.total
                );
            }
        },
    }
    Ok(())
}

async fn show(api: Arc<ApiClient>, id: &str, timeout: Duration) -> anyhow::Result<()> {
    let store = raffle_store(api);
    let mut handle = store
        .send(RaffleAction::LoadDetail { id: RaffleId::new(id) })
        .await?;
    handle.wait_with_timeout(timeout).await?;

    let detail = store.state(|s| s.detail.clone()).await;
    if let Some(error) = detail.error {
        bail!(error.user_message());
    }
    let Some(raffle) = detail.raffle else {
        bail!("la rifa {id} no existe");
    };

    let partition = Partition::from_raffle(&raffle);
    let counts = partition.counts();
    println!("{} ({})", raffle.title, raffle.raffle_type);
    println!(
        "Precio: {}  Total: {}  Libres: {}  Vendidos: {}  Reservados: {}",
        raffle.unit_price, counts.total, counts.free, counts.sold, counts.reserved
    );
    let free: Vec<String> = partition
        .filter_by_mode(FilterMode::Free)
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("Disponibles: {}", free.join(", "));
    Ok(())
}

async fn login(
    api: Arc<ApiClient>,
    storage: Arc<dyn KeyValueStore>,
    email: &str,
    password: &str,
    timeout: Duration,
) -> anyhow::Result<()> {
    let store = auth_store(api, storage);
    let credentials = Credentials {
        email: email.to_string(),
        password: password.to_string(),
    };
    let mut handle = store.send(AuthAction::Login { credentials }).await?;
    handle.wait_with_timeout(timeout).await?;

    let state = store.state(AuthState::clone).await;
    if let Some(error) = state.error {
        bail!(error.user_message());
    }
    if let Some(user) = state.user {
        println!("Bienvenido, {} ({})", user.name, user.role.as_str());
    }
    Ok(())
}

async fn me(
    api: Arc<ApiClient>,
    storage: Arc<dyn KeyValueStore>,
    timeout: Duration,
) -> anyhow::Result<()> {
    let store = auth_store(api, storage);
    let mut handle = store.send(AuthAction::Restore).await?;
    handle.wait_with_timeout(timeout).await?;

    let state = store.state(AuthState::clone).await;
    match (state.user, state.error) {
        (Some(user), _) => println!("{} <{}> {}", user.name, user.email, user.role.as_str()),
        (None, Some(error)) => bail!(error.user_message()),
        (None, None) => println!("Sin sesión"),
    }
    Ok(())
}

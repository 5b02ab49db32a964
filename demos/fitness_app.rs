//! Fitness API wiring: a container built once at startup, one scope per
//! request.
//!
//! Run with `cargo run --example fitness_app --features axum-integration`,
//! then `curl http://127.0.0.1:3001/users/1/challenges`.

use async_trait::async_trait;
use axum::{extract::Path, response::Json, routing::get, Router};
use pulse_di::axum_integration::{Inject, RequestScopeLayer};
use pulse_di::{
    bind_interface, AsyncDispose, BoxError, ContainerOptions, Dispose, Injectable, Lifetime,
    Resolver, ServiceContainer, ServiceDescriptor,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct AppConfig {
    database_url: String,
    listen_addr: String,
}

/// Stand-in for a pooled database engine.
struct DbEngine {
    url: String,
    sessions: AtomicU64,
}

#[async_trait]
impl AsyncDispose for DbEngine {
    async fn dispose(&self) {
        info!(url = %self.url, "closing database engine");
    }
}

/// One unit of work against the engine.
struct DbSession {
    id: u64,
}

impl Dispose for DbSession {
    fn dispose(&self) {
        info!(session = self.id, "session closed");
    }
}

#[derive(Clone, Serialize)]
struct Challenge {
    id: u64,
    title: String,
    completed: bool,
}

trait ChallengeRepository: Send + Sync {
    fn user_challenges(&self, user_id: u64) -> Vec<Challenge>;
}

struct SqlChallengeRepository {
    session: Arc<DbSession>,
}

impl ChallengeRepository for SqlChallengeRepository {
    fn user_challenges(&self, user_id: u64) -> Vec<Challenge> {
        info!(session = self.session.id, user_id, "loading challenges");
        vec![
            Challenge {
                id: user_id * 10 + 1,
                title: "100 push-ups".to_string(),
                completed: true,
            },
            Challenge {
                id: user_id * 10 + 2,
                title: "5k under 30 minutes".to_string(),
                completed: false,
            },
        ]
    }
}

impl Injectable for SqlChallengeRepository {
    type Deps = Arc<DbSession>;

    fn inject(session: Self::Deps) -> Self {
        Self { session }
    }
}

bind_interface!(SqlChallengeRepository => dyn ChallengeRepository);

struct ChallengeService {
    repository: Arc<dyn ChallengeRepository>,
}

#[derive(Serialize)]
struct ChallengeSummary {
    user_id: u64,
    completed: usize,
    challenges: Vec<Challenge>,
}

impl ChallengeService {
    fn summary(&self, user_id: u64) -> ChallengeSummary {
        let challenges = self.repository.user_challenges(user_id);
        ChallengeSummary {
            user_id,
            completed: challenges.iter().filter(|c| c.completed).count(),
            challenges,
        }
    }
}

fn build_container(config: AppConfig) -> Result<ServiceContainer, BoxError> {
    let container = ServiceContainer::with_options(ContainerOptions::from_env()?);

    container.register_instance(Arc::new(config))?;

    container.register(
        ServiceDescriptor::async_factory(Lifetime::Singleton, |config: Arc<AppConfig>| async move {
            // Connection setup would be awaited here.
            tokio::task::yield_now().await;
            Ok::<_, BoxError>(Arc::new(DbEngine {
                url: config.database_url.clone(),
                sessions: AtomicU64::new(0),
            }))
        })
        .async_disposable::<DbEngine>(),
    )?;

    container.register_disposable(Lifetime::Scoped, |engine: Arc<DbEngine>| {
        let id = engine.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        info!(session = id, "session opened");
        Arc::new(DbSession { id })
    })?;

    container.register_transient_type::<dyn ChallengeRepository, SqlChallengeRepository>()?;
    container.register_transient(|repository: Arc<dyn ChallengeRepository>| {
        Arc::new(ChallengeService { repository })
    })?;

    let report = container.validate();
    for warning in &report.warnings {
        info!(%warning, "container validation");
    }
    if let Some(error) = report.errors.first() {
        return Err(error.clone().into());
    }

    Ok(container)
}

async fn user_challenges(
    Path(user_id): Path<u64>,
    Inject(service): Inject<ChallengeService>,
) -> Json<ChallengeSummary> {
    Json(service.summary(user_id))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pulse_di=debug")),
        )
        .init();

    let container = build_container(AppConfig {
        database_url: "postgres://localhost/pulse".to_string(),
        listen_addr: "127.0.0.1:3001".to_string(),
    })?;

    let addr = container.get::<AppConfig>()?.listen_addr.clone();
    let app = Router::new()
        .route("/users/:id/challenges", get(user_challenges))
        .layer(RequestScopeLayer::new(container.clone()));

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    container.dispose_async().await;
    Ok(())
}

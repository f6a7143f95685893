//! Route Dispatch demo host.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                    ROUTE DISPATCH                     │
//!                     │                                                       │
//!   Client Request    │  ┌─────────┐    ┌─────────────┐    ┌──────────────┐  │
//!   ──────────────────┼─▶│  http   │───▶│ application │───▶│   routing    │  │
//!                     │  │ server  │    │   (latch)   │    │   registry   │  │
//!                     │  └─────────┘    └──────┬──────┘    └──────┬───────┘  │
//!                     │       │                │                  │          │
//!                     │       │ static         ▼                  ▼          │
//!                     │       ▼         ┌─────────────┐    ┌──────────────┐  │
//!                     │  ┌─────────┐    │  dispatch   │◀───│ MatchResult  │  │
//!                     │  │ServeDir │    │  pipeline   │    └──────────────┘  │
//!                     │  └─────────┘    └──────┬──────┘                      │
//!   Client Response   │                        │ before/handler/after        │
//!   ◀─────────────────┼────────────────────────┘ catch/finally              │
//!                     │                                                       │
//!                     │  ┌─────────────────────────────────────────────────┐ │
//!                     │  │ config (hot reload) │ observability │ lifecycle │ │
//!                     │  └─────────────────────────────────────────────────┘ │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use serde::{Deserialize, Serialize};

use route_dispatch::dispatch::{BindError, ParamSource};
use route_dispatch::routing::HttpVerb;
use route_dispatch::{
    AppConfig, Application, Controller, ControllerBuilder, Exchange, HandlerResult, Interceptor,
    InterceptorGroup, Reply,
};

#[derive(Parser)]
#[command(name = "route-dispatch")]
#[command(about = "Demo host for the route dispatcher", long_about = None)]
struct Cli {
    /// Path to a TOML config file (enables hot reload)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

/// In-memory user store behind `/api/users`.
#[derive(Default)]
struct UserController {
    users: Arc<Mutex<BTreeMap<u64, User>>>,
}

fn lock(users: &Mutex<BTreeMap<u64, User>>) -> std::sync::MutexGuard<'_, BTreeMap<u64, User>> {
    users.lock().unwrap_or_else(|e| e.into_inner())
}

impl Controller for UserController {
    fn base_paths(&self) -> Vec<String> {
        vec!["/api".to_string()]
    }

    fn configure(&self, routes: &mut ControllerBuilder) {
        let users = Arc::clone(&self.users);
        routes.get("/users", "list", move |_: &mut Exchange| -> HandlerResult {
            let all: Vec<User> = lock(&users).values().cloned().collect();
            Ok(Reply::json(&all)?.into())
        });

        let users = Arc::clone(&self.users);
        routes.get("/users/:id(\\d+)", "show", move |ex: &mut Exchange| -> HandlerResult {
            let id: u64 = ex.bind(ParamSource::Path("id"))?;
            match lock(&users).get(&id) {
                Some(user) => Ok(Reply::json(user)?.into()),
                None => Ok(Reply::not_found(format!("user {id}")).into()),
            }
        });

        let users = Arc::clone(&self.users);
        routes.route(
            [HttpVerb::Post, HttpVerb::Put],
            ["/users/:id(\\d+)"],
            "save",
            move |ex: &mut Exchange| -> HandlerResult {
                let id: u64 = ex.bind(ParamSource::Path("id"))?;
                let name: String = ex.bind(ParamSource::Query("name"))?;
                let user = User { id, name };
                lock(&users).insert(id, user.clone());
                Ok(Reply::json(&user)?.into())
            },
        );

        let users = Arc::clone(&self.users);
        routes.delete("/users/:id(\\d+)", "remove", move |ex: &mut Exchange| -> HandlerResult {
            let id: u64 = ex.bind(ParamSource::Path("id"))?;
            lock(&users).remove(&id);
            Ok(Reply::Ok.into())
        });

        routes
            .interceptor(
                Interceptor::catch("bad-params", |_: &mut Exchange, error| {
                    Ok(Reply::bad_request(error.to_string()).into())
                })
                .catching::<BindError>(),
            )
            .with(&audit());
    }
}

fn audit() -> InterceptorGroup {
    InterceptorGroup::new("audit").interceptor(Interceptor::finally(
        "access-log",
        |ex: &mut Exchange, error: Option<&route_dispatch::dispatch::DynError>| {
            tracing::info!(
                method = %ex.request().method(),
                path = %ex.request().path(),
                status = ex.response().status().as_u16(),
                failed = error.is_some(),
                "Request completed"
            );
            Ok(())
        },
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let app = Application::new(AppConfig::default().routing)
        .controller(UserController::default())
        .on_not_found(|request| Ok(Reply::not_found(format!("No route for {} {}", request.method(), request.path()))));

    route_dispatch::lifecycle::run(cli.config, app).await?;
    Ok(())
}

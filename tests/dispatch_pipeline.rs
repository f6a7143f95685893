//! Application-level dispatch tests (no sockets).

use std::io;
use std::sync::{Arc, Mutex};

use axum::http::{Method, StatusCode};
use route_dispatch::config::RoutingConfig;
use route_dispatch::dispatch::{DispatchError, DynError, ParamSource};
use route_dispatch::http::Request;
use route_dispatch::{
    Application, Controller, ControllerBuilder, Exchange, HandlerResult, Interceptor, InterceptorGroup,
    Outcome, Reply,
};

type Journal = Arc<Mutex<Vec<String>>>;

fn note(journal: &Journal, entry: impl Into<String>) {
    journal.lock().unwrap().push(entry.into());
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

#[derive(Debug, thiserror::Error)]
#[error("quota exceeded")]
struct QuotaExceeded;

#[derive(Debug, thiserror::Error)]
#[error("storage failed")]
struct StorageFailed(#[source] QuotaExceeded);

struct Shop {
    journal: Journal,
}

impl Controller for Shop {
    fn name(&self) -> &str {
        "shop"
    }

    fn base_paths(&self) -> Vec<String> {
        vec!["/shop".into()]
    }

    fn configure(&self, routes: &mut ControllerBuilder) {
        let j = Arc::clone(&self.journal);
        routes.get("/items/new", "new_form", move |_: &mut Exchange| -> HandlerResult {
            note(&j, "handler:new_form");
            Ok(Reply::text("form").into())
        });

        let j = Arc::clone(&self.journal);
        routes.get("/items/:id", "show", move |ex: &mut Exchange| -> HandlerResult {
            let id: u32 = ex.bind(ParamSource::Path("id"))?;
            note(&j, format!("handler:show:{id}"));
            Ok(Reply::text(format!("item {id}")).into())
        });

        let j = Arc::clone(&self.journal);
        routes.post("/items", "create", move |_: &mut Exchange| -> HandlerResult {
            note(&j, "handler:create");
            Err(Box::new(StorageFailed(QuotaExceeded)))
        });

        let j = Arc::clone(&self.journal);
        routes.delete("/items/:id", "remove", move |_: &mut Exchange| -> HandlerResult {
            note(&j, "handler:remove");
            Err(Box::new(io::Error::other("disk gone")))
        });

        for priority in [5, 1, 3] {
            let j = Arc::clone(&self.journal);
            routes.interceptor(
                Interceptor::before(format!("before-{priority}"), move |_| {
                    note(&j, format!("before:{priority}"));
                    Ok(Outcome::Continue)
                })
                .with_priority(priority),
            );
        }

        let j = Arc::clone(&self.journal);
        routes.interceptor(
            Interceptor::after("only-show", move |_| {
                note(&j, "after:show");
                Ok(Outcome::Continue)
            })
            .only(["show"]),
        );

        let j = Arc::clone(&self.journal);
        routes.interceptor(
            Interceptor::catch("quota", move |_: &mut Exchange, error: &DynError| {
                note(&j, format!("catch:{error}"));
                Ok(Reply::error(StatusCode::INSUFFICIENT_STORAGE, "out of space").into())
            })
            .catching::<QuotaExceeded>(),
        );

        let j = Arc::clone(&self.journal);
        routes.with(&InterceptorGroup::new("audit").interceptor(Interceptor::finally(
            "audit",
            move |_: &mut Exchange, error: Option<&DynError>| {
                note(&j, format!("finally:{}", error.map(ToString::to_string).unwrap_or_default()));
                Ok(())
            },
        )));
    }
}

fn shop(routing: RoutingConfig) -> (Application, Journal) {
    let journal = Journal::default();
    let app = Application::new(routing).controller(Shop {
        journal: Arc::clone(&journal),
    });
    (app, journal)
}

#[test]
fn test_before_interceptors_run_by_priority() {
    let (app, journal) = shop(RoutingConfig::default());
    let response = app.handle(Request::new(Method::GET, "/shop/items/9"));

    assert_eq!(response.body_text(), "item 9");
    assert_eq!(
        entries(&journal),
        vec!["before:1", "before:3", "before:5", "handler:show:9", "after:show", "finally:"]
    );
}

#[test]
fn test_only_filter_skips_other_actions() {
    let (app, journal) = shop(RoutingConfig::default());
    app.handle(Request::new(Method::GET, "/shop/items/new"));

    let log = entries(&journal);
    assert!(log.contains(&"handler:new_form".to_string()));
    assert!(!log.contains(&"after:show".to_string()));
}

#[test]
fn test_static_route_wins_over_dynamic() {
    let (app, _) = shop(RoutingConfig::default());
    assert_eq!(app.handle(Request::new(Method::GET, "/shop/items/new")).body_text(), "form");
    assert_eq!(app.handle(Request::new(Method::GET, "/shop/items/123")).body_text(), "item 123");
}

#[test]
fn test_catch_matches_error_cause() {
    let (app, journal) = shop(RoutingConfig::default());
    let response = app.handle(Request::new(Method::POST, "/shop/items"));

    assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
    let log = entries(&journal);
    assert!(log.contains(&"catch:storage failed".to_string()));
    assert_eq!(log.last().unwrap(), "finally:storage failed");
}

#[test]
fn test_unhandled_error_still_runs_finally_once() {
    let (app, journal) = shop(RoutingConfig::default());
    let response = app.handle(Request::new(Method::DELETE, "/shop/items/1"));

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let finals: Vec<_> = entries(&journal)
        .into_iter()
        .filter(|e| e.starts_with("finally:"))
        .collect();
    assert_eq!(finals, vec!["finally:disk gone"]);
}

#[test]
fn test_error_hook_sees_propagated_error() {
    let seen = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&seen);
    let (app, _) = shop(RoutingConfig::default());
    let app = app.on_error(move |_, error| {
        if let DispatchError::Unhandled { action, .. } = error {
            *captured.lock().unwrap() = Some(action.clone());
        }
        Ok(Reply::text("sorry"))
    });

    let response = app.handle(Request::new(Method::DELETE, "/shop/items/1"));
    assert_eq!(response.body_text(), "sorry");
    assert_eq!(seen.lock().unwrap().as_deref(), Some("shop.remove"));
}

#[test]
fn test_bind_failure_propagates() {
    let (app, journal) = shop(RoutingConfig::default());
    let response = app.handle(Request::new(Method::GET, "/shop/items/abc"));

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(entries(&journal).iter().all(|e| !e.starts_with("handler:")));
}

#[test]
fn test_unmatched_verb_falls_through() {
    let (app, journal) = shop(RoutingConfig::default());
    let response = app.handle(Request::new(Method::PATCH, "/shop/items/1"));

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body_text(), "PATCH /shop/items/1");
    assert!(entries(&journal).is_empty());
}

#[test]
fn test_trailing_slash_follows_strict_flag() {
    let (lenient, _) = shop(RoutingConfig::default());
    assert_eq!(lenient.handle(Request::new(Method::GET, "/shop/items/new/")).status(), StatusCode::OK);

    let (strict, _) = shop(RoutingConfig {
        strict: true,
        ..RoutingConfig::default()
    });
    assert_eq!(strict.handle(Request::new(Method::GET, "/shop/items/new/")).status(), StatusCode::NOT_FOUND);
    assert_eq!(strict.handle(Request::new(Method::GET, "/shop/items/new")).status(), StatusCode::OK);
}

#[test]
fn test_concurrent_first_requests_share_one_table() {
    let (app, _) = shop(RoutingConfig::default());
    let app = Arc::new(app);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = Arc::clone(&app);
            std::thread::spawn(move || app.registry().unwrap())
        })
        .collect();
    let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(tables.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use apollo_mirror::MirrorConfig;
use apollo_mirror::Notification;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::oneshot;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use warp::http::StatusCode;
use warp::Filter;
use warp::Reply;

pub const APP_ID: &str = "sample-app";

/// How long the fake server holds a long-poll without news
const LONG_POLL_HOLD: Duration = Duration::from_millis(300);

#[derive(Default)]
struct State {
    releases: Mutex<HashMap<String, (HashMap<String, String>, String)>>,
    notification_ids: Mutex<HashMap<String, i64>>,
    next_id: AtomicI64,
    published: Notify,
    down: AtomicBool,
    configs_hits: AtomicUsize,
    configfiles_hits: AtomicUsize,
}

impl State {
    /// Namespaces whose server-side id differs from what the client sent
    fn updates(
        &self,
        known: &[Notification],
    ) -> Vec<Notification> {
        let ids = self.notification_ids.lock();
        known
            .iter()
            .filter_map(|n| match ids.get(&n.namespace_name) {
                Some(id) if *id != n.notification_id => Some(Notification::new(n.namespace_name.clone(), *id)),
                _ => None,
            })
            .collect()
    }
}

/// Config service double on an ephemeral port
pub struct FakeConfigServer {
    addr: SocketAddr,
    state: Arc<State>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

fn unavailable() -> Box<dyn Reply> {
    Box::new(warp::reply::with_status(warp::reply(), StatusCode::SERVICE_UNAVAILABLE))
}

fn not_modified() -> Box<dyn Reply> {
    Box::new(warp::reply::with_status(warp::reply(), StatusCode::NOT_MODIFIED))
}

fn not_found() -> Box<dyn Reply> {
    Box::new(warp::reply::with_status(warp::reply(), StatusCode::NOT_FOUND))
}

impl FakeConfigServer {
    pub async fn start() -> Self {
        let state = Arc::new(State::default());

        let with_state = {
            let state = state.clone();
            warp::any().map(move || state.clone())
        };

        let notifications = warp::path!("notifications" / "v2")
            .and(warp::query::<HashMap<String, String>>())
            .and(with_state.clone())
            .then(|query: HashMap<String, String>, state: Arc<State>| async move {
                if state.down.load(Ordering::SeqCst) {
                    return unavailable();
                }
                let known: Vec<Notification> = query
                    .get("notifications")
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_default();

                let published = state.published.notified();
                let updates = state.updates(&known);
                if !updates.is_empty() {
                    return Box::new(warp::reply::json(&updates)) as Box<dyn Reply>;
                }

                let _ = tokio::time::timeout(LONG_POLL_HOLD, published).await;
                let updates = state.updates(&known);
                if updates.is_empty() {
                    not_modified()
                } else {
                    Box::new(warp::reply::json(&updates)) as Box<dyn Reply>
                }
            });

        let configs = warp::path!("configs" / String / String / String)
            .and(warp::query::<HashMap<String, String>>())
            .and(with_state.clone())
            .map(
                |app_id: String, cluster: String, namespace: String, query: HashMap<String, String>, state: Arc<State>| {
                    state.configs_hits.fetch_add(1, Ordering::SeqCst);
                    if state.down.load(Ordering::SeqCst) {
                        return unavailable();
                    }
                    let Some((configurations, release_key)) = state.releases.lock().get(&namespace).cloned() else {
                        return not_found();
                    };
                    if query.get("releaseKey") == Some(&release_key) {
                        return not_modified();
                    }
                    Box::new(warp::reply::json(&json!({
                        "appId": app_id,
                        "cluster": cluster,
                        "namespaceName": namespace,
                        "configurations": configurations,
                        "releaseKey": release_key,
                    }))) as Box<dyn Reply>
                },
            );

        let configfiles = warp::path!("configfiles" / "json" / String / String / String)
            .and(with_state)
            .map(|_app_id: String, _cluster: String, namespace: String, state: Arc<State>| {
                state.configfiles_hits.fetch_add(1, Ordering::SeqCst);
                if state.down.load(Ordering::SeqCst) {
                    return unavailable();
                }
                match state.releases.lock().get(&namespace) {
                    Some((configurations, _)) => Box::new(warp::reply::json(configurations)) as Box<dyn Reply>,
                    None => not_found(),
                }
            });

        let routes = notifications.or(configs).unify().or(configfiles).unify();

        let (tx, rx) = oneshot::channel::<()>();
        let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async {
            rx.await.ok();
        });
        let handle = tokio::spawn(server);

        Self {
            addr,
            state,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Sets a namespace's content without notifying
    pub fn seed(
        &self,
        namespace: &str,
        pairs: &[(&str, &str)],
        release_key: &str,
    ) {
        self.state
            .releases
            .lock()
            .insert(namespace.to_string(), (map(pairs), release_key.to_string()));
    }

    /// Sets a namespace's content and wakes the held long-polls
    pub fn publish(
        &self,
        namespace: &str,
        pairs: &[(&str, &str)],
        release_key: &str,
    ) {
        self.seed(namespace, pairs, release_key);
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.notification_ids.lock().insert(namespace.to_string(), id);
        self.state.published.notify_waiters();
    }

    pub fn set_down(
        &self,
        down: bool,
    ) {
        self.state.down.store(down, Ordering::SeqCst);
    }

    pub fn configs_hits(&self) -> usize {
        self.state.configs_hits.load(Ordering::SeqCst)
    }

    pub fn configfiles_hits(&self) -> usize {
        self.state.configfiles_hits.load(Ordering::SeqCst)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        if let Some(handle) = self.handle.take() {
            handle.await.ok();
        }
    }
}

pub fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

pub fn mirror_config(
    address: &str,
    cache_dir: &Path,
    namespaces: &[&str],
) -> MirrorConfig {
    let mut config = MirrorConfig::default();
    config.server.address = address.to_string();
    config.server.app_id = APP_ID.to_string();
    config.server.client_ip = "127.0.0.1".to_string();
    config.server.namespaces = namespaces.iter().map(|s| s.to_string()).collect();
    config.network.request_timeout_in_ms = 2_000;
    config.network.long_poll_timeout_in_ms = 5_000;
    config.retry.poll_retry_delay_in_ms = 100;
    config.retry.refresh_interval_in_secs = 0;
    config.cache.cache_dir = cache_dir.to_path_buf();
    config
}

pub fn backup_path(
    cache_dir: &Path,
    namespace: &str,
) -> std::path::PathBuf {
    cache_dir.join(APP_ID).join(namespace)
}

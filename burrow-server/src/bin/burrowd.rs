use std::{sync::Arc, thread, time::Duration};

use async_trait::async_trait;
use hyper::{Body, Request, Response};
use tokio::{runtime::Builder, time::sleep};

use burrow_common::router::{handle, Router};
use burrow_common::server::{run, ServerHandler};
use burrow_engine::{now, StorageEngine, WaiterRegistry};
use burrow_server::{build_engine, config, make_router};

struct Service {
    engine:           Arc<dyn StorageEngine>,
    waiters:          Arc<WaiterRegistry>,
    router:           Router<(Arc<dyn StorageEngine>, Arc<WaiterRegistry>)>,
    max_message_size: usize,
}

#[async_trait]
impl ServerHandler for Service {
    async fn handle(&self, req: Request<Body>) -> Response<Body> {
        handle(
            Some(self.engine.clone()),
            self.waiters.clone(),
            &self.router,
            self.max_message_size,
            req,
        )
        .await
    }
}

/// Run the reaper on its own single-threaded runtime so it keeps working
/// independently of however busy the server's worker pool is.
fn spawn_reaper(engine: Arc<dyn StorageEngine>) {
    thread::spawn(move || {
        let rt = Builder::new_current_thread().enable_all().build().expect("failed to start reaper runtime");
        rt.block_on(async move {
            loop {
                sleep(Duration::from_secs(1)).await;
                engine.clean(now()).await;
            }
        });
    });
}

fn main() {
    let waiters = Arc::new(WaiterRegistry::new());
    let engine = build_engine(waiters.clone());
    spawn_reaper(engine.clone());

    let max_message_size = config::max_message_size();
    let default_ttl = config::default_ttl();
    let default_hide = config::default_hide();
    let addr = config::bind_address();
    let worker_threads = config::worker_threads();

    run(
        move || Service {
            engine,
            waiters,
            router: make_router(default_ttl, default_hide),
            max_message_size,
        },
        addr,
        worker_threads,
    );
}

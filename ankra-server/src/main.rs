use ankra_core::AnchorWatch;
use ankra_server::{
    bus::ServerBus,
    navdata::NavModel,
    now_ms,
    storage::ConfigStore,
    watch::{DeadlineWaker, WatchRunner},
    web::Web,
    Cli, VERSION,
};
use clap::Parser;
use log::{info, warn};
use miette::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    info!("ankra-server {} starting", VERSION);

    let store = ConfigStore::new(args.data_dir.clone());
    let persisted = store.load();

    let nav = NavModel::new();
    let bus = ServerBus::new(nav.clone(), store);
    let watch = Arc::new(Mutex::new(AnchorWatch::new(
        bus.clone(),
        args.alarm_settings(),
    )));

    if let Some(persisted) = persisted {
        if persisted.on {
            if let Err(e) = watch.lock().unwrap().start(persisted, now_ms()) {
                warn!("Failed to resume persisted anchor watch: {}", e);
            }
        }
    }

    let port = args.port;
    let waker = DeadlineWaker::new();
    let runner = WatchRunner::new(watch.clone(), nav.clone(), waker.clone());
    let web = Web::new(port, watch, nav, bus, waker);

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("Watch", |subsys| runner.run(subsys)));
        s.start(SubsystemBuilder::new("Web", |subsys| web.run(subsys)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(5))
    .await
    .map_err(|e| miette::miette!("{}", e))
}

//! Entry point.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rouille::Server;
use structopt::StructOpt;

use crate::clock::{SystemClock, TimestampProvider};
use crate::cloud::CloudUploader;
use crate::prelude::*;
use crate::scheduler::Node;
use crate::sensor::SimulatedDht;

pub mod clock;
pub mod cloud;
pub mod codec;
pub mod logging;
pub mod opts;
pub mod prelude;
pub mod scheduler;
pub mod sensor;
pub mod settings;
pub mod web;

/// How long one loop iteration may wait for pending HTTP work.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Entry point.
fn main() -> Result {
    let opts = opts::Opts::from_args();
    logging::init(&opts)?;

    info!("Reading settings…");
    let settings = settings::read(&opts.settings)?;
    debug!("Settings: {:?}", &settings);

    info!("Warming up the sensor…");
    let mut sensor = SimulatedDht::new(&settings.sensor);
    sensor.warm_up();

    let clock = TimestampProvider::new(Box::new(SystemClock));
    let uploader = CloudUploader::new(&settings.cloud)?;
    let node = Arc::new(Mutex::new(Node::new(
        &settings,
        Box::new(sensor),
        clock,
        Box::new(uploader),
        Instant::now(),
    )));

    // The server goes up before the clock-sync wait so that the API is
    // reachable even when time sync stalls.
    let address = format!("0.0.0.0:{}", settings.http_port);
    let handler_node = node.clone();
    let server = Server::new(address.as_str(), move |request| {
        let mut node = handler_node.lock().unwrap();
        web::route(request, &mut node)
    })
    .map_err(|error| anyhow!("failed to start the web server on {}: {}", address, error))?;
    info!("Web server listening on {}", server.server_addr());

    {
        let mut node = node.lock().unwrap();
        node.local_addr = Some(server.server_addr());
        info!("Synchronizing the clock…");
        node.clock.sync();
    }

    info!("Entering the main loop…");
    loop {
        server.poll_timeout(POLL_TIMEOUT);
        node.lock().unwrap().tick(Instant::now());
    }
}

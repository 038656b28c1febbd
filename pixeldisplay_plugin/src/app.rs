use crate::config::PluginConfig;
use crate::error::LinkError;
use crate::net::LinkThread;
use crate::protocol::{INBOUND_CAP, OUTBOUND_CAP};
use crate::session::{Flow, Session};
use crossbeam_channel::bounded;
use tracing::{debug, info};

/// Runs the relay until the device host goes away.
pub fn run(config: PluginConfig) -> Result<(), LinkError> {
    let (in_tx, in_rx) = bounded(INBOUND_CAP);
    let (out_tx, out_rx) = bounded(OUTBOUND_CAP);

    let mut session = Session::new(config.session.clone(), out_tx);
    info!(url = %config.device.url(), "connecting to device host");
    let device = LinkThread::device(
        config.device.clone(),
        config.registration.clone(),
        in_tx.clone(),
        out_rx,
    )?;
    session.begin_connect();

    let mut feed: Option<LinkThread> = None;
    for msg in in_rx.iter() {
        match session.handle(msg) {
            Flow::Continue => {}
            Flow::StartFeed => {
                if feed.is_none() {
                    info!(url = %config.board_url, "connecting to board feed");
                    feed = Some(LinkThread::feed(config.board_url.clone(), in_tx.clone())?);
                }
            }
            Flow::Stop => break,
        }
    }

    debug!("session stopped; shutting down links");
    // Unblock any link waiting on a full inbound queue before joining it.
    drop(in_rx);
    drop(session);
    if let Some(feed) = feed {
        feed.shutdown();
    }
    device.shutdown();
    Ok(())
}

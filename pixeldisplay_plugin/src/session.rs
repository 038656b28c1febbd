use crate::board::Board;
use crate::error::BoardError;
use crate::protocol::{
    BoardSnapshot, Channel, DeviceCommand, DeviceEvent, FeedMessage, InboundMsg, OpenUrlPayload,
    OutboundMsg, PixelChange, SetImagePayload, TARGET_HARDWARE_AND_SOFTWARE,
};
use crate::render;
use crossbeam_channel::{Sender, TrySendError};
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

pub const PLUGIN_ACTION: &str = "se.olofspelar.pixeldisplay.action";
pub const OPEN_URL: &str = "https://display.stamsite.nu";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Unopened,
    Open,
    Closed,
}

/// What the runner should do after a message has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    StartFeed,
    Stop,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub action: String,
    pub open_url: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            action: PLUGIN_ACTION.to_string(),
            open_url: OPEN_URL.to_string(),
        }
    }
}

/// Owns the board, the visible contexts and both connection states. Every
/// inbound message is handled to completion before the next one.
pub struct Session {
    outbound_tx: Sender<OutboundMsg>,
    settings: SessionSettings,
    board: Board,
    contexts: BTreeSet<String>,
    device: DeviceState,
    feed: FeedState,
}

impl Session {
    pub fn new(settings: SessionSettings, outbound_tx: Sender<OutboundMsg>) -> Self {
        Self {
            outbound_tx,
            settings,
            board: Board::empty(),
            contexts: BTreeSet::new(),
            device: DeviceState::Disconnected,
            feed: FeedState::Unopened,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(String::as_str)
    }

    pub fn device_state(&self) -> DeviceState {
        self.device
    }

    pub fn feed_state(&self) -> FeedState {
        self.feed
    }

    /// The device link has been spawned with the host's parameters.
    pub fn begin_connect(&mut self) {
        if self.device == DeviceState::Disconnected {
            self.device = DeviceState::Connecting;
        }
    }

    pub fn handle(&mut self, msg: InboundMsg) -> Flow {
        match msg {
            InboundMsg::Opened {
                channel: Channel::Device,
            } => {
                if matches!(self.device, DeviceState::Open | DeviceState::Closed) {
                    return Flow::Continue;
                }
                info!("device socket registered");
                self.device = DeviceState::Open;
                Flow::StartFeed
            }
            InboundMsg::Opened {
                channel: Channel::Feed,
            } => {
                info!("board feed connected");
                self.feed = FeedState::Open;
                Flow::Continue
            }
            InboundMsg::Closed {
                channel: Channel::Device,
                reason,
            } => {
                error!(%reason, "device socket closed");
                self.device = DeviceState::Closed;
                Flow::Stop
            }
            InboundMsg::Closed {
                channel: Channel::Feed,
                reason,
            } => {
                warn!(%reason, "board feed closed; board updates stop until restart");
                self.feed = FeedState::Closed;
                Flow::Continue
            }
            InboundMsg::Device { event } => {
                self.on_device_event(event);
                Flow::Continue
            }
            InboundMsg::Feed { msg } => {
                self.on_feed(msg);
                Flow::Continue
            }
        }
    }

    fn on_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::KeyDown { action, .. } => {
                if action.as_deref() == Some(self.settings.action.as_str()) {
                    debug!(url = %self.settings.open_url, "key down, opening url");
                    self.send(DeviceCommand::OpenUrl {
                        payload: OpenUrlPayload {
                            url: self.settings.open_url.clone(),
                        },
                    });
                }
            }
            DeviceEvent::WillAppear { context, .. } => {
                debug!(%context, "context appeared");
                self.contexts.insert(context);
                self.refresh();
            }
            DeviceEvent::WillDisappear { context, .. } => {
                debug!(%context, "context disappeared");
                self.contexts.remove(&context);
            }
            DeviceEvent::Other => {}
        }
    }

    fn on_feed(&mut self, msg: FeedMessage) {
        let applied = match msg {
            FeedMessage::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            FeedMessage::Delta(change) => self.apply_delta(change),
        };
        match applied {
            Ok(()) => self.refresh(),
            Err(e) => warn!(error = %e, "board update dropped"),
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: BoardSnapshot) -> Result<(), BoardError> {
        let board = Board::try_from(snapshot)?;
        debug!(width = board.width(), height = board.height(), "board replaced");
        self.board.replace(board);
        Ok(())
    }

    pub fn apply_delta(&mut self, change: PixelChange) -> Result<(), BoardError> {
        self.board.set_pixel(change.x, change.y, change.color)
    }

    /// Renders the current board and pushes it, if anyone can see it.
    pub fn refresh(&mut self) {
        if self.contexts.is_empty() || !self.board.has_pixels() {
            return;
        }
        match render::render(&self.board) {
            Ok(image) => self.push_image(&image),
            Err(e) => warn!(error = %e, "render failed; image not pushed"),
        }
    }

    pub fn push_image(&mut self, image: &str) {
        if self.device != DeviceState::Open {
            debug!(state = ?self.device, "device not open; image not pushed");
            return;
        }
        let contexts: Vec<String> = self.contexts.iter().cloned().collect();
        for context in contexts {
            self.send(DeviceCommand::SetImage {
                context,
                payload: SetImagePayload {
                    image: image.to_string(),
                    target: TARGET_HARDWARE_AND_SOFTWARE,
                },
            });
        }
    }

    fn send(&mut self, cmd: DeviceCommand) {
        match self.outbound_tx.try_send(OutboundMsg::Send { cmd }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("outbound queue full; command dropped"),
            Err(TrySendError::Disconnected(_)) => debug!("device link gone; command dropped"),
        }
    }
}

pub const INBOUND_CAP: usize = 256;
pub const OUTBOUND_CAP: usize = 256;

/// Which connection a link message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Device,
    Feed,
}

pub enum InboundMsg {
    Opened { channel: Channel },
    Closed { channel: Channel, reason: String },
    Device { event: DeviceEvent },
    Feed { msg: FeedMessage },
}

pub enum OutboundMsg {
    Send { cmd: DeviceCommand },
}

pub use pixeldisplay_protocol::{
    BoardSnapshot, DeviceCommand, DeviceEvent, FeedMessage, OpenUrlPayload,
    PixelChange, Registration, SetImagePayload, TARGET_HARDWARE_AND_SOFTWARE,
};

mod app;
mod board;
mod codec;
mod config;
mod error;
mod net;
pub mod palette;
mod protocol;
mod render;
mod session;

pub use crate::app::run;
pub use crate::board::{Board, INITIAL_SIZE};
pub use crate::codec::{decode_device, decode_feed};
pub use crate::config::{
    info_versions, normalize_args, parse_board_url, Args, PluginConfig, DEFAULT_BOARD_URL,
};
pub use crate::error::{BoardError, ConfigError, DecodeError, LinkError, PaletteError, RenderError};
pub use crate::net::{DeviceTarget, LinkThread};
pub use crate::protocol::{Channel, InboundMsg, OutboundMsg, INBOUND_CAP, OUTBOUND_CAP};
pub use crate::render::{encode_png, rasterize, render, OUTPUT_SIZE};
pub use crate::session::{
    DeviceState, FeedState, Flow, Session, SessionSettings, OPEN_URL, PLUGIN_ACTION,
};

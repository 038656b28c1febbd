use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `target` value for `setImage`: hardware and software display.
pub const TARGET_HARDWARE_AND_SOFTWARE: u8 = 0;

/// Sent once right after the device-control socket opens.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub event: String,
    pub uuid: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum DeviceEvent {
    KeyDown {
        #[serde(default)]
        action: Option<String>,
        #[serde(default)]
        context: Option<String>,
    },
    WillAppear {
        #[serde(default)]
        action: Option<String>,
        context: String,
    },
    WillDisappear {
        #[serde(default)]
        action: Option<String>,
        context: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum DeviceCommand {
    OpenUrl { payload: OpenUrlPayload },
    SetImage {
        context: String,
        payload: SetImagePayload,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenUrlPayload {
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SetImagePayload {
    pub image: String,
    pub target: u8,
}

/// Envelope of every board-server message. `data` is decoded per `type`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FeedEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

pub const FEED_GET_BOARD: &str = "GetBoard";
pub const FEED_PIXEL_UPDATE: &str = "PixelUpdate";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GetBoardData {
    pub board: BoardSnapshot,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PixelUpdateData {
    pub pixel_changed: PixelChange,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelChange {
    pub x: u32,
    pub y: u32,
    pub color: u8,
}

/// Typed board-server message after the envelope has been decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    Snapshot(BoardSnapshot),
    Delta(PixelChange),
}

impl FeedMessage {
    /// Encodes into the `{type, data}` shape the board server broadcasts.
    pub fn to_envelope(&self) -> Result<FeedEnvelope, serde_json::Error> {
        Ok(match self {
            FeedMessage::Snapshot(board) => FeedEnvelope {
                kind: FEED_GET_BOARD.to_string(),
                data: serde_json::to_value(GetBoardData {
                    board: board.clone(),
                })?,
            },
            FeedMessage::Delta(change) => FeedEnvelope {
                kind: FEED_PIXEL_UPDATE.to_string(),
                data: serde_json::to_value(PixelUpdateData {
                    pixel_changed: *change,
                })?,
            },
        })
    }
}

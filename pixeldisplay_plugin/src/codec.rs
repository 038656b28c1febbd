use crate::error::DecodeError;
use pixeldisplay_protocol::{
    DeviceEvent, FeedEnvelope, FeedMessage, GetBoardData, PixelUpdateData, FEED_GET_BOARD,
    FEED_PIXEL_UPDATE,
};
use tungstenite::Message;

pub fn decode_device(text: &str) -> Result<DeviceEvent, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

/// `Ok(None)` for message types this plugin does not consume.
pub fn decode_feed(text: &str) -> Result<Option<FeedMessage>, DecodeError> {
    let envelope: FeedEnvelope = serde_json::from_str(text)?;
    let msg = match envelope.kind.as_str() {
        FEED_GET_BOARD => {
            let data: GetBoardData = serde_json::from_value(envelope.data)?;
            FeedMessage::Snapshot(data.board)
        }
        FEED_PIXEL_UPDATE => {
            let data: PixelUpdateData = serde_json::from_value(envelope.data)?;
            FeedMessage::Delta(data.pixel_changed)
        }
        _ => return Ok(None),
    };
    Ok(Some(msg))
}

pub fn frame_text(msg: Message) -> Result<String, DecodeError> {
    match msg {
        Message::Text(s) => Ok(s.to_string()),
        Message::Binary(b) => String::from_utf8(b.to_vec()).map_err(|_| DecodeError::NotText),
        _ => Err(DecodeError::NotText),
    }
}

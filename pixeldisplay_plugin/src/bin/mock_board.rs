use pixeldisplay_plugin::palette::COLOR_COUNT;
use pixeldisplay_protocol::{BoardSnapshot, FeedMessage, PixelChange};
use rand::{thread_rng, Rng};
use std::fs;
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tungstenite::{Message, WebSocket};

const DEFAULT_ADDR: &str = "127.0.0.1:0";
const DEFAULT_SIZE: u32 = 64;
const MAX_SIZE: u32 = 1024;
const DEFAULT_INTERVAL_MS: u64 = 100;

fn parse_arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn board_size(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.parse::<u32>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_SIZE)
        .min(MAX_SIZE)
}

fn cell_index(size: u32, change: &PixelChange) -> usize {
    change.y as usize * size as usize + change.x as usize
}

fn send_feed(ws: &mut WebSocket<TcpStream>, msg: &FeedMessage) -> Result<(), String> {
    let envelope = msg.to_envelope().map_err(|e| e.to_string())?;
    let payload = serde_json::to_string(&envelope).map_err(|e| e.to_string())?;
    ws.send(Message::Text(payload.into())).map_err(|e| e.to_string())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let addr = parse_arg_value(&args, "--addr")
        .or_else(|| std::env::var("PIXELDISPLAY_MOCK_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let size = board_size(parse_arg_value(&args, "--size").as_deref());
    let interval = parse_arg_value(&args, "--interval-ms")
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(DEFAULT_INTERVAL_MS));
    let addr_file = parse_arg_value(&args, "--addr-file").map(PathBuf::from);

    let listener = match TcpListener::bind(&addr) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("bind failed on {addr}: {e}");
            std::process::exit(1);
        }
    };
    let _ = listener.set_nonblocking(true);
    let local = match listener.local_addr() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("local addr unavailable: {e}");
            std::process::exit(1);
        }
    };
    if let Some(path) = &addr_file {
        let _ = fs::write(path, local.to_string());
    }
    println!("mock_board listening on ws://{local}");

    let mut rng = thread_rng();
    let mut board = BoardSnapshot {
        width: size,
        height: size,
        pixels: (0..size as usize * size as usize).map(|_| rng.gen_range(0..COLOR_COUNT)).collect(),
    };
    let mut clients: Vec<WebSocket<TcpStream>> = Vec::new();
    let mut next_tick = Instant::now() + interval;

    loop {
        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    let _ = stream.set_nonblocking(false);
                    let mut ws = match tungstenite::accept(stream) {
                        Ok(ws) => ws,
                        Err(e) => {
                            eprintln!("ws handshake failed: {e}");
                            continue;
                        }
                    };
                    if send_feed(&mut ws, &FeedMessage::Snapshot(board.clone())).is_ok() {
                        println!("client {peer} subscribed");
                        clients.push(ws);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    eprintln!("accept failed: {e}");
                    break;
                }
            }
        }

        if Instant::now() >= next_tick {
            next_tick += interval;
            let change = PixelChange {
                x: rng.gen_range(0..size),
                y: rng.gen_range(0..size),
                color: rng.gen_range(0..COLOR_COUNT),
            };
            board.pixels[cell_index(size, &change)] = change.color;
            let msg = FeedMessage::Delta(change);
            clients.retain_mut(|ws| send_feed(ws, &msg).is_ok());
        }

        thread::sleep(Duration::from_millis(5));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_clamped() {
        assert_eq!(board_size(None), DEFAULT_SIZE);
        assert_eq!(board_size(Some("0")), DEFAULT_SIZE);
        assert_eq!(board_size(Some("16")), 16);
        assert_eq!(board_size(Some("4294967295")), MAX_SIZE);
    }

    #[test]
    fn last_cell_of_largest_board_is_in_range() {
        let change = PixelChange {
            x: MAX_SIZE - 1,
            y: MAX_SIZE - 1,
            color: 0,
        };
        let cells = MAX_SIZE as usize * MAX_SIZE as usize;
        assert_eq!(cell_index(MAX_SIZE, &change), cells - 1);
    }
}

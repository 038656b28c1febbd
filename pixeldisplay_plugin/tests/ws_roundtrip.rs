use crossbeam_channel::bounded;
use pixeldisplay_plugin::{parse_board_url, DeviceTarget, PluginConfig, SessionSettings, OPEN_URL, PLUGIN_ACTION};
use pixeldisplay_protocol::{BoardSnapshot, DeviceCommand, FeedMessage, PixelChange, Registration};
use serde::de::DeserializeOwned;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};
use tungstenite::{Message, WebSocket};

fn accept_ws(listener: &TcpListener) -> WebSocket<TcpStream> {
    let (stream, _) = listener.accept().expect("tcp accept");
    let ws = tungstenite::accept(stream).expect("ws accept");
    let _ = ws.get_ref().set_read_timeout(Some(Duration::from_millis(50)));
    let _ = ws.get_ref().set_write_timeout(Some(Duration::from_millis(200)));
    ws
}

fn read_json<T: DeserializeOwned>(ws: &mut WebSocket<TcpStream>, timeout: Duration) -> T {
    let deadline = Instant::now() + timeout;
    loop {
        match ws.read() {
            Ok(Message::Text(s)) => return serde_json::from_str(&s).expect("valid plugin json"),
            Ok(_) => continue,
            Err(tungstenite::Error::Io(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                if Instant::now() >= deadline {
                    panic!("timeout waiting for plugin message");
                }
            }
            Err(e) => panic!("ws read failed: {e:?}"),
        }
    }
}

fn send_text(ws: &mut WebSocket<TcpStream>, text: String) {
    ws.send(Message::Text(text.into())).expect("ws send");
}

fn send_feed(ws: &mut WebSocket<TcpStream>, msg: FeedMessage) {
    let envelope = msg.to_envelope().expect("envelope");
    send_text(ws, serde_json::to_string(&envelope).expect("json"));
}

fn expect_set_image(ws: &mut WebSocket<TcpStream>) -> (String, String) {
    match read_json::<DeviceCommand>(ws, Duration::from_secs(3)) {
        DeviceCommand::SetImage { context, payload } => {
            assert_eq!(payload.target, 0);
            (context, payload.image)
        }
        other => panic!("expected setImage, got: {other:?}"),
    }
}

#[test]
fn ws_register_mirror_board_and_open_url() {
    let device_listener = TcpListener::bind("127.0.0.1:0").expect("bind device host");
    let board_listener = TcpListener::bind("127.0.0.1:0").expect("bind board server");
    let device_addr = device_listener.local_addr().expect("device addr");
    let board_addr = board_listener.local_addr().expect("board addr");

    let (delta_tx, delta_rx) = bounded::<PixelChange>(1);
    let board_server = thread::spawn(move || {
        let mut ws = accept_ws(&board_listener);
        send_feed(
            &mut ws,
            FeedMessage::Snapshot(BoardSnapshot {
                width: 2,
                height: 2,
                pixels: vec![1, 2, 3, 4],
            }),
        );
        if let Ok(change) = delta_rx.recv() {
            send_feed(&mut ws, FeedMessage::Delta(change));
        }
        // Hold the socket until the plugin hangs up.
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            match ws.read() {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(_) => break,
            }
        }
    });

    let config = PluginConfig {
        device: DeviceTarget {
            host: "127.0.0.1".to_string(),
            port: device_addr.port(),
        },
        registration: Registration {
            event: "registerPlugin".to_string(),
            uuid: "TEST-PLUGIN-UUID".to_string(),
        },
        info: serde_json::Value::Null,
        board_url: parse_board_url(&format!("ws://{board_addr}")).expect("board url"),
        session: SessionSettings::default(),
    };
    let plugin = thread::spawn(move || pixeldisplay_plugin::run(config));

    let mut host = accept_ws(&device_listener);
    let registration: Registration = read_json(&mut host, Duration::from_secs(3));
    assert_eq!(registration.event, "registerPlugin");
    assert_eq!(registration.uuid, "TEST-PLUGIN-UUID");

    send_text(
        &mut host,
        format!(r#"{{"event":"willAppear","action":"{PLUGIN_ACTION}","context":"CTX-1","payload":{{}}}}"#),
    );
    let (context, first_image) = expect_set_image(&mut host);
    assert_eq!(context, "CTX-1");
    assert!(first_image.starts_with("data:image/png;base64,"));

    send_text(
        &mut host,
        format!(r#"{{"event":"keyDown","action":"{PLUGIN_ACTION}","context":"CTX-1"}}"#),
    );
    match read_json::<DeviceCommand>(&mut host, Duration::from_secs(3)) {
        DeviceCommand::OpenUrl { payload } => assert_eq!(payload.url, OPEN_URL),
        other => panic!("expected openUrl, got: {other:?}"),
    }

    delta_tx
        .send(PixelChange {
            x: 1,
            y: 1,
            color: 7,
        })
        .expect("board server alive");
    let (context, second_image) = expect_set_image(&mut host);
    assert_eq!(context, "CTX-1");
    assert_ne!(first_image, second_image);

    let _ = host.close(None);
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        match host.read() {
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(_) => break,
        }
    }

    let result = plugin.join().expect("plugin thread");
    assert!(result.is_ok(), "plugin run failed: {result:?}");
    board_server.join().expect("board server thread");
}

#[test]
fn unreachable_device_host_stops_the_plugin() {
    // Grab a free port, then release it so nothing is listening there.
    let port = TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("free port")
        .port();

    let config = PluginConfig {
        device: DeviceTarget {
            host: "127.0.0.1".to_string(),
            port,
        },
        registration: Registration {
            event: "registerPlugin".to_string(),
            uuid: "TEST-PLUGIN-UUID".to_string(),
        },
        info: serde_json::Value::Null,
        board_url: parse_board_url("ws://127.0.0.1:9").expect("board url"),
        session: SessionSettings::default(),
    };
    assert!(pixeldisplay_plugin::run(config).is_ok());
}

#[test]
fn stalled_board_handshake_does_not_block_exit() {
    let device_listener = TcpListener::bind("127.0.0.1:0").expect("bind device host");
    let board_listener = TcpListener::bind("127.0.0.1:0").expect("bind board server");
    let device_addr = device_listener.local_addr().expect("device addr");
    let board_addr = board_listener.local_addr().expect("board addr");

    // Accepts the TCP connection but never answers the websocket upgrade.
    let (accepted_tx, accepted_rx) = bounded::<()>(1);
    let (release_tx, release_rx) = bounded::<()>(1);
    let board_server = thread::spawn(move || {
        let (stream, _) = board_listener.accept().expect("tcp accept");
        let _ = accepted_tx.send(());
        let _ = release_rx.recv_timeout(Duration::from_secs(30));
        drop(stream);
    });

    let config = PluginConfig {
        device: DeviceTarget {
            host: "127.0.0.1".to_string(),
            port: device_addr.port(),
        },
        registration: Registration {
            event: "registerPlugin".to_string(),
            uuid: "TEST-PLUGIN-UUID".to_string(),
        },
        info: serde_json::Value::Null,
        board_url: parse_board_url(&format!("ws://{board_addr}")).expect("board url"),
        session: SessionSettings::default(),
    };
    let (done_tx, done_rx) = bounded(1);
    thread::spawn(move || {
        let _ = done_tx.send(pixeldisplay_plugin::run(config));
    });

    let mut host = accept_ws(&device_listener);
    let _: Registration = read_json(&mut host, Duration::from_secs(3));
    accepted_rx
        .recv_timeout(Duration::from_secs(3))
        .expect("feed link should reach the board server");
    drop(host);

    let result = done_rx
        .recv_timeout(Duration::from_secs(3))
        .expect("run should return promptly after the device host closes");
    assert!(result.is_ok(), "plugin run failed: {result:?}");

    let _ = release_tx.send(());
    board_server.join().expect("board server thread");
}

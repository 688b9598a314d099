//! Integration tests for the session over real loopback sockets.
//!
//! Each test runs a small IPKCP peer on an OS-assigned port in a background
//! thread and drives a [`Session`] against it from the test thread.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, UdpSocket};
use std::thread::{self, JoinHandle};

use ipkcpc::packet::{Request, Response, Status};
use ipkcpc::{Session, SessionState, TransportKind};

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

/// TCP peer that echoes every line and answers `BYE` with `BYE`, then closes.
fn tcp_echo_peer() -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind tcp peer");
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut writer = stream.try_clone().unwrap();
        let mut seen = Vec::new();
        for line in BufReader::new(stream).lines() {
            let line = line.unwrap();
            writer.write_all(format!("{line}\n").as_bytes()).unwrap();
            let done = line == "BYE";
            seen.push(line);
            if done {
                break;
            }
        }
        seen
    });
    (port, handle)
}

/// UDP peer that answers each request with an OK response carrying the same
/// payload, `count` times.
fn udp_echo_peer(count: usize) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind udp peer");
    let port = socket.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        let mut buf = [0u8; 512];
        for _ in 0..count {
            let (n, from) = socket.recv_from(&mut buf).unwrap();
            let req = Request::decode(&buf[..n]).unwrap();
            let resp = Response {
                status: Status::Ok,
                payload: req.payload.clone(),
            };
            socket.send_to(&resp.encode().unwrap(), from).unwrap();
            seen.push(req.payload);
        }
        seen
    });
    (port, handle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn tcp_connect_reaches_up() {
    let (port, peer) = tcp_echo_peer();
    let mut session = Session::new("127.0.0.1", port, TransportKind::Stream);
    assert_eq!(session.state(), SessionState::Initial);
    assert!(session.connect());
    assert_eq!(session.state(), SessionState::Up);
    assert_eq!(session.disconnect(), "BYE");
    assert_eq!(peer.join().unwrap(), vec!["BYE"]);
}

#[test]
fn tcp_connect_to_closed_port_is_errored() {
    let port = {
        let tmp = TcpListener::bind("127.0.0.1:0").unwrap();
        tmp.local_addr().unwrap().port()
    };
    let mut session = Session::new("127.0.0.1", port, TransportKind::Stream);
    assert!(!session.connect());
    assert_eq!(session.state(), SessionState::Errored);
    let cause = session.error_message().expect("cause recorded");
    assert!(!cause.is_empty());
}

#[test]
fn tcp_round_trip_returns_line_unchanged() {
    let (port, peer) = tcp_echo_peer();
    let mut session = Session::new("localhost", port, TransportKind::Stream);
    assert!(session.connect());

    for line in ["HELLO", "SOLVE (+ 1 2)", "  spaced  out  ", "ünïcödé"] {
        let sent = session.send(line).expect("send");
        assert_eq!(sent, line.len() + 1);
        assert_eq!(session.receive().expect("receive"), line);
    }

    assert_eq!(session.disconnect(), "BYE");
    assert_eq!(session.state(), SessionState::Down);
    let seen = peer.join().unwrap();
    assert_eq!(seen.last().map(String::as_str), Some("BYE"));
}

#[test]
fn tcp_server_bye_ends_session() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let peer = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        writer.write_all(b"BYE\n").unwrap();
    });

    let mut session = Session::new("127.0.0.1", port, TransportKind::Stream);
    assert!(session.connect());
    session.send("SOLVE (+ 1").unwrap();
    assert_eq!(session.receive().unwrap(), "BYE");
    assert_eq!(session.state(), SessionState::Down);
    assert_eq!(session.disconnect(), "");
    peer.join().unwrap();
}

#[test]
fn tcp_peer_close_yields_empty_reply() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let peer = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        // Stream dropped here without a reply.
    });

    let mut session = Session::new("127.0.0.1", port, TransportKind::Stream);
    assert!(session.connect());
    session.send("HELLO").unwrap();
    peer.join().unwrap();
    assert_eq!(session.receive().unwrap(), "");
    assert_eq!(session.state(), SessionState::Up);

    session.disconnect();
    assert_eq!(session.state(), SessionState::Down);
}

#[test]
fn udp_round_trip_returns_line_unchanged() {
    let lines = ["(+ 1 2)", "(* 3 (/ 8 2))", "hello world"];
    let (port, peer) = udp_echo_peer(lines.len());
    let mut session = Session::new("127.0.0.1", port, TransportKind::Datagram);
    assert!(session.connect());

    for line in lines {
        assert_eq!(session.send(line).expect("send"), line.len() + 2);
        assert_eq!(session.receive().expect("receive"), line);
    }

    assert_eq!(session.disconnect(), "");
    assert_eq!(session.state(), SessionState::Down);
    let seen = peer.join().unwrap();
    assert_eq!(seen.len(), lines.len());
}

#[test]
fn udp_oversized_line_errors_session() {
    let (_port_holder, port) = {
        let s = UdpSocket::bind("127.0.0.1:0").unwrap();
        let p = s.local_addr().unwrap().port();
        (s, p)
    };
    let mut session = Session::new("127.0.0.1", port, TransportKind::Datagram);
    assert!(session.connect());
    assert!(session.send(&"x".repeat(300)).is_err());
    assert_eq!(session.state(), SessionState::Errored);
    assert!(session.error_message().unwrap().contains("255"));
}

#[test]
fn both_transports_walk_the_same_states() {
    fn walk(mut session: Session) -> Vec<SessionState> {
        let mut states = vec![session.state()];
        session.connect();
        states.push(session.state());
        session.send("(+ 1 2)").unwrap();
        assert_eq!(session.receive().unwrap(), "(+ 1 2)");
        states.push(session.state());
        session.disconnect();
        states.push(session.state());
        states
    }

    let (tcp_port, tcp_peer) = tcp_echo_peer();
    let (udp_port, udp_peer) = udp_echo_peer(1);

    let tcp = walk(Session::new("127.0.0.1", tcp_port, TransportKind::Stream));
    let udp = walk(Session::new("127.0.0.1", udp_port, TransportKind::Datagram));

    assert_eq!(
        tcp,
        vec![
            SessionState::Initial,
            SessionState::Up,
            SessionState::Up,
            SessionState::Down
        ]
    );
    assert_eq!(tcp, udp);
    tcp_peer.join().unwrap();
    udp_peer.join().unwrap();
}

#[test]
fn invalid_parameters_error_before_any_socket() {
    let mut session = Session::new("", 2023, TransportKind::Stream);
    assert_eq!(session.state(), SessionState::Errored);
    assert!(!session.connect());
    assert_eq!(session.disconnect(), "");
    assert_eq!(session.state(), SessionState::Errored);
}

#[test]
fn udp_silent_peer_yields_empty_reply_within_window() {
    use ipkcpc::transport::DatagramTransport;
    use std::time::{Duration, Instant};

    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = silent.local_addr().unwrap().port();
    let transport = DatagramTransport::with_window(Duration::from_millis(300));
    let mut session = Session::with_transport("127.0.0.1", port, Box::new(transport));
    assert!(session.connect());

    session.send("(+ 1 2)").unwrap();
    let started = Instant::now();
    assert_eq!(session.receive().unwrap(), "");
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(session.state(), SessionState::Up);

    assert_eq!(session.disconnect(), "");
    assert_eq!(session.state(), SessionState::Down);
}

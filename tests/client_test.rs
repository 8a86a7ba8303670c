use clap::Parser;
use rtt_probe::client::{
    read_message, ClientError, Config, Result, Session, SessionOutcome, SessionParams,
    TcpConnection, UNSET_RTT_MS,
};
use rtt_probe::protocol::{decode_header, Packet, SequenceNumber};
use rtt_probe::server::{handle_client, serve, EchoCounters};
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Test helper: echo peer on a random port
fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || serve(listener, Arc::new(EchoCounters::default())));
    addr
}

/// Test helper: single-connection peer with custom behavior per message
fn start_custom_server<F>(mut respond: F) -> SocketAddr
where
    F: FnMut(&[u8], &mut TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut writer = stream.try_clone().unwrap();
            while let Ok(Some(message)) = read_message(&mut stream) {
                respond(&message, &mut writer);
            }
        }
    });
    addr
}

fn run_session(addr: SocketAddr, params: SessionParams) -> Result<SessionOutcome> {
    let connection = TcpConnection::connect(&addr.to_string(), Duration::from_secs(1))?;
    let reader = connection.reader()?;
    let session = Session::new(params)?;
    session.run(Arc::new(connection), reader)
}

fn quick_params(count: usize) -> SessionParams {
    SessionParams {
        count,
        interval: Duration::from_millis(10),
        payload_size: 32,
        grace: Duration::from_millis(100),
        terminate_timeout: Duration::from_millis(500),
        stop_timeout: Duration::from_secs(1),
        show_progress: false,
    }
}

#[test]
fn test_config_validation() {
    let config = Config::parse_from(["rtt-client", "--count", "0"]);
    assert!(config.validate().is_err());

    let config = Config::parse_from(["rtt-client", "--count", "5", "--interval-ms", "100"]);
    assert!(config.validate().is_ok());
    assert_eq!(config.interval(), Duration::from_millis(100));
}

#[test]
fn test_end_to_end_five_probes() -> Result<()> {
    let addr = start_echo_server();
    let params = SessionParams {
        count: 5,
        interval: Duration::from_millis(100),
        payload_size: 64,
        grace: Duration::from_secs(3),
        ..SessionParams::default()
    };

    let connection = TcpConnection::connect(&addr.to_string(), Duration::from_secs(1))?;
    let reader = connection.reader()?;
    let session = Session::new(params)?;
    let ledger = Arc::clone(session.ledger());
    let outcome = session.run(Arc::new(connection), reader)?;

    assert!(outcome.completed);
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.probes_sent, 5);
    assert_eq!(outcome.duplicates, 0);

    let report = &outcome.report;
    assert_eq!(report.count(), 5);
    assert_eq!(report.sorted().len(), 5);
    assert_eq!(report.unanswered(), 0);
    assert!(report.min() >= 0);
    assert!(report.max() < 1000, "loopback RTT unexpectedly high: {}", report.max());

    // Five sends 100 ms apart, then the close waits out the grace period.
    assert!(outcome.elapsed >= Duration::from_millis(500 + 3000));
    assert!(outcome.elapsed < Duration::from_millis(500 + 3000 + 2000));

    let offsets: Vec<i32> = ledger
        .iter()
        .map(|slot| slot.sent_offset_ms().expect("probe not sent"))
        .collect();
    for pair in offsets.windows(2) {
        assert!(pair[1] - pair[0] >= 100, "offsets too close: {:?}", offsets);
    }
    Ok(())
}

#[test]
fn test_every_slot_reported_for_small_series() -> Result<()> {
    let addr = start_echo_server();
    for count in [1, 3, 8] {
        let outcome = run_session(addr, quick_params(count))?;
        assert!(outcome.completed);
        assert_eq!(outcome.report.sorted().len(), count);
        assert_eq!(outcome.report.unanswered(), 0);
    }
    Ok(())
}

#[test]
fn test_duplicate_replies_are_counted() -> Result<()> {
    let addr = start_custom_server(|message, writer| {
        let (sequence, _, _) = decode_header(message).unwrap();
        let _ = writer.write_all(message);
        if !sequence.is_terminate() {
            let _ = writer.write_all(message);
        }
    });

    let outcome = run_session(addr, quick_params(3))?;
    assert!(outcome.completed);
    assert_eq!(outcome.duplicates, 3);
    assert_eq!(outcome.report.count(), 3);
    assert_eq!(outcome.report.unanswered(), 0);
    Ok(())
}

#[test]
fn test_silent_peer_leaves_slots_unset() -> Result<()> {
    let addr = start_custom_server(|_, _| {});

    let begin = Instant::now();
    let outcome = run_session(addr, quick_params(3))?;

    assert!(!outcome.completed);
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.probes_sent, 3);
    assert_eq!(outcome.report.unanswered(), 3);
    assert_eq!(outcome.report.sorted(), &[UNSET_RTT_MS; 3]);
    assert_eq!(outcome.report.mean(), UNSET_RTT_MS as f64);
    assert!(begin.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[test]
fn test_unknown_sequence_closes_connection() -> Result<()> {
    let addr = start_custom_server(|_, writer| {
        let bogus = Packet::new(SequenceNumber(99), 0, &[]).unwrap().encode();
        let _ = writer.write_all(&bogus);
    });

    let outcome = run_session(addr, quick_params(50))?;

    assert!(!outcome.completed);
    assert!(matches!(outcome.fault, Some(ClientError::UnknownSequence(99))));
    assert!(outcome.probes_sent < 50);
    assert_eq!(outcome.report.count(), 50);
    Ok(())
}

#[test]
fn test_echo_peer_handles_client_directly() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let counters = Arc::new(EchoCounters::default());
    let server_counters = Arc::clone(&counters);
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        handle_client(stream, &server_counters)
    });

    let mut client = TcpStream::connect(addr)?;
    let probe = Packet::new(SequenceNumber(4), 12, &[7; 10])?.encode();
    client.write_all(&probe)?;
    assert_eq!(read_message(&mut client)?, Some(probe));
    drop(client);

    assert!(server.join().unwrap().is_ok());
    assert_eq!(counters.stats().echoed, 1);
    Ok(())
}

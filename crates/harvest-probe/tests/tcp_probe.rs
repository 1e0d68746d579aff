use std::net::TcpListener as StdListener;
use std::time::Duration;

use harvest_core::{ProxyDescriptor, ProxyKind};
use harvest_probe::{probe_blocking, probe_sequential, ProbeError, ProbeSettings, Prober};
use tokio::net::TcpListener;

fn local(name: &str, port: u16) -> ProxyDescriptor {
    ProxyDescriptor::new(ProxyKind::Socks5, "127.0.0.1", port)
        .unwrap()
        .with_name(Some(name.to_string()))
}

/// A port nothing listens on: bind, read the port, release it.
fn closed_port() -> u16 {
    let l = StdListener::bind("127.0.0.1:0").unwrap();
    l.local_addr().unwrap().port()
}

fn settings() -> ProbeSettings {
    ProbeSettings {
        threshold: Duration::from_secs(2),
        timeout: Duration::from_secs(2),
        concurrency: 4,
    }
}

#[tokio::test]
async fn live_listener_passes_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();
    let closed = closed_port();

    let out = Prober::tcp(settings())
        .probe(vec![local("closed", closed), local("open", open)])
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "open");
    assert!(out[0].latency.is_some());
}

#[tokio::test]
async fn only_closed_ports_is_no_reachable() {
    let err = Prober::tcp(settings())
        .probe(vec![local("a", closed_port()), local("b", closed_port())])
        .await
        .unwrap_err();
    assert_eq!(err, ProbeError::NoReachable { probed: 2 });
}

#[test]
fn sequential_mode_matches_concurrent_semantics() {
    let listener = StdListener::bind("127.0.0.1:0").unwrap();
    let open = listener.local_addr().unwrap().port();
    let out = probe_sequential(
        vec![local("closed", closed_port()), local("open", open)],
        &settings(),
    )
    .unwrap();
    assert_eq!(out.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(), ["open"]);
}

#[test]
fn blocking_entry_point_builds_its_own_runtime() {
    let listener = StdListener::bind("127.0.0.1:0").unwrap();
    let open = listener.local_addr().unwrap().port();
    let out = probe_blocking(vec![local("open", open)], &settings()).unwrap();
    assert_eq!(out[0].name, "open");
    assert!(out[0].latency.unwrap() <= 2000.0);
}

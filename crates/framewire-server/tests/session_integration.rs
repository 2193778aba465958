//! Drives the real acceptor/session pipeline over a loopback TCP socket and
//! checks the wire-level invariants spec.md §8 calls out: every session
//! opens with INIT then FRAME, subsequent packets are well-formed DIRTY or
//! SKIP, and a second viewer connecting later is unaffected by the first
//! (P7 — session isolation).

use std::time::Duration;

use framewire_delta::{apply_dirty, apply_full};
use framewire_server::server;
use framewire_wire::{read_packet, Packet};
use tokio::net::TcpStream;

async fn spawn_test_server() -> std::net::SocketAddr {
    let listener = server::bind_listener("127.0.0.1:0".parse().unwrap()).expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = server::serve(listener, 60, None).await;
    });
    addr
}

/// A viewer's own reconstruction of the streamed framebuffer, driven purely
/// by reading packets off the wire — exercises the same apply path
/// `framewire-viewer` uses, without its task/channel plumbing.
struct ViewerModel {
    width: u32,
    height: u32,
    framebuffer: Vec<u8>,
}

impl ViewerModel {
    async fn read_handshake(stream: &mut TcpStream) -> Self {
        let init = read_packet(stream).await.unwrap().expect("INIT before EOF");
        let Packet::Init { width, height } = Packet::decode(&init).unwrap() else {
            panic!("expected INIT as the first packet");
        };

        let frame = read_packet(stream).await.unwrap().expect("FRAME before EOF");
        let Packet::Frame { body, .. } = Packet::decode(&frame).unwrap() else {
            panic!("expected FRAME as the second packet");
        };

        let mut framebuffer = vec![0u8; width as usize * height as usize * 4];
        apply_full(&mut framebuffer, width, height, &body).unwrap();
        Self { width, height, framebuffer }
    }

    async fn apply_next(&mut self, stream: &mut TcpStream) {
        let payload = read_packet(stream).await.unwrap().expect("packet before EOF");
        match Packet::decode(&payload).unwrap() {
            Packet::Skip => {}
            Packet::Frame { body, .. } => {
                apply_full(&mut self.framebuffer, self.width, self.height, &body).unwrap();
            }
            Packet::Dirty { rects, body, .. } => {
                for rect in &rects {
                    assert!(rect.fits_within(self.width, self.height));
                }
                apply_dirty(&mut self.framebuffer, self.width, self.height, &rects, &body).unwrap();
            }
            Packet::Heartbeat { .. } => {}
            Packet::Init { .. } => panic!("INIT must only appear once, at session start"),
        }
    }
}

#[tokio::test]
async fn session_opens_with_init_then_frame() {
    let addr = spawn_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let viewer = ViewerModel::read_handshake(&mut stream).await;
    assert_eq!(viewer.framebuffer.len(), viewer.width as usize * viewer.height as usize * 4);
}

#[tokio::test]
async fn streaming_ticks_apply_cleanly_for_several_packets() {
    let addr = spawn_test_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut viewer = ViewerModel::read_handshake(&mut stream).await;

    for _ in 0..20 {
        tokio::time::timeout(Duration::from_secs(2), viewer.apply_next(&mut stream))
            .await
            .expect("server should keep ticking");
    }
}

#[tokio::test]
async fn a_second_viewer_joining_later_gets_its_own_clean_handshake() {
    let addr = spawn_test_server().await;

    let mut first = TcpStream::connect(addr).await.unwrap();
    let mut viewer_one = ViewerModel::read_handshake(&mut first).await;
    for _ in 0..5 {
        viewer_one.apply_next(&mut first).await;
    }

    // Second viewer connects after the first has been streaming a while;
    // it must still get a fresh INIT+FRAME bootstrap of its own, independent
    // of whatever the first viewer has already seen.
    let mut second = TcpStream::connect(addr).await.unwrap();
    let mut viewer_two = ViewerModel::read_handshake(&mut second).await;
    assert_eq!(viewer_one.width, viewer_two.width);
    assert_eq!(viewer_one.height, viewer_two.height);

    for _ in 0..5 {
        viewer_one.apply_next(&mut first).await;
        viewer_two.apply_next(&mut second).await;
    }

    drop(first);
    // viewer_one's socket is gone; viewer_two must keep streaming unaffected.
    for _ in 0..5 {
        viewer_two.apply_next(&mut second).await;
    }
}

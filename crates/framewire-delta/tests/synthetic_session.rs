//! Drives [`framewire_capture::SyntheticSource`] through a scripted session
//! and checks the resulting delta stream reconstructs the presenter's
//! canvas on a from-scratch viewer framebuffer.

use std::time::Duration;

use framewire_capture::{CaptureSource, SyntheticSource};
use framewire_capture::synthetic::Tick;
use framewire_delta::encode::{DeltaEncoder, EncodedTick};
use framewire_delta::{apply_dirty, apply_full};
use framewire_wire::DirtyRect;

#[tokio::test]
async fn static_screen_produces_only_skips() {
    let mut source = SyntheticSource::new(4, 4, 0x20);
    for _ in 0..5 {
        source.push(Tick::NoChange);
    }
    let mut encoder = DeltaEncoder::new(4, 4);

    let mut full = vec![0u8; 4 * 4 * 4];
    source.copy_full_frame(&mut full);
    encoder.bootstrap(&full);

    for _ in 0..5 {
        assert_eq!(source.acquire_frame(Duration::from_millis(16)).await, framewire_capture::FrameStatus::Ok);
        let mut rects = Vec::new();
        source.dirty_rects(&mut rects);
        assert!(rects.is_empty());
        assert_eq!(encoder.encode_tick(&rects, &[]), EncodedTick::Skip);
        source.release_frame();
    }
}

#[tokio::test]
async fn damage_ticks_reconstruct_on_viewer_framebuffer() {
    let mut source = SyntheticSource::new(4, 4, 0x00);
    let rect_a = DirtyRect::new(0, 0, 2, 1);
    let rect_b = DirtyRect::new(2, 2, 4, 4);
    source.push(Tick::Damage(vec![(rect_a, vec![0x11; rect_a.byte_len()])]));
    source.push(Tick::NoChange);
    source.push(Tick::Damage(vec![(rect_b, vec![0x22; rect_b.byte_len()])]));

    let mut encoder = DeltaEncoder::new(4, 4);
    let mut full = vec![0u8; 4 * 4 * 4];
    source.copy_full_frame(&mut full);
    encoder.bootstrap(&full);

    let mut viewer_fb = vec![0u8; 4 * 4 * 4];
    apply_full(&mut viewer_fb, 4, 4, &full).unwrap();

    for _ in 0..3 {
        assert_eq!(source.acquire_frame(Duration::from_millis(16)).await, framewire_capture::FrameStatus::Ok);
        let mut rects = Vec::new();
        source.dirty_rects(&mut rects);
        let mut region = vec![0u8; source.dirty_region_size() as usize];
        source.copy_dirty_regions(&mut region);

        match encoder.encode_tick(&rects, &region) {
            EncodedTick::Skip => {}
            EncodedTick::Dirty { rects, body } => {
                apply_dirty(&mut viewer_fb, 4, 4, &rects, &body).unwrap();
            }
        }
        source.release_frame();
    }

    assert_eq!(viewer_fb, encoder.shadow());
    assert_eq!(&viewer_fb[0..8], &[0x11; 8][..]);
    let last_pixel_off = (3 * 4 + 3) * 4;
    assert_eq!(&viewer_fb[last_pixel_off..last_pixel_off + 4], &[0x22; 4][..]);
}

#[tokio::test]
async fn multiple_viewers_stay_isolated_from_each_other() {
    let mut source = SyntheticSource::new(2, 2, 0x00);
    let rect = DirtyRect::new(0, 0, 1, 1);
    source.push(Tick::Damage(vec![(rect, vec![0xAB, 0xCD, 0xEF, 0x01])]));

    let mut encoder = DeltaEncoder::new(2, 2);
    let mut full = vec![0u8; 2 * 2 * 4];
    source.copy_full_frame(&mut full);
    encoder.bootstrap(&full);

    let mut viewer_one = vec![0u8; 2 * 2 * 4];
    let mut viewer_two = vec![0u8; 2 * 2 * 4];
    apply_full(&mut viewer_one, 2, 2, &full).unwrap();
    apply_full(&mut viewer_two, 2, 2, &full).unwrap();

    source.acquire_frame(Duration::from_millis(16)).await;
    let mut rects = Vec::new();
    source.dirty_rects(&mut rects);
    let mut region = vec![0u8; source.dirty_region_size() as usize];
    source.copy_dirty_regions(&mut region);
    let EncodedTick::Dirty { rects, body } = encoder.encode_tick(&rects, &region) else {
        panic!("expected damage");
    };
    source.release_frame();

    // Only viewer_one applies this tick; a slow viewer_two that missed it
    // must not have silently diverged from a buffer neither of them saw.
    apply_dirty(&mut viewer_one, 2, 2, &rects, &body).unwrap();

    assert_ne!(viewer_one, viewer_two);
    assert_eq!(viewer_one, encoder.shadow());
}

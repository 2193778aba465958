//! Presenter-side encoding: maintain a shadow buffer and XOR each tick's
//! dirty pixels against it.

use framewire_wire::DirtyRect;

/// Tracks what every viewer's framebuffer currently holds and turns newly
/// captured dirty regions into XOR bodies against it.
pub struct DeltaEncoder {
    shadow: Vec<u8>,
    width: u32,
}

impl DeltaEncoder {
    /// A shadow buffer of all-zero pixels. Call [`bootstrap`](Self::bootstrap)
    /// before the first real tick, mirroring the INIT+FRAME handshake.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            shadow: vec![0u8; width as usize * height as usize * 4],
            width,
        }
    }

    /// Seed the shadow with a full frame, as sent in the initial FRAME packet.
    pub fn bootstrap(&mut self, full_frame: &[u8]) {
        debug_assert_eq!(full_frame.len(), self.shadow.len());
        self.shadow.copy_from_slice(full_frame);
    }

    /// The encoder's current view of what every viewer's framebuffer holds.
    #[must_use]
    pub fn shadow(&self) -> &[u8] {
        &self.shadow
    }

    /// Encode one tick's dirty rects and concatenated pixel body.
    ///
    /// `dirty_pixels` must be the concatenation, in `rects` order, of each
    /// rect's row-major BGRA bytes (exactly what
    /// [`framewire_capture::CaptureSource::copy_dirty_regions`] writes).
    /// An empty `rects` produces [`EncodedTick::Skip`] — SKIP is semantically
    /// a no-op and never touches the shadow.
    pub fn encode_tick(&mut self, rects: &[DirtyRect], dirty_pixels: &[u8]) -> EncodedTick {
        if rects.is_empty() {
            return EncodedTick::Skip;
        }

        let mut xor_body = vec![0u8; dirty_pixels.len()];
        let mut offset = 0;
        for rect in rects {
            let len = rect.byte_len();
            let dirty = &dirty_pixels[offset..offset + len];
            // XOR against the shadow as it stands right now, then fold this
            // rect's raw pixels in immediately. When a later rect overlaps
            // this one, its XOR is computed against the shadow this rect
            // just wrote, mirroring apply_dirty's cumulative in-order XOR
            // on the viewer side pixel-for-pixel.
            xor_against_shadow(&mut xor_body[offset..offset + len], dirty, &self.shadow, self.width, rect);
            write_into_shadow(&mut self.shadow, self.width, rect, dirty);
            offset += len;
        }

        EncodedTick::Dirty {
            rects: rects.to_vec(),
            body: xor_body,
        }
    }
}

/// What a capture tick turned into, ready to become a [`framewire_wire::Packet`].
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedTick {
    /// Nothing changed; emit a SKIP packet.
    Skip,
    /// Emit a DIRTY packet with these rects and XOR body.
    Dirty {
        rects: Vec<DirtyRect>,
        body: Vec<u8>,
    },
}

fn xor_against_shadow(out: &mut [u8], dirty: &[u8], shadow: &[u8], shadow_width: u32, rect: &DirtyRect) {
    let stride = shadow_width as usize * 4;
    let rect_stride = rect.width() as usize * 4;
    for row in 0..rect.height() as usize {
        let shadow_off = (rect.top as usize + row) * stride + rect.left as usize * 4;
        let local_off = row * rect_stride;
        for i in 0..rect_stride {
            out[local_off + i] = dirty[local_off + i] ^ shadow[shadow_off + i];
        }
    }
}

fn write_into_shadow(shadow: &mut [u8], shadow_width: u32, rect: &DirtyRect, dirty: &[u8]) {
    let stride = shadow_width as usize * 4;
    let rect_stride = rect.width() as usize * 4;
    for row in 0..rect.height() as usize {
        let shadow_off = (rect.top as usize + row) * stride + rect.left as usize * 4;
        let local_off = row * rect_stride;
        shadow[shadow_off..shadow_off + rect_stride].copy_from_slice(&dirty[local_off..local_off + rect_stride]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rects_is_skip_and_leaves_shadow_untouched() {
        let mut enc = DeltaEncoder::new(2, 2);
        let before = enc.shadow().to_vec();
        assert_eq!(enc.encode_tick(&[], &[]), EncodedTick::Skip);
        assert_eq!(enc.shadow(), before.as_slice());
    }

    #[test]
    fn single_rect_updates_shadow_to_dirty_pixels() {
        let mut enc = DeltaEncoder::new(2, 2);
        let rect = DirtyRect::new(0, 0, 1, 1);
        let dirty = vec![0xAA, 0xBB, 0xCC, 0xDD];
        let tick = enc.encode_tick(&[rect], &dirty);
        let EncodedTick::Dirty { body, .. } = tick else {
            panic!("expected Dirty");
        };
        // shadow started zeroed, so XOR against zero is the pixels themselves
        assert_eq!(body, dirty);
        assert_eq!(&enc.shadow()[0..4], dirty.as_slice());
    }

    #[test]
    fn second_identical_tick_xors_to_zero() {
        let mut enc = DeltaEncoder::new(2, 2);
        let rect = DirtyRect::new(0, 0, 1, 1);
        let dirty = vec![0x11, 0x22, 0x33, 0x44];
        let _ = enc.encode_tick(&[rect], &dirty);
        let second = enc.encode_tick(&[rect], &dirty);
        let EncodedTick::Dirty { body, .. } = second else {
            panic!("expected Dirty");
        };
        assert_eq!(body, vec![0u8; 4]);
    }

    #[test]
    fn overlapping_rects_in_one_tick_keep_viewer_in_sync_with_shadow() {
        use crate::apply::apply_dirty;

        let mut enc = DeltaEncoder::new(2, 1);
        // Seed a non-zero shadow so an XOR-against-the-wrong-snapshot bug
        // would actually show up instead of cancelling out against zero.
        enc.bootstrap(&[0x10, 0x10, 0x10, 0x10, 0x20, 0x20, 0x20, 0x20]);
        let mut viewer_fb = enc.shadow().to_vec();

        // `old` repaints both pixels, `new` repaints only the second one,
        // the same pattern a moving-square capture produces every tick.
        let old = DirtyRect::new(0, 0, 2, 1);
        let new = DirtyRect::new(1, 0, 2, 1);
        let dirty = vec![
            0x30, 0x30, 0x30, 0x30, 0x40, 0x40, 0x40, 0x40, // old: 2px
            0x50, 0x50, 0x50, 0x50, // new: 1px, overlaps old's second pixel
        ];

        let tick = enc.encode_tick(&[old, new], &dirty);
        let EncodedTick::Dirty { rects, body } = tick else {
            panic!("expected Dirty");
        };

        apply_dirty(&mut viewer_fb, 2, 1, &rects, &body).unwrap();
        assert_eq!(viewer_fb, enc.shadow(), "viewer framebuffer desynced from presenter shadow");
        // The overlapping pixel must end up as `new`'s value, not `old`'s.
        assert_eq!(&viewer_fb[4..8], &[0x50, 0x50, 0x50, 0x50]);
    }
}

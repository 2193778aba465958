//! Viewer-side application: XOR a DIRTY body into the live framebuffer, or
//! replace it wholesale for a FRAME body.

use framewire_wire::DirtyRect;

/// Apply a DIRTY packet's rects and XOR body to `framebuffer` in place.
///
/// Rects are applied in list order — when two rects overlap, later rects in
/// the list win the overlapping pixels, matching the order the presenter
/// folded them into its shadow.
///
/// # Errors
///
/// Returns [`ApplyError::BodyLengthMismatch`] if `body` isn't exactly the
/// concatenation of each rect's `byte_len`, or [`ApplyError::OutOfBounds`] if
/// any rect falls outside `width x height`.
pub fn apply_dirty(
    framebuffer: &mut [u8],
    width: u32,
    height: u32,
    rects: &[DirtyRect],
    body: &[u8],
) -> Result<(), ApplyError> {
    let expected: usize = rects.iter().map(DirtyRect::byte_len).sum();
    if body.len() != expected {
        return Err(ApplyError::BodyLengthMismatch {
            expected,
            got: body.len(),
            rect_count: rects.len(),
        });
    }

    let mut offset = 0;
    for rect in rects {
        if !rect.fits_within(width, height) {
            return Err(ApplyError::OutOfBounds {
                rect: *rect,
                width,
                height,
            });
        }
        let len = rect.byte_len();
        xor_apply_rect(framebuffer, width, rect, &body[offset..offset + len]);
        offset += len;
    }
    Ok(())
}

/// Replace `framebuffer` wholesale with a FRAME body.
///
/// # Errors
///
/// Returns [`ApplyError::BodyLengthMismatch`] if `body.len()` doesn't equal
/// `width * height * 4`.
pub fn apply_full(framebuffer: &mut [u8], width: u32, height: u32, body: &[u8]) -> Result<(), ApplyError> {
    let expected = width as usize * height as usize * 4;
    if body.len() != expected {
        return Err(ApplyError::BodyLengthMismatch {
            expected,
            got: body.len(),
            rect_count: 0,
        });
    }
    framebuffer.copy_from_slice(body);
    Ok(())
}

fn xor_apply_rect(framebuffer: &mut [u8], fb_width: u32, rect: &DirtyRect, xor_body: &[u8]) {
    let stride = fb_width as usize * 4;
    let rect_stride = rect.width() as usize * 4;
    for row in 0..rect.height() as usize {
        let fb_off = (rect.top as usize + row) * stride + rect.left as usize * 4;
        let local_off = row * rect_stride;
        for i in 0..rect_stride {
            framebuffer[fb_off + i] ^= xor_body[local_off + i];
        }
    }
}

/// Errors applying a DIRTY or FRAME body to a framebuffer.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("rect {rect:?} does not fit within a {width}x{height} framebuffer")]
    OutOfBounds {
        rect: DirtyRect,
        width: u32,
        height: u32,
    },

    #[error("body length {got} does not match expected {expected} for {rect_count} rect(s)")]
    BodyLengthMismatch {
        expected: usize,
        got: usize,
        rect_count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::DeltaEncoder;

    #[test]
    fn xor_round_trip_reconstructs_presenter_shadow() {
        let mut enc = DeltaEncoder::new(2, 2);
        let mut viewer_fb = vec![0u8; 2 * 2 * 4];

        let rect = DirtyRect::new(1, 0, 2, 2);
        let dirty = vec![0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80];
        let tick = enc.encode_tick(&[rect], &dirty);
        let crate::encode::EncodedTick::Dirty { rects, body } = tick else {
            panic!("expected Dirty");
        };

        apply_dirty(&mut viewer_fb, 2, 2, &rects, &body).unwrap();
        assert_eq!(viewer_fb, enc.shadow());
    }

    #[test]
    fn overlapping_rects_apply_in_list_order() {
        let mut fb = vec![0u8; 2 * 1 * 4];
        let first = DirtyRect::new(0, 0, 2, 1);
        let second = DirtyRect::new(1, 0, 2, 1);
        let body: Vec<u8> = vec![
            0x01, 0x01, 0x01, 0x01, 0x02, 0x02, 0x02, 0x02, // first: 2 px
            0x99, 0x99, 0x99, 0x99, // second: 1 px, overlaps pixel 1
        ];
        apply_dirty(&mut fb, 2, 1, &[first, second], &body).unwrap();
        // pixel 0 only touched by `first`
        assert_eq!(&fb[0..4], &[0x01, 0x01, 0x01, 0x01]);
        // pixel 1 touched by `first` then XORed again by `second`
        assert_eq!(&fb[4..8], &[0x02 ^ 0x99, 0x02 ^ 0x99, 0x02 ^ 0x99, 0x02 ^ 0x99]);
    }

    #[test]
    fn out_of_bounds_rect_is_rejected() {
        let mut fb = vec![0u8; 2 * 2 * 4];
        let rect = DirtyRect::new(1, 1, 3, 3); // bottom-right corner spills past 2x2
        let body = vec![0u8; rect.byte_len()];
        assert!(matches!(
            apply_dirty(&mut fb, 2, 2, &[rect], &body),
            Err(ApplyError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn body_length_mismatch_is_rejected() {
        let mut fb = vec![0u8; 2 * 2 * 4];
        let rect = DirtyRect::new(0, 0, 1, 1);
        let short_body = vec![0u8; 3];
        assert!(matches!(
            apply_dirty(&mut fb, 2, 2, &[rect], &short_body),
            Err(ApplyError::BodyLengthMismatch { .. })
        ));
    }

    #[test]
    fn apply_full_replaces_whole_buffer() {
        let mut fb = vec![0xFFu8; 2 * 2 * 4];
        let frame = vec![0x00u8; 2 * 2 * 4];
        apply_full(&mut fb, 2, 2, &frame).unwrap();
        assert_eq!(fb, frame);
    }
}

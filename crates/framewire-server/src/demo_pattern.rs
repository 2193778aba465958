//! Procedural motion fed into [`framewire_capture::SyntheticSource`] for
//! `--synthetic` mode: a small square bouncing around the screen, damaging
//! only the rows it actually moved through each tick.

use framewire_capture::synthetic::Tick;
use framewire_wire::DirtyRect;

const SQUARE: u32 = 24;

/// Deterministic bouncing-square generator.
///
/// Each call to [`next_tick`](Self::next_tick) advances the square one step
/// and returns the [`Tick`] describing the pixels it touched this frame —
/// the square's new position plus the strip it vacated, so the mirrored
/// screen never accumulates a trail.
pub struct DemoPattern {
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
    color: [u8; 4],
}

impl DemoPattern {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            x: 0,
            y: 0,
            dx: 3,
            dy: 2,
            color: [0x00, 0x80, 0xFF, 0xFF],
        }
    }

    /// Advance the square and produce the tick that repaints its old and
    /// new footprint. Returns [`Tick::NoChange`] once every 30th call so the
    /// SKIP path gets real exercise too.
    pub fn next_tick(&mut self, frame_index: u64) -> Tick {
        if frame_index % 30 == 0 {
            return Tick::NoChange;
        }

        let old = self.rect();
        self.step();
        let new = self.rect();

        let mut damage = Vec::with_capacity(2);
        damage.push((old, vec![0x10, 0x10, 0x10, 0xFF].repeat(old.byte_len() / 4)));
        damage.push((new, self.color.repeat(new.byte_len() / 4)));
        Tick::Damage(damage)
    }

    fn rect(&self) -> DirtyRect {
        let left = self.x.max(0) as u32;
        let top = self.y.max(0) as u32;
        DirtyRect::new(left, top, left + SQUARE, top + SQUARE)
    }

    fn step(&mut self) {
        let max_x = self.width as i32 - SQUARE as i32;
        let max_y = self.height as i32 - SQUARE as i32;

        self.x += self.dx;
        if self.x <= 0 {
            self.x = 0;
            self.dx = self.dx.abs();
        } else if self.x >= max_x {
            self.x = max_x;
            self.dx = -self.dx.abs();
        }

        self.y += self.dy;
        if self.y <= 0 {
            self.y = 0;
            self.dy = self.dy.abs();
        } else if self.y >= max_y {
            self.y = max_y;
            self.dy = -self.dy.abs();
        }
    }
}

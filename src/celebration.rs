use rand::seq::SliceRandom;
use rand::Rng;

const CONFETTI: [char; 6] = ['*', '+', 'o', '.', '~', '#'];
const PIECES: usize = 120;
const GRAVITY: f64 = 6.0;

/// One piece of confetti
#[derive(Debug, Clone)]
pub struct ConfettiPiece {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
}

impl ConfettiPiece {
    fn new<R: Rng + ?Sized>(width: f64, rng: &mut R) -> Self {
        Self {
            x: rng.gen_range(0.0..width.max(1.0)),
            // start above the top edge so the burst rains in
            y: rng.gen_range(-12.0..0.0),
            vel_x: rng.gen_range(-2.0..2.0),
            vel_y: rng.gen_range(1.0..4.0),
            symbol: *CONFETTI.choose(rng).unwrap_or(&'*'),
            color_index: rng.gen_range(0..7),
        }
    }

    fn update(&mut self, dt: f64) {
        self.x += self.vel_x * dt;
        self.y += self.vel_y * dt;
        self.vel_y += GRAVITY * dt;
    }
}

/// Confetti burst shown once when a personal best is beaten. Does not recycle:
/// pieces that leave the screen are gone and the burst ends when none remain.
#[derive(Debug, Default)]
pub struct Celebration {
    pub pieces: Vec<ConfettiPiece>,
    pub is_active: bool,
    width: f64,
    height: f64,
}

impl Celebration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, width: u16, height: u16) {
        let mut rng = rand::thread_rng();
        self.width = width as f64;
        self.height = height as f64;
        self.pieces = (0..PIECES)
            .map(|_| ConfettiPiece::new(self.width, &mut rng))
            .collect();
        self.is_active = true;
    }

    /// Advance by `dt` seconds
    pub fn update(&mut self, dt: f64) {
        if !self.is_active {
            return;
        }
        let (width, height) = (self.width, self.height);
        self.pieces.retain_mut(|piece| {
            piece.update(dt);
            piece.y < height && piece.x > -2.0 && piece.x < width + 2.0
        });
        if self.pieces.is_empty() {
            self.is_active = false;
        }
    }

    pub fn stop(&mut self) {
        self.pieces.clear();
        self.is_active = false;
    }
}

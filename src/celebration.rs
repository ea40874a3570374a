use rand::{seq::SliceRandom, Rng};

/// Seconds of animation per tick.
const TICK_DT: f64 = 0.1;
/// Ticks a celebration stays on screen.
pub const CELEBRATION_TICKS: u32 = 25;

const CHEERS: [&str; 6] = [
    "CORRECT!",
    "GREAT JOB!",
    "YOU GOT IT!",
    "AWESOME!",
    "WELL DONE!",
    "SUPER!",
];
const CONFETTI: [char; 6] = ['*', '+', 'o', '•', '~', '#'];
/// Number of colors the renderer cycles through.
pub const PALETTE_LEN: usize = 7;

#[derive(Debug, Clone)]
pub struct ConfettiPiece {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
    pub age: f64,
    pub max_age: f64,
    /// Letters fly to a spot in the cheer word and stay there.
    pub is_text: bool,
    pub target_x: f64,
    pub target_y: f64,
}

impl ConfettiPiece {
    fn scattered<R: Rng + ?Sized>(x: f64, y: f64, rng: &mut R) -> Self {
        Self {
            x,
            y,
            vel_x: rng.gen_range(-3.0..3.0),
            vel_y: rng.gen_range(-4.0..-1.0),
            symbol: *CONFETTI.choose(rng).unwrap_or(&'*'),
            color_index: rng.gen_range(0..PALETTE_LEN),
            age: 0.0,
            max_age: rng.gen_range(1.5..2.5),
            is_text: false,
            target_x: x,
            target_y: y,
        }
    }

    fn letter(from: (f64, f64), to: (f64, f64), symbol: char, color_index: usize) -> Self {
        Self {
            x: from.0,
            y: from.1,
            vel_x: to.0 - from.0,
            vel_y: to.1 - from.1,
            symbol,
            color_index,
            age: 0.0,
            max_age: f64::from(CELEBRATION_TICKS) * TICK_DT,
            is_text: true,
            target_x: to.0,
            target_y: to.1,
        }
    }

    fn update(&mut self, dt: f64) -> bool {
        if self.is_text {
            let dist = ((self.target_x - self.x).powi(2) + (self.target_y - self.y).powi(2)).sqrt();
            let (step_x, step_y) = (self.vel_x * dt * 3.0, self.vel_y * dt * 3.0);
            if dist > 1.0 && (step_x.powi(2) + step_y.powi(2)).sqrt() < dist {
                // ease in
                self.x += step_x;
                self.y += step_y;
                self.vel_x *= 0.9;
                self.vel_y *= 0.9;
            } else {
                self.x = self.target_x;
                self.y = self.target_y;
                self.vel_x = 0.0;
                self.vel_y = 0.0;
            }
        } else {
            self.x += self.vel_x * dt;
            self.y += self.vel_y * dt;
            self.vel_y += 15.0 * dt;
        }

        self.age += dt;
        self.age < self.max_age
    }
}

/// Confetti burst shown after a correct answer. Advances on ticks only, so
/// it runs the same speed under test as on screen.
#[derive(Debug, Default)]
pub struct Celebration {
    pieces: Vec<ConfettiPiece>,
    ticks_left: u32,
    width: f64,
    height: f64,
    cheer: &'static str,
}

impl Celebration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<R: Rng + ?Sized>(&mut self, width: u16, height: u16, rng: &mut R) {
        self.pieces.clear();
        self.ticks_left = CELEBRATION_TICKS;
        self.width = f64::from(width);
        self.height = f64::from(height);
        self.cheer = CHEERS.choose(rng).copied().unwrap_or(CHEERS[0]);

        let center_x = self.width / 2.0;
        let center_y = self.height / 2.0;

        let spacing = 2.0;
        let text_width = (self.cheer.chars().count() as f64 - 1.0) * spacing;
        let left = center_x - text_width / 2.0;
        for (i, ch) in self.cheer.chars().enumerate() {
            if ch == ' ' {
                continue;
            }
            let from = (
                center_x + rng.gen_range(-10.0..10.0),
                center_y + rng.gen_range(-5.0..5.0),
            );
            let to = (left + i as f64 * spacing, center_y - 2.0);
            let color = rng.gen_range(0..PALETTE_LEN);
            self.pieces.push(ConfettiPiece::letter(from, to, ch, color));
        }

        for _ in 0..30 {
            let x = center_x + rng.gen_range(-15.0..15.0);
            let y = center_y + rng.gen_range(-8.0..8.0);
            self.pieces.push(ConfettiPiece::scattered(x, y, rng));
        }
    }

    pub fn tick(&mut self) {
        if self.ticks_left == 0 {
            return;
        }
        self.ticks_left -= 1;
        if self.ticks_left == 0 {
            self.pieces.clear();
            return;
        }

        let (width, height) = (self.width, self.height);
        self.pieces.retain_mut(|piece| {
            let alive = piece.update(TICK_DT);
            if piece.is_text {
                return alive;
            }
            let margin = 5.0;
            let off_screen =
                piece.y > height + margin || piece.x < -margin || piece.x > width + margin;
            alive && !off_screen
        });
    }

    pub fn stop(&mut self) {
        self.ticks_left = 0;
        self.pieces.clear();
    }

    pub fn is_active(&self) -> bool {
        self.ticks_left > 0
    }

    pub fn cheer(&self) -> &str {
        self.cheer
    }

    pub fn pieces(&self) -> &[ConfettiPiece] {
        &self.pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_confetti_falls() {
        let mut piece = ConfettiPiece::scattered(10.0, 10.0, &mut rng());
        let initial_vel_y = piece.vel_y;

        assert!(piece.update(TICK_DT));
        assert!(piece.vel_y > initial_vel_y);
        assert_ne!(piece.y, 10.0);
    }

    #[test]
    fn test_letter_reaches_target() {
        let mut piece = ConfettiPiece::letter((0.0, 0.0), (10.0, 5.0), 'A', 0);
        for _ in 0..20 {
            piece.update(TICK_DT);
        }
        let dist = ((piece.target_x - piece.x).powi(2) + (piece.target_y - piece.y).powi(2)).sqrt();
        assert!(dist <= 1.0, "letter still {dist} away");
    }

    #[test]
    fn test_start_spells_a_cheer() {
        let mut celebration = Celebration::new();
        assert!(!celebration.is_active());

        celebration.start(80, 24, &mut rng());
        assert!(celebration.is_active());
        assert!(CHEERS.contains(&celebration.cheer()));

        let letters: String = celebration
            .pieces()
            .iter()
            .filter(|p| p.is_text)
            .map(|p| p.symbol)
            .collect();
        assert_eq!(letters, celebration.cheer().replace(' ', ""));
        assert!(celebration.pieces().iter().any(|p| !p.is_text));
    }

    #[test]
    fn test_runs_for_fixed_number_of_ticks() {
        let mut celebration = Celebration::new();
        celebration.start(80, 24, &mut rng());

        for _ in 0..CELEBRATION_TICKS - 1 {
            celebration.tick();
            assert!(celebration.is_active());
        }
        celebration.tick();
        assert!(!celebration.is_active());
        assert!(celebration.pieces().is_empty());
    }

    #[test]
    fn test_off_screen_confetti_is_dropped() {
        let mut celebration = Celebration::new();
        celebration.start(20, 10, &mut rng());
        celebration
            .pieces
            .push(ConfettiPiece::scattered(100.0, 100.0, &mut rng()));

        for _ in 0..5 {
            celebration.tick();
        }
        for piece in celebration.pieces().iter().filter(|p| !p.is_text) {
            assert!(piece.y <= 15.0 && piece.x >= -5.0 && piece.x <= 25.0);
        }
    }

    #[test]
    fn test_stop() {
        let mut celebration = Celebration::new();
        celebration.start(80, 24, &mut rng());
        celebration.stop();
        assert!(!celebration.is_active());
        assert!(celebration.pieces().is_empty());
    }
}

use crate::math::Vec2;

/// Last known pointer position and the one before it
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub pos: Vec2,
    pub prev: Vec2,
    /// Set by any move, cleared when the pointer leaves the window
    pub active: bool,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a move and return the distance travelled since the last one
    pub fn move_to(&mut self, x: f32, y: f32) -> f32 {
        self.prev = self.pos;
        self.pos = Vec2::new(x, y);
        self.active = true;
        self.pos.distance(&self.prev)
    }

    pub fn leave(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_tracks_previous() {
        let mut pointer = PointerState::new();
        assert!(!pointer.active);
        assert_eq!(pointer.move_to(3.0, 4.0), 5.0);
        assert_eq!(pointer.move_to(3.0, 5.0), 1.0);
        assert_eq!(pointer.prev, Vec2::new(3.0, 4.0));
        assert!(pointer.active);
        pointer.leave();
        assert!(!pointer.active);
        assert_eq!(pointer.pos, Vec2::new(3.0, 5.0));
    }
}

//! Charged particles and their ionization trails
//!
//! A particle is a plain value record. The chamber owns the live collection
//! and drives integration; this module only knows how a single particle moves
//! and how its trail is bounded.

use crate::math::Vec2;
use std::collections::VecDeque;

/// Sign of a particle's charge, which decides which way it curls in the field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
    Positive,
    Negative,
}

impl Charge {
    /// +1.0 or -1.0
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Charge::Positive => 1.0,
            Charge::Negative => -1.0,
        }
    }
}

/// A recorded past position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub pos: Vec2,
    pub opacity: f32,
}

/// Bounded chronological trail (oldest first)
#[derive(Debug, Clone)]
pub struct Trail {
    points: VecDeque<TrailPoint>,
    max_len: usize,
}

impl Trail {
    pub fn new(max_len: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(max_len.min(256) + 1),
            max_len,
        }
    }

    /// Append a point, dropping the oldest once past `max_len`
    pub fn push(&mut self, point: TrailPoint) {
        self.points.push_back(point);
        self.truncate();
    }

    /// Change the bound, keeping only the newest `max_len` points
    pub fn set_max_len(&mut self, max_len: usize) {
        self.max_len = max_len;
        self.truncate();
    }

    fn truncate(&mut self) {
        while self.points.len() > self.max_len {
            self.points.pop_front();
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailPoint> + '_ {
        self.points.iter()
    }

    pub fn oldest(&self) -> Option<&TrailPoint> {
        self.points.front()
    }

    pub fn newest(&self) -> Option<&TrailPoint> {
        self.points.back()
    }
}

/// A single charged particle
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub charge: Charge,
    /// 1.0 at birth, removed at <= 0
    pub life: f32,
    /// Life lost per frame
    pub decay: f32,
    pub size: f32,
    /// Opacity stamped onto the next trail point
    pub trail_opacity: f32,
    pub trail: Trail,
}

impl Particle {
    pub fn new(
        pos: Vec2,
        vel: Vec2,
        charge: Charge,
        decay: f32,
        size: f32,
        max_trail: usize,
    ) -> Self {
        Self {
            pos,
            vel,
            charge,
            life: 1.0,
            decay,
            size,
            trail_opacity: 1.0,
            trail: Trail::new(max_trail),
        }
    }

    /// Check if particle is still alive
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }

    /// Force from the field on a moving charge: perpendicular to velocity,
    /// `(-vy, vx) * field * charge`
    #[inline]
    pub fn lorentz_force(&self, field: f32) -> Vec2 {
        self.vel.perpendicular() * (field * self.charge.sign())
    }

    /// Advance one frame: record trail, bend, damp, move, age
    pub fn step(&mut self, field: f32, friction: f32, trail_fade: f32) {
        self.trail.push(TrailPoint {
            pos: self.pos,
            opacity: self.trail_opacity,
        });

        let force = self.lorentz_force(field);
        self.vel += force;
        self.vel *= friction;

        self.pos += self.vel;

        self.life -= self.decay;
        self.trail_opacity -= trail_fade;
    }

    /// True when the particle sits strictly inside the surface grown by `margin`
    #[inline]
    pub fn within(&self, width: f32, height: f32, margin: f32) -> bool {
        self.pos.x > -margin
            && self.pos.x < width + margin
            && self.pos.y > -margin
            && self.pos.y < height + margin
    }
}

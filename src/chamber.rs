//! Particle cloud chamber
//!
//! Charged particles are shed from the pointer, curl in a uniform magnetic
//! field, slow under friction and leave ionization trails that fade into the
//! surface. The chamber is a step function plus a render function: the host
//! calls [`ParticleChamber::frame`] once per display refresh.

use crate::config::ChamberConfig;
use crate::display::{alpha_from_opacity, PixelBuffer};
use crate::math::Vec2;
use crate::particles::{Charge, Particle};
use crate::pointer::PointerState;
use crate::preferences::{read_enabled, write_enabled, PreferenceStore};
use crate::theme::{Theme, ThemeSource};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use tracing::{debug, info, trace};

/// Trail segments fade toward the tail: opacity = life * progress * this
const TRAIL_OPACITY: f32 = 0.8;
/// Head radius relative to particle size
const HEAD_SCALE: f32 = 1.5;
/// Glow opacity relative to life
const GLOW_OPACITY: f32 = 0.6;

pub struct ParticleChamber {
    config: ChamberConfig,
    particles: Vec<Particle>,
    pointer: PointerState,
    enabled: bool,
    surface: PixelBuffer,
    store: Box<dyn PreferenceStore>,
    theme: Box<dyn ThemeSource>,
    rng: SmallRng,
}

impl ParticleChamber {
    /// Build a chamber over a `width` x `height` surface.
    ///
    /// The stored preference decides the starting state; a chamber switched
    /// off last session starts disabled with a clean background.
    pub fn new(
        config: ChamberConfig,
        width: u32,
        height: u32,
        store: Box<dyn PreferenceStore>,
        theme: Box<dyn ThemeSource>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let mut chamber = Self {
            particles: Vec::with_capacity(config.max_particles),
            config,
            pointer: PointerState::new(),
            enabled: true,
            surface: PixelBuffer::with_size(width, height),
            store,
            theme,
            rng,
        };
        chamber.clear_surface();

        if !read_enabled(chamber.store.as_ref()) {
            chamber.disable();
        }

        info!(
            width = chamber.surface.width(),
            height = chamber.surface.height(),
            enabled = chamber.enabled,
            max_particles = chamber.config.max_particles,
            "particle chamber ready"
        );
        chamber
    }

    // ------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------

    /// Match the surface to the viewport. Culling uses the new bounds from
    /// the next update on.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface = PixelBuffer::with_size(width, height);
        self.clear_surface();
        debug!(
            width = self.surface.width(),
            height = self.surface.height(),
            "chamber resized"
        );
    }

    /// Track the pointer and emit when it moved far enough
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        let distance = self.pointer.move_to(x, y);
        if self.enabled && distance > self.config.min_pointer_distance {
            self.emit_particles();
        }
    }

    pub fn pointer_left(&mut self) {
        self.pointer.leave();
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    /// Shed a batch of particles at the pointer. Returns how many were added;
    /// zero while disabled or full. A batch never pushes past the cap.
    pub fn emit_particles(&mut self) -> usize {
        if !self.enabled || self.particles.len() >= self.config.max_particles {
            return 0;
        }

        let room = self.config.max_particles - self.particles.len();
        let count = self.config.emission_rate.min(room);
        for _ in 0..count {
            let particle = self.random_particle(self.pointer.pos);
            self.particles.push(particle);
        }

        trace!(
            count,
            live = self.particles.len(),
            x = self.pointer.pos.x,
            y = self.pointer.pos.y,
            "emitted"
        );
        count
    }

    /// Insert a caller-built particle under the same rules as emission.
    ///
    /// Particles that the next update would cull (dead, or outside the
    /// margin) are refused. The trail takes the configured bound.
    pub fn emit_particle(&mut self, mut particle: Particle) -> bool {
        if !self.enabled || self.particles.len() >= self.config.max_particles {
            return false;
        }
        let width = self.surface.width() as f32;
        let height = self.surface.height() as f32;
        if !particle.is_alive() || !particle.within(width, height, self.config.offscreen_margin) {
            trace!(life = particle.life, "refused particle");
            return false;
        }
        if particle.trail.max_len() != self.config.max_trail_length {
            particle.trail.set_max_len(self.config.max_trail_length);
        }
        self.particles.push(particle);
        true
    }

    fn random_particle(&mut self, origin: Vec2) -> Particle {
        let c = &self.config;
        let rng = &mut self.rng;

        let jitter = Vec2::new(
            (rng.gen::<f32>() - 0.5) * c.spread,
            (rng.gen::<f32>() - 0.5) * c.spread,
        );
        let angle = rng.gen_range(0.0..TAU);
        let speed = sample(rng, c.speed_min, c.speed_max);
        let charge = if rng.gen_bool(0.5) {
            Charge::Positive
        } else {
            Charge::Negative
        };
        let decay = sample(rng, c.decay_min, c.decay_max);
        let size = sample(rng, c.size_min, c.size_max);

        Particle::new(
            origin + jitter,
            Vec2::from_angle(angle, speed),
            charge,
            decay,
            size,
            c.max_trail_length,
        )
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Advance every particle one frame and cull the dead and the escaped.
    ///
    /// Does nothing while disabled: particles freeze rather than decay.
    pub fn update_particles(&mut self) {
        if !self.enabled {
            return;
        }

        let c = &self.config;
        let width = self.surface.width() as f32;
        let height = self.surface.height() as f32;

        self.particles.retain_mut(|p| {
            p.step(c.magnetic_field, c.friction, c.trail_fade_speed);
            p.is_alive() && p.within(width, height, c.offscreen_margin)
        });
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Paint one frame onto the surface. The theme is read fresh every call.
    pub fn draw_particles(&mut self) {
        let theme = self.theme.theme();

        if !self.enabled {
            // Nothing lives in a switched-off chamber; keep the background exact
            let (r, g, b) = theme.background();
            self.surface.clear(r, g, b);
            return;
        }

        let (fr, fg, fb) = theme.fade();
        self.surface
            .wash(fr, fg, fb, alpha_from_opacity(self.config.fade_alpha));

        if self.config.connections.enabled {
            self.draw_connections(theme);
        }

        for particle in &self.particles {
            draw_trail(&mut self.surface, particle, theme);
            draw_head(&mut self.surface, particle, theme, &self.config);
        }
    }

    /// Faint links between particles closer than the configured distance
    fn draw_connections(&mut self, theme: Theme) {
        let (r, g, b) = theme.base_tone();
        let max = self.config.connections.max_distance;
        let strength = self.config.connections.opacity;

        for (i, a) in self.particles.iter().enumerate() {
            for other in &self.particles[i + 1..] {
                let d = a.pos.distance(&other.pos);
                if d >= max {
                    continue;
                }
                let alpha = alpha_from_opacity((1.0 - d / max) * strength);
                self.surface.line_blend(
                    a.pos.x as i32,
                    a.pos.y as i32,
                    other.pos.x as i32,
                    other.pos.y as i32,
                    r,
                    g,
                    b,
                    alpha,
                );
            }
        }
    }

    /// Update then draw. The host schedules this once per refresh.
    pub fn frame(&mut self) {
        self.update_particles();
        self.draw_particles();
    }

    // ------------------------------------------------------------------
    // On/off
    // ------------------------------------------------------------------

    pub fn enable(&mut self) {
        self.enabled = true;
        write_enabled(self.store.as_mut(), true);
        debug!("chamber enabled");
    }

    /// Switch off: drop every particle and wipe the surface immediately
    pub fn disable(&mut self) {
        self.enabled = false;
        self.particles.clear();
        self.clear_surface();
        write_enabled(self.store.as_mut(), false);
        debug!("chamber disabled");
    }

    /// Flip the state and return the new one
    pub fn toggle(&mut self) -> bool {
        if self.enabled {
            self.disable();
        } else {
            self.enable();
        }
        self.enabled
    }

    /// Solid fill with the current theme background
    pub fn clear_surface(&mut self) {
        let (r, g, b) = self.theme.theme().background();
        self.surface.clear(r, g, b);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn surface(&self) -> &PixelBuffer {
        &self.surface
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn config(&self) -> &ChamberConfig {
        &self.config
    }

    pub fn theme(&self) -> Theme {
        self.theme.theme()
    }

    pub fn preference(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }
}

/// Uniform in [min, max), or `min` for an empty range
fn sample(rng: &mut SmallRng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// Connected segments from oldest to newest, widening and brightening
/// toward the head
fn draw_trail(surface: &mut PixelBuffer, particle: &Particle, theme: Theme) {
    let len = particle.trail.len();
    if len < 2 {
        return;
    }
    let (r, g, b) = theme.base_tone();

    let mut points = particle.trail.iter();
    let Some(mut prev) = points.next() else {
        return;
    };
    for (i, point) in points.enumerate() {
        let progress = (i + 1) as f32 / len as f32;
        let alpha = alpha_from_opacity(particle.life * progress * TRAIL_OPACITY);
        let width = particle.size * (0.5 + progress * 0.5);
        surface.stroke_segment_blend(
            prev.pos.x,
            prev.pos.y,
            point.pos.x,
            point.pos.y,
            width,
            r,
            g,
            b,
            alpha,
        );
        prev = point;
    }
}

/// Head disc, plus a halo while the particle is young
fn draw_head(
    surface: &mut PixelBuffer,
    particle: &Particle,
    theme: Theme,
    config: &ChamberConfig,
) {
    let (hr, hg, hb) = theme.head_tone();
    let radius = particle.size * HEAD_SCALE;
    let head_alpha = alpha_from_opacity(particle.life);
    let (x, y) = (particle.pos.x, particle.pos.y);

    surface.fill_disc_blend(x, y, radius, hr, hg, hb, head_alpha);

    if particle.life > config.glow_threshold {
        let (gr, gg, gb) = theme.glow_tone();
        let glow_alpha = alpha_from_opacity(particle.life * GLOW_OPACITY);
        surface.glow_ring_blend(x, y, radius, config.glow_blur, gr, gg, gb, glow_alpha);
        surface.fill_disc_blend(x, y, radius, hr, hg, hb, head_alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{MemoryStore, ENABLED_KEY};
    use std::cell::Cell;
    use std::rc::Rc;

    fn chamber_with(config: ChamberConfig) -> ParticleChamber {
        ParticleChamber::new(
            config.with_seed(42),
            640,
            480,
            Box::new(MemoryStore::new()),
            Box::new(Theme::Dark),
        )
    }

    fn chamber() -> ParticleChamber {
        chamber_with(ChamberConfig::default())
    }

    fn still_particle(pos: Vec2, life: f32) -> Particle {
        let mut p = Particle::new(pos, Vec2::new(0.5, 0.0), Charge::Positive, 0.01, 2.0, 100);
        p.life = life;
        p
    }

    #[test]
    fn test_emission_respects_rate() {
        let mut c = chamber();
        assert_eq!(c.emit_particles(), 2);
        assert_eq!(c.particle_count(), 2);
    }

    #[test]
    fn test_emitted_particles_are_in_range() {
        let mut c = chamber_with(ChamberConfig::default().with_capacity(200, 200));
        c.pointer_moved(300.0, 200.0);
        c.emit_particles();
        let cfg = c.config().clone();
        for p in c.particles() {
            let speed = p.vel.length();
            assert!(speed >= cfg.speed_min - 1e-4 && speed < cfg.speed_max + 1e-4);
            assert!(p.decay >= cfg.decay_min && p.decay < cfg.decay_max);
            assert!(p.size >= cfg.size_min && p.size < cfg.size_max);
            assert!((p.pos.x - 300.0).abs() <= cfg.spread / 2.0);
            assert!((p.pos.y - 200.0).abs() <= cfg.spread / 2.0);
            assert_eq!(p.life, 1.0);
            assert!(p.trail.is_empty());
        }
        let positive = c
            .particles()
            .iter()
            .filter(|p| p.charge == Charge::Positive)
            .count();
        assert!(positive > 0 && positive < 200);
    }

    #[test]
    fn test_small_pointer_moves_do_not_emit() {
        let mut c = chamber();
        c.pointer_moved(100.0, 100.0);
        let after_first = c.particle_count();
        c.pointer_moved(101.0, 101.0);
        assert_eq!(c.particle_count(), after_first);
        // Exactly the threshold is not enough
        c.pointer_moved(103.0, 101.0);
        assert_eq!(c.particle_count(), after_first);
        c.pointer_moved(110.0, 101.0);
        assert_eq!(c.particle_count(), after_first + 2);
    }

    #[test]
    fn test_pointer_leave_only_marks_inactive() {
        let mut c = chamber();
        c.pointer_moved(50.0, 50.0);
        let count = c.particle_count();
        c.pointer_left();
        assert!(!c.pointer().active);
        assert_eq!(c.particle_count(), count);
    }

    #[test]
    fn test_first_step_velocity_matches_force() {
        let mut c = chamber();
        let v0 = Vec2::new(1.2, -0.7);
        let k = c.config().magnetic_field;
        let friction = c.config().friction;
        let p = Particle::new(Vec2::new(320.0, 240.0), v0, Charge::Positive, 0.01, 1.0, 100);
        assert!(c.emit_particle(p));

        c.update_particles();

        let v1 = c.particles()[0].vel;
        let expected = Vec2::new(v0.x + -v0.y * k, v0.y + v0.x * k) * friction;
        assert!(v1.approx_eq(&expected, 1e-6));
        assert_eq!(c.particles()[0].trail.len(), 1);
    }

    #[test]
    fn test_inserted_particle_takes_configured_trail_bound() {
        let mut c = chamber_with(ChamberConfig {
            max_trail_length: 5,
            ..ChamberConfig::default()
        });
        let p = Particle::new(
            Vec2::new(320.0, 240.0),
            Vec2::new(0.5, 0.0),
            Charge::Positive,
            0.001,
            1.0,
            1000,
        );
        assert!(c.emit_particle(p));
        assert_eq!(c.particles()[0].trail.max_len(), 5);

        for _ in 0..50 {
            c.update_particles();
        }
        assert_eq!(c.particle_count(), 1);
        assert_eq!(c.particles()[0].trail.len(), 5);
    }

    #[test]
    fn test_dead_or_escaped_particles_are_refused() {
        let mut c = chamber();
        assert!(!c.emit_particle(still_particle(Vec2::new(320.0, 240.0), 0.0)));
        assert!(!c.emit_particle(still_particle(Vec2::new(320.0, 240.0), -3.0)));
        assert!(!c.emit_particle(still_particle(Vec2::new(f32::NAN, 5000.0), 1.0)));
        assert!(!c.emit_particle(still_particle(Vec2::new(2000.0, 240.0), 1.0)));
        assert_eq!(c.particle_count(), 0);
    }

    #[test]
    fn test_particles_culled_outside_margin() {
        let mut c = chamber();
        let mut escaping = still_particle(Vec2::new(-99.0, 240.0), 1.0);
        escaping.vel = Vec2::new(-5.0, 0.0);
        assert!(c.emit_particle(escaping));
        assert!(c.emit_particle(still_particle(Vec2::new(320.0, 240.0), 1.0)));
        c.update_particles();
        assert_eq!(c.particle_count(), 1);
        assert!(c.particles()[0].pos.x > 300.0);
    }

    #[test]
    fn test_particles_culled_when_life_runs_out() {
        let mut c = chamber();
        assert!(c.emit_particle(still_particle(Vec2::new(320.0, 240.0), 0.005)));
        c.update_particles();
        assert_eq!(c.particle_count(), 0);
    }

    #[test]
    fn test_resize_moves_culling_bounds() {
        let mut c = chamber();
        assert!(c.emit_particle(still_particle(Vec2::new(600.0, 400.0), 1.0)));
        c.resize(200, 200);
        assert_eq!((c.surface().width(), c.surface().height()), (200, 200));
        c.update_particles();
        assert_eq!(c.particle_count(), 0);
    }

    #[test]
    fn test_disabled_chamber_refuses_particles() {
        let mut c = chamber();
        c.disable();
        assert_eq!(c.emit_particles(), 0);
        assert!(!c.emit_particle(still_particle(Vec2::new(1.0, 1.0), 1.0)));
        c.pointer_moved(400.0, 400.0);
        assert_eq!(c.particle_count(), 0);
    }

    #[test]
    fn test_update_is_noop_while_disabled() {
        // Frozen, not decaying: a disabled chamber does not step anything
        let mut c = chamber();
        c.disable();
        let before = c.surface().clone();
        for _ in 0..10 {
            c.frame();
        }
        assert_eq!(c.particle_count(), 0);
        assert_eq!(before.as_bytes(), c.surface().as_bytes());
    }

    #[test]
    fn test_disable_clears_surface_to_background() {
        let mut c = chamber();
        c.pointer_moved(300.0, 200.0);
        for i in 0..20 {
            c.pointer_moved(300.0 + i as f32 * 5.0, 200.0);
            c.frame();
        }
        assert!(!c.surface().is_filled_with(13, 17, 23));

        c.disable();
        c.draw_particles();
        assert_eq!(c.particle_count(), 0);
        assert!(c.surface().is_filled_with(13, 17, 23));
    }

    #[test]
    fn test_draw_paints_head_in_theme_tone() {
        let theme = Rc::new(Cell::new(Theme::Light));
        let mut c = ParticleChamber::new(
            ChamberConfig::default().with_seed(1),
            200,
            200,
            Box::new(MemoryStore::new()),
            Box::new(Rc::clone(&theme)),
        );
        assert!(c.emit_particle(still_particle(Vec2::new(100.0, 100.0), 1.0)));

        c.draw_particles();
        assert_eq!(c.surface().get_pixel(100, 100), Some(Theme::Light.head_tone()));

        theme.set(Theme::Dark);
        c.draw_particles();
        assert_eq!(c.surface().get_pixel(100, 100), Some(Theme::Dark.head_tone()));
    }

    #[test]
    fn test_glow_only_above_threshold() {
        let mut c = chamber();
        // Glow ring pixel just outside the head (radius 3)
        assert!(c.emit_particle(still_particle(Vec2::new(100.0, 100.0), 0.9)));
        assert!(c.emit_particle(still_particle(Vec2::new(300.0, 100.0), 0.4)));
        c.clear_surface();
        c.draw_particles();

        let bg = Theme::Dark.background();
        let near_bright = c.surface().get_pixel(104, 100).unwrap();
        let near_dim = c.surface().get_pixel(304, 100).unwrap();
        assert!(near_bright.2 > near_dim.2);
        // The dim particle only got the fade wash there
        assert!(near_dim.0 <= bg.0 && near_dim.2 <= bg.2);
    }

    #[test]
    fn test_connections_off_by_default() {
        let mut c = chamber();
        assert!(c.emit_particle(still_particle(Vec2::new(100.0, 100.0), 0.3)));
        assert!(c.emit_particle(still_particle(Vec2::new(160.0, 100.0), 0.3)));
        c.clear_surface();
        c.draw_particles();
        let between = c.surface().get_pixel(130, 100).unwrap();
        assert!(between.0 <= Theme::Dark.background().0);

        let mut linked = chamber_with(ChamberConfig::default().with_connections(true));
        assert!(linked.emit_particle(still_particle(Vec2::new(100.0, 100.0), 0.3)));
        assert!(linked.emit_particle(still_particle(Vec2::new(160.0, 100.0), 0.3)));
        linked.clear_surface();
        linked.draw_particles();
        let between = linked.surface().get_pixel(130, 100).unwrap();
        assert!(between.0 > Theme::Dark.background().0);
    }

    #[test]
    fn test_starts_disabled_from_preference() {
        let store = MemoryStore::new().with(ENABLED_KEY, "false");
        let c = ParticleChamber::new(
            ChamberConfig::default(),
            100,
            100,
            Box::new(store),
            Box::new(Theme::Light),
        );
        assert!(!c.is_enabled());
        assert!(c.surface().is_filled_with(255, 255, 255));
    }

    #[test]
    fn test_toggle_persists_every_change() {
        let mut c = chamber();
        assert_eq!(c.preference(ENABLED_KEY), None);
        assert!(!c.toggle());
        assert_eq!(c.preference(ENABLED_KEY).as_deref(), Some("false"));
        assert!(c.toggle());
        assert_eq!(c.preference(ENABLED_KEY).as_deref(), Some("true"));
    }
}

/// Background brightness pulse: a triangle wave between 0 and `cap`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pulse {
    /// Brightness change per frame.
    pub step: f32,
    /// Peak brightness.
    pub cap: f32,
}

impl Pulse {
    /// Number of frames from dark to peak.
    ///
    /// At least one whenever `cap` is positive, so a step larger than the cap
    /// still reaches it in a single frame.
    pub fn half_period(&self) -> u32 {
        if self.step <= 0.0 || !self.step.is_finite() || self.cap.is_nan() || self.cap <= 0.0 {
            return 0;
        }
        (self.cap / self.step).round().max(1.0) as u32
    }

    fn grey(&self, level: u32) -> f32 {
        (level as f32 * self.step).min(self.cap)
    }
}

/// Rotation angle after `frame` frames.
///
/// Computed from the frame count instead of accumulated so it never drifts.
pub fn alpha_at(start: f32, step: f32, frame: u64) -> f32 {
    (start as f64 + frame as f64 * step as f64) as f32
}

/// Pulse level after `frame` advances, with `half_period` levels per ramp.
pub fn pulse_level_at(half_period: u32, frame: u64) -> u32 {
    if half_period == 0 {
        return 0;
    }
    let h = half_period as u64;
    let m = frame % (2 * h);
    if m <= h { m as u32 } else { (2 * h - m) as u32 }
}

/// Animation state owned by the frame loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    alpha_start: f32,
    alpha_step: f32,
    frame: u64,

    pulse: Pulse,
    level: u32,
    breeth: bool,
}

impl AnimationState {
    pub fn new(alpha_start: f32, alpha_step: f32, pulse: Pulse) -> Self {
        Self {
            alpha_start,
            alpha_step,
            frame: 0,
            pulse,
            level: 0,
            breeth: true,
        }
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn alpha(&self) -> f32 {
        alpha_at(self.alpha_start, self.alpha_step, self.frame)
    }

    /// Current background brightness, always in `[0, cap]`.
    pub fn grey(&self) -> f32 {
        self.pulse.grey(self.level)
    }

    /// `true` while the pulse is rising.
    pub fn breeth(&self) -> bool {
        self.breeth
    }

    pub fn pulse_level(&self) -> u32 {
        self.level
    }

    /// Moves the pulse one level, turning around at either end.
    pub fn advance_pulse(&mut self) {
        let peak = self.pulse.half_period();
        if peak == 0 {
            return;
        }

        if self.breeth {
            self.level += 1;
            if self.level >= peak {
                self.level = peak;
                self.breeth = false;
            }
        } else {
            self.level = self.level.saturating_sub(1);
            if self.level == 0 {
                self.breeth = true;
            }
        }
    }

    pub fn advance_alpha(&mut self) {
        self.frame += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PULSE: Pulse = Pulse {
        step: 0.0008,
        cap: 0.4,
    };

    #[test]
    fn half_period_rounds() {
        assert_eq!(PULSE.half_period(), 500);
        assert_eq!(Pulse { step: 0.3, cap: 1.0 }.half_period(), 3);
        assert_eq!(Pulse { step: 0.0, cap: 1.0 }.half_period(), 0);
    }

    #[test]
    fn alpha_follows_frame_count_exactly() {
        let mut anim = AnimationState::new(0.02, 0.005, PULSE);
        for n in 0..5000u64 {
            assert_eq!(anim.alpha(), alpha_at(0.02, 0.005, n));
            anim.advance_alpha();
        }
    }

    #[test]
    fn pulse_matches_closed_form_and_stays_bounded() {
        let pulse = Pulse { step: 0.05, cap: 0.3 };
        let h = pulse.half_period();
        let mut anim = AnimationState::new(0.0, 0.01, pulse);

        for n in 1..=100u64 {
            anim.advance_pulse();
            assert_eq!(anim.pulse_level(), pulse_level_at(h, n), "frame {n}");
            let grey = anim.grey();
            assert!((0.0..=pulse.cap).contains(&grey), "grey {grey} at frame {n}");
        }
    }

    #[test]
    fn pulse_turns_at_both_ends() {
        let pulse = Pulse { step: 0.1, cap: 0.2 };
        let mut anim = AnimationState::new(0.0, 0.01, pulse);
        assert!(anim.breeth());

        anim.advance_pulse();
        anim.advance_pulse();
        assert_eq!(anim.pulse_level(), 2);
        assert!(!anim.breeth());
        assert_eq!(anim.grey(), 0.2);

        anim.advance_pulse();
        anim.advance_pulse();
        assert_eq!(anim.pulse_level(), 0);
        assert!(anim.breeth());
    }

    #[test]
    fn step_larger_than_cap_still_pulses() {
        let pulse = Pulse { step: 0.25, cap: 0.1 };
        assert_eq!(pulse.half_period(), 1);

        let mut anim = AnimationState::new(0.0, 0.01, pulse);
        anim.advance_pulse();
        assert_eq!(anim.grey(), 0.1);
        anim.advance_pulse();
        assert_eq!(anim.grey(), 0.0);
        anim.advance_pulse();
        assert_eq!(anim.grey(), 0.1);
    }

    #[test]
    fn zero_cap_stays_dark() {
        let mut anim = AnimationState::new(0.0, 0.01, Pulse { step: 0.1, cap: 0.0 });
        for _ in 0..10 {
            anim.advance_pulse();
            assert_eq!(anim.grey(), 0.0);
        }
    }
}

//! Easing functions for animations
//!
//! An easing maps normalized time `t` in `[0, 1]` to a progress value with
//! `f(0) = 0` and `f(1) = 1`. Intermediate values may leave `[0, 1]` (back and
//! elastic curves overshoot on purpose), and inputs outside `[0, 1]` are
//! extrapolated rather than rejected.
//!
//! Every family is defined by its `In` curve. `Out` is the time-reversed
//! complement `1 - In(1 - t)` and `InOut` plays `In` over the first half and
//! the mirrored curve over the second half.

use std::f64::consts::PI;
use std::str::FromStr;

use crate::error::AnimationError;

/// Which half of a curve family to use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EaseMode {
    In,
    Out,
    #[default]
    InOut,
}

impl EaseMode {
    /// Apply this mode to an `In` curve
    #[inline]
    pub fn apply<F: Fn(f64) -> f64>(self, ease_in: F, t: f64) -> f64 {
        match self {
            EaseMode::In => ease_in(t),
            EaseMode::Out => ease_out(&ease_in, t),
            EaseMode::InOut => ease_in_out(&ease_in, t),
        }
    }
}

/// Easing function type
///
/// `Custom` easings never compare equal, not even to themselves.
#[derive(Clone, Copy, Debug, Default)]
pub enum Easing {
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    #[default]
    CubicInOut,
    SineIn,
    SineOut,
    SineInOut,
    ExpoIn,
    ExpoOut,
    ExpoInOut,
    CircIn,
    CircOut,
    CircInOut,
    BackIn,
    BackOut,
    BackInOut,
    ElasticIn,
    ElasticOut,
    ElasticInOut,
    BounceIn,
    BounceOut,
    BounceInOut,
    /// `t^exponent`
    Poly { exponent: f64, mode: EaseMode },
    /// Back curve with a custom overshoot amplitude
    Back { amplitude: f64, mode: EaseMode },
    /// Exponentially growing sine with a whole number of swings
    Elastic {
        springiness: f64,
        swings: u32,
        mode: EaseMode,
    },
    CubicBezier(f64, f64, f64, f64),
    Custom(fn(f64) -> f64),
}

/// Overshoot used by the back family
pub const BACK_AMPLITUDE: f64 = 1.70158;

impl Easing {
    /// Every easing that can be selected by name
    pub const NAMED: &'static [(&'static str, Easing)] = &[
        ("linear", Easing::Linear),
        ("quad_in", Easing::QuadIn),
        ("quad_out", Easing::QuadOut),
        ("quad_in_out", Easing::QuadInOut),
        ("cubic_in", Easing::CubicIn),
        ("cubic_out", Easing::CubicOut),
        ("cubic_in_out", Easing::CubicInOut),
        ("sine_in", Easing::SineIn),
        ("sine_out", Easing::SineOut),
        ("sine_in_out", Easing::SineInOut),
        ("expo_in", Easing::ExpoIn),
        ("expo_out", Easing::ExpoOut),
        ("expo_in_out", Easing::ExpoInOut),
        ("circ_in", Easing::CircIn),
        ("circ_out", Easing::CircOut),
        ("circ_in_out", Easing::CircInOut),
        ("back_in", Easing::BackIn),
        ("back_out", Easing::BackOut),
        ("back_in_out", Easing::BackInOut),
        ("elastic_in", Easing::ElasticIn),
        ("elastic_out", Easing::ElasticOut),
        ("elastic_in_out", Easing::ElasticInOut),
        ("bounce_in", Easing::BounceIn),
        ("bounce_out", Easing::BounceOut),
        ("bounce_in_out", Easing::BounceInOut),
    ];

    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match *self {
            Easing::Linear => t,
            Easing::QuadIn => quad_in(t),
            Easing::QuadOut => ease_out(quad_in, t),
            Easing::QuadInOut => ease_in_out(quad_in, t),
            Easing::CubicIn => cubic_in(t),
            Easing::CubicOut => ease_out(cubic_in, t),
            Easing::CubicInOut => ease_in_out(cubic_in, t),
            Easing::SineIn => sine_in(t),
            Easing::SineOut => ease_out(sine_in, t),
            Easing::SineInOut => ease_in_out(sine_in, t),
            Easing::ExpoIn => expo_in(t),
            Easing::ExpoOut => ease_out(expo_in, t),
            Easing::ExpoInOut => ease_in_out(expo_in, t),
            Easing::CircIn => circ_in(t),
            Easing::CircOut => ease_out(circ_in, t),
            Easing::CircInOut => ease_in_out(circ_in, t),
            Easing::BackIn => back_in(t),
            Easing::BackOut => ease_out(back_in, t),
            Easing::BackInOut => ease_in_out(back_in, t),
            Easing::ElasticIn => elastic_in(t),
            Easing::ElasticOut => ease_out(elastic_in, t),
            Easing::ElasticInOut => ease_in_out(elastic_in, t),
            Easing::BounceIn => bounce_in(t),
            Easing::BounceOut => ease_out(bounce_in, t),
            Easing::BounceInOut => ease_in_out(bounce_in, t),
            Easing::Poly { exponent, mode } => mode.apply(make::poly_in(exponent), t),
            Easing::Back { amplitude, mode } => mode.apply(make::back_in(amplitude), t),
            Easing::Elastic {
                springiness,
                swings,
                mode,
            } => mode.apply(make::elastic_in(springiness, swings), t),
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, x1, y1, x2, y2),
            Easing::Custom(f) => f(t),
        }
    }

    /// Name under which this easing is listed in [`Easing::NAMED`]
    pub fn name(&self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(_, easing)| easing == self)
            .map(|(name, _)| *name)
    }
}

impl PartialEq for Easing {
    fn eq(&self, other: &Self) -> bool {
        use std::mem::discriminant;

        match (self, other) {
            (
                Easing::Poly { exponent: a, mode: m },
                Easing::Poly { exponent: b, mode: n },
            ) => a == b && m == n,
            (
                Easing::Back { amplitude: a, mode: m },
                Easing::Back { amplitude: b, mode: n },
            ) => a == b && m == n,
            (
                Easing::Elastic {
                    springiness: a,
                    swings: s,
                    mode: m,
                },
                Easing::Elastic {
                    springiness: b,
                    swings: t,
                    mode: n,
                },
            ) => a == b && s == t && m == n,
            (Easing::CubicBezier(a1, b1, c1, d1), Easing::CubicBezier(a2, b2, c2, d2)) => {
                (a1, b1, c1, d1) == (a2, b2, c2, d2)
            }
            (Easing::Custom(_), _) | (_, Easing::Custom(_)) => false,
            _ => discriminant(self) == discriminant(other),
        }
    }
}

impl FromStr for Easing {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::NAMED
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, easing)| *easing)
            .ok_or_else(|| AnimationError::UnknownEasing(s.to_string()))
    }
}

// ============================================================================
// Curve families (In forms)
// ============================================================================

#[inline]
fn quad_in(t: f64) -> f64 {
    t * t
}

#[inline]
fn cubic_in(t: f64) -> f64 {
    t * t * t
}

#[inline]
fn sine_in(t: f64) -> f64 {
    1.0 - (t * PI / 2.0).cos()
}

/// `2^(10(t-1))` squeezed so that it starts exactly at zero
fn expo_in(t: f64) -> f64 {
    squeeze(|x| 2f64.powf(10.0 * (x - 1.0)), 0.0, 1.0, t)
}

#[inline]
fn circ_in(t: f64) -> f64 {
    1.0 - (1.0 - t * t).sqrt()
}

#[inline]
fn back_in(t: f64) -> f64 {
    make::back_in(BACK_AMPLITUDE)(t)
}

#[inline]
fn elastic_in(t: f64) -> f64 {
    (13.0 * t * PI / 2.0).sin() * 2f64.powf(10.0 * (t - 1.0))
}

#[inline]
fn bounce_in(t: f64) -> f64 {
    1.0 - bounce_curve(1.0 - t)
}

/// Four reflected parabolas, each bounce lower than the last
fn bounce_curve(t: f64) -> f64 {
    const N: f64 = 7.5625;
    const D: f64 = 2.75;
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Time-reversed complement of an `In` curve: `1 - f(1 - t)`
#[inline]
pub fn ease_out<F: Fn(f64) -> f64>(f: F, t: f64) -> f64 {
    1.0 - f(1.0 - t)
}

/// `f` scaled into the first half, mirrored complement in the second half
#[inline]
pub fn ease_in_out<F: Fn(f64) -> f64>(f: F, t: f64) -> f64 {
    if t < 0.5 {
        0.5 * f(2.0 * t)
    } else {
        0.5 * (2.0 - f(2.0 - 2.0 * t))
    }
}

/// Build an ease-out curve from an ease-in curve
pub fn to_ease_out<F: Fn(f64) -> f64>(f: F) -> impl Fn(f64) -> f64 {
    move |t| ease_out(&f, t)
}

/// Build an ease-in-out curve from an ease-in curve
pub fn to_ease_in_out<F: Fn(f64) -> f64>(f: F) -> impl Fn(f64) -> f64 {
    move |t| ease_in_out(&f, t)
}

/// Map a unit easing onto the range `start..end`
pub fn ease<F: Fn(f64) -> f64>(f: F, start: f64, end: f64) -> impl Fn(f64) -> f64 {
    move |t| start + f(t) * (end - start)
}

/// Renormalize `f` over `[x1, x2]` so that the result passes through
/// `(0, 0)` and `(1, 1)`.
pub fn squeeze<F: Fn(f64) -> f64>(f: F, x1: f64, x2: f64, t: f64) -> f64 {
    let y1 = f(x1);
    (f(x1 + t * (x2 - x1)) - y1) / (f(x2) - y1)
}

/// Parameterized `In` curves
pub mod make {
    use std::f64::consts::PI;

    /// `t^exponent`
    pub fn poly_in(exponent: f64) -> impl Fn(f64) -> f64 {
        move |t| t.powf(exponent)
    }

    /// Pulls back below zero before accelerating toward one
    pub fn back_in(amplitude: f64) -> impl Fn(f64) -> f64 {
        move |t| t * t * ((1.0 + amplitude) * t - amplitude)
    }

    /// Spring-like curve. A `springiness` around 7 looks natural.
    pub fn elastic_in(springiness: f64, swings: u32) -> impl Fn(f64) -> f64 {
        let s = springiness;
        let n = f64::from(swings);
        move |t| {
            ((s * t).exp() - 1.0) / (s.exp() - 1.0) * ((PI * 2.0 * n + PI * 0.5) * t).sin()
        }
    }
}

/// Cubic bezier easing calculation (matches CSS spec / browser implementations).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    // Solve for parameter `p` where bezier_x(p) == t, falling back to
    // binary search if the slope is too flat.
    let mut p = t;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - t;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2);
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = t;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - t).abs() < 1e-7 {
            break;
        }
        if val < t {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2)
}

/// B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³ in Horner form
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAMILIES: &[(Easing, Easing, Easing)] = &[
        (Easing::QuadIn, Easing::QuadOut, Easing::QuadInOut),
        (Easing::CubicIn, Easing::CubicOut, Easing::CubicInOut),
        (Easing::SineIn, Easing::SineOut, Easing::SineInOut),
        (Easing::ExpoIn, Easing::ExpoOut, Easing::ExpoInOut),
        (Easing::CircIn, Easing::CircOut, Easing::CircInOut),
        (Easing::BackIn, Easing::BackOut, Easing::BackInOut),
        (Easing::ElasticIn, Easing::ElasticOut, Easing::ElasticInOut),
        (Easing::BounceIn, Easing::BounceOut, Easing::BounceInOut),
    ];

    #[test]
    fn test_every_named_easing_hits_endpoints() {
        for (name, easing) in Easing::NAMED {
            assert!(easing.apply(0.0).abs() < 1e-9, "{name}(0) = {}", easing.apply(0.0));
            assert!(
                (easing.apply(1.0) - 1.0).abs() < 1e-9,
                "{name}(1) = {}",
                easing.apply(1.0)
            );
        }
    }

    #[test]
    fn test_out_is_time_reversed_in() {
        for (ease_in, ease_out, _) in FAMILIES {
            for i in 0..=100 {
                let t = i as f64 / 100.0;
                assert_eq!(ease_out.apply(t), 1.0 - ease_in.apply(1.0 - t));
            }
        }
    }

    #[test]
    fn test_in_out_is_symmetric() {
        for (_, _, in_out) in FAMILIES {
            assert!((in_out.apply(0.5) - 0.5).abs() < 1e-9);
            for i in 0..=50 {
                let t = i as f64 / 100.0;
                let mirrored = 1.0 - in_out.apply(1.0 - t);
                assert!((in_out.apply(t) - mirrored).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_back_overshoots_below_zero() {
        assert!(Easing::BackIn.apply(0.2) < 0.0);
        assert!(Easing::BackOut.apply(0.8) > 1.0);
    }

    #[test]
    fn test_parameterized_curves() {
        let poly = Easing::Poly {
            exponent: 4.0,
            mode: EaseMode::In,
        };
        assert!((poly.apply(0.5) - 0.0625).abs() < 1e-12);

        let elastic = Easing::Elastic {
            springiness: 7.0,
            swings: 3,
            mode: EaseMode::Out,
        };
        assert!(elastic.apply(0.0).abs() < 1e-9);
        assert!((elastic.apply(1.0) - 1.0).abs() < 1e-9);

        let back = Easing::Back {
            amplitude: BACK_AMPLITUDE,
            mode: EaseMode::In,
        };
        assert_eq!(back.apply(0.3), Easing::BackIn.apply(0.3));
    }

    #[test]
    fn test_out_of_range_time_extrapolates() {
        assert_eq!(Easing::Linear.apply(-0.5), -0.5);
        assert!((Easing::QuadIn.apply(2.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_cubic_bezier_linear_control_points() {
        let linear = Easing::CubicBezier(0.25, 0.25, 0.75, 0.75);
        for i in 1..10 {
            let t = i as f64 / 10.0;
            assert!((linear.apply(t) - t).abs() < 1e-5);
        }
        assert_eq!(linear.apply(0.0), 0.0);
        assert_eq!(linear.apply(1.0), 1.0);
    }

    #[test]
    fn test_helpers() {
        let ranged = ease(quad_in, 10.0, 20.0);
        assert_eq!(ranged(0.5), 12.5);

        let out = to_ease_out(cubic_in);
        assert_eq!(out(0.25), Easing::CubicOut.apply(0.25));

        let in_out = to_ease_in_out(cubic_in);
        assert_eq!(in_out(0.75), Easing::CubicInOut.apply(0.75));

        let squeezed = |t| squeeze(|x| x * x + 3.0, 1.0, 2.0, t);
        assert_eq!(squeezed(0.0), 0.0);
        assert_eq!(squeezed(1.0), 1.0);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("quad-in-out".parse::<Easing>().unwrap(), Easing::QuadInOut);
        assert_eq!(" Linear ".parse::<Easing>().unwrap(), Easing::Linear);
        assert!(matches!(
            "wobble".parse::<Easing>(),
            Err(AnimationError::UnknownEasing(_))
        ));
        assert_eq!(Easing::BounceOut.name(), Some("bounce_out"));
        assert_eq!(Easing::default(), Easing::CubicInOut);
    }

    #[test]
    fn test_equality_compares_parameters() {
        fn half(t: f64) -> f64 {
            t * 0.5
        }

        let custom = Easing::Custom(half);
        assert_ne!(custom, custom);
        assert_eq!(custom.name(), None);

        let poly = Easing::Poly {
            exponent: 2.0,
            mode: EaseMode::Out,
        };
        assert_eq!(poly, poly);
        assert_ne!(
            poly,
            Easing::Poly {
                exponent: 3.0,
                mode: EaseMode::Out
            }
        );
        assert_ne!(Easing::QuadIn, Easing::QuadOut);
        assert_eq!(
            Easing::CubicBezier(0.25, 0.1, 0.25, 1.0),
            Easing::CubicBezier(0.25, 0.1, 0.25, 1.0)
        );
    }
}

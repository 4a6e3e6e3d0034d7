//! Color math of the host mix node.
//!
//! `a` is the lower color (socket `A`), `b` the upper one (socket `B`), `t` the factor. The
//! result keeps `a`'s alpha; alpha is never produced by a mix node in generated graphs.

use crate::foundation::core::Rgba;
use crate::graph::model::MixBlend;

/// Mix `b` over `a` by `t` with the given blend type.
pub fn mix(blend: MixBlend, t: f32, a: Rgba, b: Rgba) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let lerp = |x: f32, y: f32| x + (y - x) * t;
    match blend {
        MixBlend::Mix => a.zip_rgb(b, lerp),
        MixBlend::Add => a.zip_rgb(b, |x, y| x + t * y),
        MixBlend::Subtract => a.zip_rgb(b, |x, y| x - t * y),
        MixBlend::Multiply => a.zip_rgb(b, |x, y| lerp(x, x * y)),
        MixBlend::Screen => a.zip_rgb(b, |x, y| 1.0 - (1.0 - t + t * (1.0 - y)) * (1.0 - x)),
        MixBlend::Overlay => a.zip_rgb(b, |x, y| {
            if x < 0.5 {
                x * (1.0 - t + 2.0 * t * y)
            } else {
                1.0 - (1.0 - t + 2.0 * t * (1.0 - y)) * (1.0 - x)
            }
        }),
        MixBlend::Divide => a.zip_rgb(b, |x, y| if y != 0.0 { lerp(x, x / y) } else { x }),
        MixBlend::Difference => a.zip_rgb(b, |x, y| lerp(x, (x - y).abs())),
        MixBlend::Exclusion => a.zip_rgb(b, |x, y| lerp(x, x + y - 2.0 * x * y).max(0.0)),
        MixBlend::Darken => a.zip_rgb(b, |x, y| lerp(x, x.min(y))),
        MixBlend::Lighten => a.zip_rgb(b, |x, y| lerp(x, x.max(y))),
        MixBlend::Dodge => a.zip_rgb(b, |x, y| {
            if x == 0.0 {
                return x;
            }
            let d = 1.0 - t * y;
            if d <= 0.0 { 1.0 } else { (x / d).min(1.0) }
        }),
        MixBlend::Burn => a.zip_rgb(b, |x, y| {
            let d = 1.0 - t + t * y;
            if d <= 0.0 {
                0.0
            } else {
                (1.0 - (1.0 - x) / d).clamp(0.0, 1.0)
            }
        }),
        MixBlend::LinearBurn => a.zip_rgb(b, |x, y| x + t * (y - 1.0)),
        MixBlend::LinearLight => a.zip_rgb(b, |x, y| x + t * (2.0 * y - 1.0)),
        MixBlend::SoftLight => a.zip_rgb(b, |x, y| {
            let scr = 1.0 - (1.0 - y) * (1.0 - x);
            (1.0 - t) * x + t * ((1.0 - x) * y * x + x * scr)
        }),
        MixBlend::Hue => {
            let hb = Hsv::from_rgb(b);
            if hb.s == 0.0 {
                return a;
            }
            let ha = Hsv::from_rgb(a);
            let tinted = Hsv { h: hb.h, ..ha }.to_rgb(a.a);
            a.zip_rgb(tinted, lerp)
        }
        MixBlend::Saturation => {
            let ha = Hsv::from_rgb(a);
            if ha.s == 0.0 {
                return a;
            }
            let hb = Hsv::from_rgb(b);
            Hsv {
                s: lerp(ha.s, hb.s),
                ..ha
            }
            .to_rgb(a.a)
        }
        MixBlend::Value => {
            let ha = Hsv::from_rgb(a);
            let hb = Hsv::from_rgb(b);
            Hsv {
                v: lerp(ha.v, hb.v),
                ..ha
            }
            .to_rgb(a.a)
        }
        MixBlend::Color => {
            let hb = Hsv::from_rgb(b);
            if hb.s == 0.0 {
                return a;
            }
            let ha = Hsv::from_rgb(a);
            let tinted = Hsv { v: ha.v, ..hb }.to_rgb(a.a);
            a.zip_rgb(tinted, lerp)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Hsv {
    h: f32,
    s: f32,
    v: f32,
}

impl Hsv {
    fn from_rgb(c: Rgba) -> Self {
        let max = c.r.max(c.g).max(c.b);
        let min = c.r.min(c.g).min(c.b);
        let delta = max - min;
        let s = if max > 0.0 { delta / max } else { 0.0 };
        if delta == 0.0 {
            return Self { h: 0.0, s, v: max };
        }
        let h = if max == c.r {
            ((c.g - c.b) / delta).rem_euclid(6.0)
        } else if max == c.g {
            (c.b - c.r) / delta + 2.0
        } else {
            (c.r - c.g) / delta + 4.0
        };
        Self {
            h: h / 6.0,
            s,
            v: max,
        }
    }

    fn to_rgb(self, alpha: f32) -> Rgba {
        let h = self.h.rem_euclid(1.0) * 6.0;
        let c = self.v * self.s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = self.v - c;
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Rgba::new(r + m, g + m, b + m, alpha)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/blend.rs"]
mod tests;

use super::*;

const RED: Rgba = Rgba::opaque(1.0, 0.0, 0.0);
const GREY: Rgba = Rgba::opaque(0.5, 0.5, 0.5);

fn close(a: Rgba, b: Rgba) -> bool {
    let d = a
        .to_array()
        .iter()
        .zip(b.to_array())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0f32, f32::max);
    d < 1e-5
}

#[test]
fn zero_factor_keeps_lower_color() {
    for blend in [
        MixBlend::Mix,
        MixBlend::Multiply,
        MixBlend::Screen,
        MixBlend::Overlay,
        MixBlend::Add,
        MixBlend::Subtract,
        MixBlend::Difference,
        MixBlend::Darken,
        MixBlend::Lighten,
        MixBlend::SoftLight,
        MixBlend::LinearLight,
        MixBlend::LinearBurn,
        MixBlend::Hue,
        MixBlend::Value,
        MixBlend::Color,
    ] {
        assert!(close(mix(blend, 0.0, GREY, RED), GREY), "{blend:?}");
    }
}

#[test]
fn full_factor_matches_reference_formulas() {
    assert!(close(mix(MixBlend::Mix, 1.0, GREY, RED), RED));
    assert!(close(
        mix(MixBlend::Multiply, 1.0, GREY, RED),
        Rgba::opaque(0.5, 0.0, 0.0)
    ));
    assert!(close(
        mix(MixBlend::Screen, 1.0, GREY, RED),
        Rgba::opaque(1.0, 0.5, 0.5)
    ));
    assert!(close(
        mix(MixBlend::Add, 1.0, GREY, RED),
        Rgba::opaque(1.5, 0.5, 0.5)
    ));
    assert!(close(
        mix(MixBlend::Difference, 1.0, GREY, RED),
        Rgba::opaque(0.5, 0.5, 0.5)
    ));
}

#[test]
fn mix_interpolates_and_keeps_lower_alpha() {
    let below = Rgba::new(1.0, 0.0, 0.0, 0.25);
    let above = Rgba::new(0.0, 0.0, 1.0, 1.0);
    let out = mix(MixBlend::Mix, 0.5, below, above);
    assert!(close(out, Rgba::new(0.5, 0.0, 0.5, 0.25)));
}

#[test]
fn hsv_round_trips_primary_and_grey() {
    for c in [RED, GREY, Rgba::opaque(0.2, 0.6, 0.9)] {
        assert!(close(Hsv::from_rgb(c).to_rgb(1.0), c), "{c:?}");
    }
}

#[test]
fn value_blend_takes_upper_brightness() {
    let out = mix(MixBlend::Value, 1.0, RED, GREY);
    assert!(close(out, Rgba::opaque(0.5, 0.0, 0.0)));
}

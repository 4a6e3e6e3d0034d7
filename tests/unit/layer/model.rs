use super::*;

#[test]
fn blend_mode_parses_display_names_and_psd_keys() {
    assert_eq!(BlendMode::from_psd_name("Linear Dodge"), BlendMode::LinearDodge);
    assert_eq!(BlendMode::from_psd_name("linear_dodge"), BlendMode::LinearDodge);
    assert_eq!(BlendMode::from_psd_name("LINEARDODGE"), BlendMode::LinearDodge);
    assert_eq!(BlendMode::from_psd_name("PassThrough"), BlendMode::Passthrough);
    assert_eq!(BlendMode::from_psd_name("mul "), BlendMode::Multiply);
    assert_eq!(BlendMode::from_psd_name("pass"), BlendMode::Passthrough);
    assert_eq!(BlendMode::from_psd_name("smud"), BlendMode::Exclusion);
    assert_eq!(BlendMode::from_psd_name("no such mode"), BlendMode::Normal);
}

#[test]
fn blend_mode_maps_to_host_mix() {
    assert_eq!(BlendMode::Normal.mix_blend(), MixBlend::Mix);
    assert_eq!(BlendMode::Passthrough.mix_blend(), MixBlend::Mix);
    assert_eq!(BlendMode::ColorDodge.mix_blend(), MixBlend::Dodge);
    assert_eq!(BlendMode::LinearDodge.mix_blend(), MixBlend::Add);
    assert_eq!(BlendMode::Luminosity.mix_blend(), MixBlend::Value);
    assert_eq!(BlendMode::HardMix.mix_blend(), MixBlend::Mix);
}

#[test]
fn layer_kind_parses_reader_names() {
    assert_eq!(LayerKind::from_psd_name("GROUP"), LayerKind::Group);
    assert_eq!(LayerKind::from_psd_name("smart_object"), LayerKind::SmartObject);
    assert_eq!(LayerKind::from_psd_name("Adjustment Layer"), LayerKind::Adjustment);
    assert_eq!(LayerKind::from_psd_name("pixel"), LayerKind::Layer);
    assert_eq!(LayerKind::from_psd_name("3d"), LayerKind::Unknown);
}

#[test]
fn resolved_visibility_prefers_override() {
    let mut r = LayerRecord::layer(1, "a", 0).with_visible(false);
    assert!(!r.resolved_visibility());
    assert_eq!(r.visible_opacity(), 0.0);

    r.visibility_override = VisibilityOverride::ForceShow;
    assert!(r.resolved_visibility());

    r.is_visible = true;
    r.visibility_override = VisibilityOverride::ForceHide;
    assert!(!r.resolved_visibility());
}

#[test]
fn list_rejects_indent_jumps() {
    let err = LayerList::new(vec![
        LayerRecord::group(1, "g", 0, BlendMode::Passthrough),
        LayerRecord::layer(2, "deep", 2),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("indent 2"));

    assert!(LayerList::new(vec![LayerRecord::layer(1, "a", 1)]).is_err());
}

#[test]
fn list_rejects_out_of_range_opacity() {
    assert!(LayerList::new(vec![LayerRecord::layer(1, "a", 0).with_opacity(1.5)]).is_err());
    assert!(LayerList::new(vec![LayerRecord::layer(1, "a", 0).with_opacity(f32::NAN)]).is_err());
}

#[test]
fn clip_bases_resolve_to_nearest_non_clipping_sibling_below() {
    // Display order, top first:
    //   0 clip-b (clip)
    //   1 clip-a (clip)
    //   2 base
    //   3 group
    //   4   inner (clip, no sibling below it in the group)
    //   5 bottom
    let list = LayerList::new(vec![
        LayerRecord::layer(1, "clip-b", 0).clipping(),
        LayerRecord::layer(2, "clip-a", 0).clipping(),
        LayerRecord::layer(3, "base", 0),
        LayerRecord::group(4, "group", 0, BlendMode::Normal),
        LayerRecord::layer(5, "inner", 1).clipping(),
        LayerRecord::layer(6, "bottom", 0),
    ])
    .unwrap();

    let bases: Vec<_> = list.iter().map(|r| r.clip_base_index).collect();
    assert_eq!(bases, vec![Some(2), Some(2), None, None, None, None]);
}

#[test]
fn clip_bases_do_not_cross_group_boundaries() {
    let list = LayerList::new(vec![
        LayerRecord::group(1, "top", 0, BlendMode::Normal),
        LayerRecord::layer(2, "clip", 1).clipping(),
        LayerRecord::group(3, "bottom", 0, BlendMode::Normal),
        LayerRecord::layer(4, "content", 1),
    ])
    .unwrap();

    assert_eq!(list.get(1).unwrap().clip_base_index, None);
}

#[test]
fn carry_overrides_matches_by_id_only() {
    let mut old = LayerList::new(vec![
        LayerRecord::layer(7, "a", 0),
        LayerRecord::layer(0, "legacy", 0),
    ])
    .unwrap();
    assert!(old.set_visibility_override(LayerId(7), VisibilityOverride::ForceHide));
    assert!(!old.set_visibility_override(LayerId(0), VisibilityOverride::ForceHide));

    let mut new = LayerList::new(vec![
        LayerRecord::layer(0, "legacy", 0),
        LayerRecord::layer(7, "a renamed", 0),
    ])
    .unwrap();
    new.carry_overrides_from(&old);

    assert_eq!(
        new.get(1).unwrap().visibility_override,
        VisibilityOverride::ForceHide
    );
    assert_eq!(
        new.get(0).unwrap().visibility_override,
        VisibilityOverride::FollowSource
    );
}

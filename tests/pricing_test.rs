//! Cost estimation integration tests.

use std::collections::HashMap;

use assert_matches::assert_matches;
use smartmedia::pricing::{
    calculate_cost, load_location_pricing, LocationPricing, PricingCalculator, RegionPrices,
    StaticPricingSource, TranscodePreset, VideoOutput,
};
use smartmedia_common::Error;

fn preset(id: &str, max_height: Option<Option<u32>>) -> TranscodePreset {
    TranscodePreset {
        id: id.to_string(),
        name: id.to_string(),
        container: "ts".to_string(),
        video: max_height.map(|h| VideoOutput {
            max_height: h,
            max_width: None,
            codec: None,
        }),
    }
}

fn sd() -> TranscodePreset {
    preset("sd", Some(Some(480)))
}

fn hd() -> TranscodePreset {
    preset("hd", Some(Some(1080)))
}

fn audio() -> TranscodePreset {
    preset("audio", None)
}

fn sydney() -> LocationPricing {
    let source = StaticPricingSource::new(HashMap::from([(
        "ap-southeast-2".to_string(),
        RegionPrices {
            standard_definition: Some(0.0085),
            high_definition: Some(0.017),
            audio: Some(0.00522),
        },
    )]));
    load_location_pricing(&source, "ap-southeast-2").unwrap()
}

#[test]
fn mixed_presets_on_hd_source() {
    let cost = calculate_cost(1080, 125.0, 1, 1, &[sd(), hd(), audio()], &sydney())
        .unwrap()
        .unwrap();

    // Three billed minutes per preset.
    let expected = 0.0085 * 3.0 + 0.017 * 3.0 + 0.00522 * 3.0;
    assert!((cost - expected).abs() < 1e-9, "{} != {}", cost, expected);
}

#[test]
fn hd_preset_on_sd_source_billed_as_sd() {
    let cost = calculate_cost(480, 60.0, 1, 0, &[hd()], &sydney()).unwrap().unwrap();
    assert!((cost - 0.0085).abs() < 1e-9);
}

#[test]
fn video_presets_on_audio_source_cost_nothing() {
    let cost = calculate_cost(0, 600.0, 0, 1, &[sd(), hd()], &sydney())
        .unwrap()
        .unwrap();
    assert_eq!(cost, 0.0);
}

#[test]
fn empty_preset_list_is_absent() {
    assert_eq!(calculate_cost(1080, 60.0, 1, 1, &[], &sydney()).unwrap(), None);
}

#[test]
fn missing_hd_price_fails() {
    let mut pricing = LocationPricing::new("us-east-1");
    pricing.set_standard_definition_price(0.015);
    pricing.set_audio_price(0.0045);

    let result = calculate_cost(1080, 60.0, 1, 1, &[hd()], &pricing);
    assert_matches!(result, Err(Error::InvalidPricing { .. }));

    // Without an HD source the HD preset is billed at the SD rate.
    assert!(calculate_cost(360, 60.0, 1, 1, &[hd()], &pricing).unwrap().is_some());
}

#[test]
fn calculator_reports_pricing_validity() {
    let source = StaticPricingSource::new(HashMap::from([(
        "eu-west-1".to_string(),
        RegionPrices {
            standard_definition: Some(0.017),
            high_definition: None,
            audio: Some(0.00522),
        },
    )]));
    let pricing = load_location_pricing(&source, "eu-west-1").unwrap();
    let calculator = PricingCalculator::new(pricing, vec![audio()]);

    assert_eq!(calculator.region(), "eu-west-1");
    assert!(calculator.has_presets());
    assert!(calculator.is_standard_definition_pricing_valid());
    assert!(!calculator.is_high_definition_pricing_valid());
    assert!(calculator.is_audio_pricing_valid());

    let cost = calculator
        .calculate_transcode_cost(0, 61.0, 0, 1)
        .unwrap()
        .unwrap();
    assert!((cost - 0.01044).abs() < 1e-9);
}

#[test]
fn unknown_region_is_rejected() {
    let source = StaticPricingSource::new(HashMap::new());
    assert_matches!(
        load_location_pricing(&source, "mars-north-1"),
        Err(Error::InvalidInput(_))
    );
}

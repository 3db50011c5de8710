mod support;

use ripkit::params::dic::DicParams;
use ripkit::params::redumper::RedumperParams;
use ripkit::params::ParseError;
use ripkit::{Config, MediaType, Platform, ToolParams};

fn roundtrip<P: ToolParams>(params: &P) -> String {
    let line = params.to_command_line().expect("serializable");
    let reparsed = P::from_command_line(&line).expect("reparsable");
    let line_again = reparsed.to_command_line().expect("serializable again");
    assert_eq!(line, line_again, "render must be a fixed point");
    line
}

#[test]
fn dic_generated_lines_reload_unchanged() {
    support::tracing_init();
    let config = Config::default();
    let cases = [
        (Platform::IbmPcCompatible, MediaType::Cd),
        (Platform::SonyPlayStation, MediaType::Cd),
        (Platform::SuperAudioCd, MediaType::Cd),
        (Platform::SegaDreamcast, MediaType::Gd),
        (Platform::DvdVideo, MediaType::Dvd),
        (Platform::MicrosoftXbox, MediaType::Dvd),
        (Platform::SonyPlayStation3, MediaType::BluRay),
    ];
    for (platform, media) in cases {
        let params = DicParams::from_fields(platform, media, "D", "disc.bin", Some(16), &config);
        assert!(params.is_dump_command(), "{platform:?}/{media:?}");
        let line = roundtrip(&params);
        assert!(line.contains("D \"disc.bin\" 16"), "{line}");
    }
}

#[test]
fn dic_defaults_respond_to_config() {
    let config = Config {
        paranoid_mode: true,
        reread_count: 4000,
        multi_sector_read: true,
        ..Config::default()
    };
    let params =
        DicParams::from_fields(Platform::IbmPcCompatible, MediaType::Cd, "E", "image", Some(8), &config);
    let line = params.to_command_line().unwrap();
    assert!(line.contains("/c2 4000"), "{line}");
    assert!(line.contains("/mr"), "{line}");
    assert!(line.contains("/s 2"), "{line}");
}

#[test]
fn dic_hand_edited_line_survives_unknown_tokens() {
    let line = "cd F \"my disc\" 24 /c2 20 /ns /frobnicate";
    let params = DicParams::from_command_line(line).unwrap();
    let rendered = params.to_command_line().unwrap();
    assert!(rendered.contains("/c2 20"));
    assert!(rendered.contains("/ns"));
    assert!(!rendered.contains("/frobnicate"));
}

#[test]
fn dic_garbage_inside_c2_chain_is_fatal() {
    // A reread value slot cannot hold a non-numeric token; the tool
    // would misread every later value, so the whole line is rejected
    let err = DicParams::from_command_line("cd F \"my disc\" 24 /c2 20 /frobnicate /ns").unwrap_err();
    assert!(matches!(err, ParseError::FlagValue { flag: "/c2", .. }));
}

#[test]
fn redumper_generated_lines_reload_unchanged() {
    support::tracing_init();
    let config = Config {
        redumper_retries: 50,
        ..Config::default()
    };
    let cases = [
        (Platform::IbmPcCompatible, MediaType::Cd),
        (Platform::SonyPlayStation2, MediaType::Dvd),
        (Platform::SonyPlayStation3, MediaType::BluRay),
    ];
    for (platform, media) in cases {
        let params =
            RedumperParams::from_fields(platform, media, "D", "disc", Some(24), &config);
        assert!(params.is_dump_command());
        let line = roundtrip(&params);
        assert!(line.contains("--drive=D"), "{line}");
        assert!(line.contains("--retries=50"), "{line}");
    }
}

#[test]
fn redumper_split_values_render_inline() {
    let params = RedumperParams::from_command_line("cd --drive D --speed 8").unwrap();
    let line = params.to_command_line().unwrap();
    assert!(line.contains("--drive=D"), "{line}");
    assert!(line.contains("--speed=8"), "{line}");
}

#[test]
fn invalid_combination_has_no_command() {
    let config = Config::default();
    let dic =
        DicParams::from_fields(Platform::SonyPlayStation, MediaType::Dvd, "D", "disc", None, &config);
    assert!(!dic.is_dump_command());
    assert!(dic.to_command_line().is_err());

    let redumper = RedumperParams::from_fields(
        Platform::SonyPlayStation,
        MediaType::Floppy,
        "D",
        "disc",
        None,
        &config,
    );
    assert!(!redumper.is_dump_command());
    assert!(redumper.to_command_line().is_err());
}

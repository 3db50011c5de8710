mod support;

use std::fs;
use std::path::Path;

use ripkit::assemble::{dic_submission_info, submission_info};
use ripkit::params::dic::command_file_path_and_version;
use ripkit::submission::SiteCode;
use ripkit::{DumpTool, MediaType, Platform};

fn write(base: &str, suffix: &str, contents: &str) {
    fs::write(format!("{base}{suffix}"), contents).unwrap();
}

/// Lay down the log set a clean single-session CD dump produces
fn cd_fixture(dir: &tempfile::TempDir) -> String {
    let base = dir.path().join("disc").to_string_lossy().into_owned();
    write(&base, "_20240101T120000.txt", "cd D \"disc\" 24 /c2 20\n");
    write(
        &base,
        "_drive.txt",
        "VendorId: PLEXTOR\nProductId: DVDR   PX-760A\nProductRevisionLevel: 1.07\n",
    );
    write(
        &base,
        "_disc.txt",
        concat!(
            "DiscTypeSpecific: CD-DA or CD-ROM Disc\n",
            "========== TOC ==========\n",
            "      Data Track  1, LBA        0 -   149999, Length   150000\n",
            "========== FULL TOC ==========\n",
            "	Session  1, Ctl 4, Adr 1, Point 0x01,  AMSF 00:02:00, Track  1\n",
            "========== OpCode ==========\n",
            "========== Offset ==========\n",
            "Combined Offset(Byte)   2376, (Samples)  594\n",
            "-   Drive Offset(Byte)  2328, (Samples)  582\n",
            "----------------------------------------\n",
            "+           CD Offset(Byte)    48, (Samples)    +12\n",
        ),
    );
    write(
        &base,
        "_mainInfo.txt",
        concat!(
            "========== LBA[000016, 0x00010]: Main Channel ==========\n",
            "	   +0 +1 +2 +3 +4 +5 +6 +7  +8 +9 +A +B +C +D +E +F\n",
            "0310 : 20 20 20 20 20 20 20 20  20 20 20 20 20 31 39 39\n",
            "0320 : 38 30 37 32 35 31 38 33  30 34 34 31 00 31 39 39\n",
            "0330 : 38 30 37 32 35 31 38 33  30 34 34 31 00 30 30 30\n",
            "0340 : 30 30 30 30 30 30 30 30  30 30 30 30 00 30 30 30\n",
            "0350 : 30 30 30 30 30 30 30 30  30 30 30 30 00 01 00 00\n",
            "0360 : 00 00 00 00 00 00 00 00  00 00 00 00 00 00 00 00\n",
            "0370 : 00 00 00 00 00 00 00 00  00 00 00 00 00 00 00 00\n",
        ),
    );
    write(
        &base,
        ".dat",
        concat!(
            "<rom name=\"disc (Track 1).bin\" size=\"352800000\" crc=\"aabbccdd\" md5=\"11\" sha1=\"22\"/>\n",
        ),
    );
    write(&base, ".cue", "FILE \"disc (Track 1).bin\" BINARY\n  TRACK 01 MODE1/2352\n");
    write(&base, ".img_EdcEcc.txt", "Total errors: 2\nTotal warnings: 1\n");
    base
}

#[test]
fn cd_dump_assembles_complete_record() {
    support::tracing_init();
    let dir = tempfile::tempdir().unwrap();
    let base = cd_fixture(&dir);

    let info = dic_submission_info(Platform::IbmPcCompatible, MediaType::Cd, &base, true);

    assert_eq!(
        info.dumping_info.dumping_program.as_deref(),
        Some("DiscImageCreator 20240101")
    );
    assert!(info.dumping_info.dumping_date.is_some());
    assert_eq!(info.dumping_info.manufacturer.as_deref(), Some("PLEXTOR"));
    assert_eq!(info.dumping_info.firmware.as_deref(), Some("1.07"));
    assert_eq!(
        info.dumping_info.reported_disc_type.as_deref(),
        Some("CD-DA or CD-ROM Disc")
    );

    assert_eq!(info.common_disc_info.errors_count.as_deref(), Some("3"));
    assert_eq!(info.common_disc_info.ring_write_offset.as_deref(), Some("+12"));
    assert_eq!(
        info.common_disc_info.comments_special_fields[&SiteCode::Multisession],
        ""
    );

    let pvd = info.extras.pvd.as_deref().unwrap();
    assert!(pvd.starts_with("0320"));
    assert_eq!(pvd.lines().count(), 6);

    let cue = info.tracks_and_write_offsets.cuesheet.as_deref().unwrap();
    assert!(cue.contains("TRACK 01"));
    let dat = info.tracks_and_write_offsets.clrmamepro_data.as_deref().unwrap();
    assert!(dat.contains("crc=\"aabbccdd\""));

    for key in ["cmd", "cue", "dat", "disc", "drive", "img_EdcEcc", "mainInfo"] {
        // The timestamped command echo is matched by pattern, not a
        // fixed name, so it lands under its own key
        if key == "cmd" {
            continue;
        }
        assert!(info.artifacts.contains_key(key), "missing artifact {key}");
    }

    let json = info.to_json().unwrap();
    assert!(json.contains("DiscImageCreator 20240101"));
}

#[test]
fn command_file_lookup_by_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let base = cd_fixture(&dir);
    let (path, version) = command_file_path_and_version(&base).unwrap();
    assert_eq!(version, "20240101");
    assert!(path.is_file());

    // A base with no timestamped sibling finds nothing
    let other = dir.path().join("other").to_string_lossy().into_owned();
    assert!(command_file_path_and_version(&other).is_none());
}

#[test]
fn saturn_dump_pulls_build_info_from_header() {
    support::tracing_init();
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("disc").to_string_lossy().into_owned();

    let mut main_info = String::new();
    main_info.push_str("========== LBA[000000, 0000000]: Main Channel ==========\n");
    main_info.push_str("	   +0 +1 +2 +3 +4 +5 +6 +7  +8 +9 +A +B +C +D +E +F\n");
    for row in 0..32u32 {
        let ascii = match row {
            2 => "MK-81086  V1.003",
            3 => "19950420SATURN  ",
            _ => "................",
        };
        main_info.push_str(&format!("{:<58}{}\n", format!("{:04X} :", row * 16), ascii));
    }
    write(&base, "_mainInfo.txt", &main_info);

    let info = dic_submission_info(Platform::SegaSaturn, MediaType::Cd, &base, false);
    assert_eq!(
        info.common_disc_info.comments_special_fields[&SiteCode::InternalSerialName],
        "MK-81086"
    );
    assert_eq!(info.version_and_editions.version.as_deref(), Some("1.003"));
    assert_eq!(
        info.common_disc_info.exe_date_build_date.as_deref(),
        Some("1995-04-20")
    );
    assert_eq!(info.extras.header.as_deref().map(|h| h.lines().count()), Some(16));
}

#[test]
fn playstation_dump_reads_edc_and_antimod() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("disc").to_string_lossy().into_owned();
    write(&base, "_disc.txt", "No anti-mod string\n");
    write(&base, ".img_EdcEcc.txt", "LBA 100 mode 2 form 2\nTotal errors: 0\n");

    let info = dic_submission_info(Platform::SonyPlayStation, MediaType::Cd, &base, false);
    assert_eq!(info.edc.edc.as_deref(), Some("Yes"));
    assert_eq!(info.copy_protection.anti_modchip.as_deref(), Some("No"));
}

#[test]
fn xbox_dump_collects_security_sector_data() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("disc").to_string_lossy().into_owned();
    write(
        &base,
        "_disc.txt",
        concat!(
            "Version of challenge table: 1\n",
            "	Number of security sector ranges: 1\n",
            "	Layer 0, startLBA-endLBA:   196608-   196863\n",
            "========== TotalLength ==========\n",
            "<rom name=\"SS.bin\" size=\"2048\" crc=\"abcd1234\" md5=\"00\" sha1=\"00\"/>\n",
        ),
    );
    let mut dmi = vec![0u8; 2048];
    dmi[8..16].copy_from_slice(b"MS012345");
    fs::write(format!("{base}_DMI.bin"), &dmi).unwrap();

    let info = dic_submission_info(Platform::MicrosoftXbox, MediaType::Dvd, &base, false);
    assert_eq!(
        info.common_disc_info.comments_special_fields[&SiteCode::Xmid],
        "MS012345"
    );
    assert_eq!(info.common_disc_info.serial.as_deref(), Some("MS-012"));
    assert_eq!(info.version_and_editions.version.as_deref(), Some("1.34"));
    assert_eq!(
        info.common_disc_info.comments_special_fields[&SiteCode::SsHash],
        "ABCD1234"
    );
    assert_eq!(
        info.common_disc_info.comments_special_fields[&SiteCode::SsVersion],
        "1"
    );
    assert_eq!(
        info.extras.security_sector_ranges.as_deref(),
        Some("196608-196863")
    );
}

#[test]
fn dispatch_covers_both_tools() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("disc").to_string_lossy().into_owned();
    fs::write(format!("{base}.log"), "redumper v2022.10.26 [Oct 26 2022]\n").unwrap();

    let dic = submission_info(
        DumpTool::DiscImageCreator,
        Platform::Other,
        MediaType::Cd,
        &base,
        false,
    );
    assert!(dic
        .dumping_info
        .dumping_program
        .as_deref()
        .unwrap()
        .starts_with("DiscImageCreator"));

    let redumper = submission_info(DumpTool::Redumper, Platform::Other, MediaType::Cd, &base, false);
    assert_eq!(
        redumper.dumping_info.dumping_program.as_deref(),
        Some("Redumper v2022.10.26")
    );
    assert!(Path::new(&format!("{base}.log")).is_file());
}

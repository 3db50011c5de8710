//! Builds a [`SubmissionInfo`] record out of whatever log files a
//! finished dump left behind.
//!
//! Assembly is fail-open end to end: every extractor miss leaves its
//! field unset and the record is still returned. The one deliberate
//! stand-in is the CD error count, which reports a retrieval failure
//! in-band because the submission form requires the field.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::extract::dic::{
    anti_modchip_detected, disc_type, dumping_date, dvd_protection, edc_status, error_count,
    hardware_info, layerbreak, multisession, pic_hex, pvd, sega_header, universal_hash,
    write_offset, xgd_aux_info,
};
use crate::extract::headers::{
    gdrom_build_info, pic_identifier, pic_layerbreaks, pic_units, saturn_build_info,
    segacd_build_info, xgd1_xmid, xgd23_xemid, BuildInfo, XgdMasterId,
};
use crate::extract::{file_base64, full_file, read_lines, ExtractResult, NotFound};
use crate::media::{MediaType, Platform};
use crate::params::dic::command_file_path_and_version;
use crate::params::DumpTool;
use crate::submission::{SiteCode, SubmissionInfo};

static DAT_ROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<rom name="([^"]*)" size="([^"]*)" crc="([^"]*)" md5="([^"]*)" sha1="([^"]*)""#)
        .expect("rom entry pattern")
});

/// One rom entry from a Logiqx datafile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatRom {
    pub name: String,
    pub size: Option<i64>,
    pub crc32: String,
    pub md5: String,
    pub sha1: String,
}

/// Pull the rom entries out of a Logiqx-style `.dat` file
pub fn datafile_roms(dat_path: &std::path::Path) -> ExtractResult<Vec<DatRom>> {
    let text = full_file(dat_path)?;
    let roms: Vec<DatRom> = DAT_ROM_RE
        .captures_iter(&text)
        .map(|caps| DatRom {
            name: caps[1].to_string(),
            size: caps[2].parse().ok(),
            crc32: caps[3].to_string(),
            md5: caps[4].to_string(),
            sha1: caps[5].to_string(),
        })
        .collect();
    if roms.is_empty() {
        return Err(NotFound::MarkerNotFound("rom entries"));
    }
    Ok(roms)
}

/// Render rom entries back into the per-track listing the submission
/// form expects
pub fn render_rom_lines(roms: &[DatRom]) -> String {
    roms.iter()
        .map(|rom| {
            format!(
                r#"<rom name="{}" size="{}" crc="{}" md5="{}" sha1="{}" />"#,
                rom.name,
                rom.size.unwrap_or_default(),
                rom.crc32,
                rom.md5,
                rom.sha1,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assemble a submission record for a completed dump
pub fn submission_info(
    tool: DumpTool,
    platform: Platform,
    media: MediaType,
    base_path: &str,
    include_artifacts: bool,
) -> SubmissionInfo {
    match tool {
        DumpTool::DiscImageCreator => {
            dic_submission_info(platform, media, base_path, include_artifacts)
        }
        DumpTool::Redumper => redumper_submission_info(base_path, include_artifacts),
    }
}

fn suffixed(base_path: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{base_path}{suffix}"))
}

/// The EDC/ECC log suffix has flipped between tool releases
fn edcecc_path(base_path: &str) -> Option<PathBuf> {
    [".img_EdcEcc.txt", ".img_EccEdc.txt"]
        .iter()
        .map(|s| suffixed(base_path, s))
        .find(|p| p.is_file())
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

pub fn dic_submission_info(
    platform: Platform,
    media: MediaType,
    base_path: &str,
    include_artifacts: bool,
) -> SubmissionInfo {
    let mut info = SubmissionInfo::default();

    // Program identity and run date come from the timestamped command
    // echo file
    let command_file = command_file_path_and_version(base_path);
    let version = command_file
        .as_ref()
        .map(|(_, v)| v.as_str())
        .unwrap_or("Unknown Version");
    info.dumping_info.dumping_program =
        Some(format!("{} {version}", DumpTool::DiscImageCreator.long_name()));
    if let Some((path, _)) = &command_file {
        info.dumping_info.dumping_date = dumping_date(path).ok();
    }

    if let Ok(hw) = hardware_info(&suffixed(base_path, "_drive.txt")) {
        info.dumping_info.manufacturer = hw.manufacturer;
        info.dumping_info.model = hw.model;
        info.dumping_info.firmware = hw.firmware;
    }
    info.dumping_info.reported_disc_type = disc_type(&suffixed(base_path, "_disc.txt")).ok();

    let roms = datafile_roms(&suffixed(base_path, ".dat")).ok();
    if let Some(roms) = &roms {
        info.tracks_and_write_offsets.clrmamepro_data = Some(render_rom_lines(roms));
    }

    match media {
        MediaType::Cd | MediaType::Gd => {
            cd_media_fields(&mut info, platform, base_path);
        }
        MediaType::Dvd | MediaType::HdDvd | MediaType::BluRay => {
            dvd_media_fields(&mut info, platform, media, base_path, roms.as_deref());
        }
        _ => {}
    }

    platform_fields(&mut info, platform, media, base_path);

    if include_artifacts {
        attach_artifacts(&mut info, base_path);
    }

    info
}

fn cd_media_fields(info: &mut SubmissionInfo, platform: Platform, base_path: &str) {
    let disc_log = suffixed(base_path, "_disc.txt");

    info.extras.pvd = Some(
        pvd(&suffixed(base_path, "_mainInfo.txt")).unwrap_or_else(|_| "Disc has no PVD".to_string()),
    );

    // Audio dumps abort on any C2 error, so a finished one is clean
    if platform.is_audio() {
        info.common_disc_info.errors_count = Some("0".to_string());
    } else {
        let count = edcecc_path(base_path)
            .ok_or(NotFound::MarkerNotFound("EDC/ECC log"))
            .and_then(|p| error_count(&p));
        info.common_disc_info.errors_count = Some(match count {
            Ok(n) => n.to_string(),
            Err(_) => "Error retrieving error count".to_string(),
        });
    }

    info.tracks_and_write_offsets.cuesheet =
        Some(full_file(&suffixed(base_path, ".cue")).unwrap_or_default());

    let offset = write_offset(&disc_log).unwrap_or_default();
    info.common_disc_info.ring_write_offset = Some(offset.clone());
    info.tracks_and_write_offsets.other_write_offsets = Some(offset);

    let sessions = multisession(&disc_log).ok().flatten().unwrap_or_default();
    info.common_disc_info
        .comments_special_fields
        .insert(SiteCode::Multisession, sessions);

    if platform.is_audio() {
        let hash = universal_hash(&disc_log).unwrap_or_default();
        info.common_disc_info
            .comments_special_fields
            .insert(SiteCode::UniversalHash, hash);
    }
}

fn dvd_media_fields(
    info: &mut SubmissionInfo,
    platform: Platform,
    media: MediaType,
    base_path: &str,
    roms: Option<&[DatRom]>,
) {
    // Single-track media: the lone rom entry carries the image hashes
    if let Some(rom) = roms.and_then(|r| r.first()) {
        info.size_and_checksums.size = rom.size;
        info.size_and_checksums.crc32 = Some(rom.crc32.clone());
        info.size_and_checksums.md5 = Some(rom.md5.clone());
        info.size_and_checksums.sha1 = Some(rom.sha1.clone());
    }

    match media {
        MediaType::Dvd => {
            if let Ok(Some(value)) = layerbreak(&suffixed(base_path, "_disc.txt"), platform.is_xgd())
            {
                info.size_and_checksums.layerbreak = Some(value);
            }
        }
        MediaType::BluRay => {
            if let Ok(units) = pic_units(&suffixed(base_path, "_PIC.bin")) {
                info.size_and_checksums.pic_identifier = pic_identifier(&units);
                let (lb1, lb2, lb3) = pic_layerbreaks(&units);
                let size = info.size_and_checksums.size.unwrap_or_default();
                let fits = |lb: Option<i64>| lb.filter(|v| v * 2048 < size);
                info.size_and_checksums.layerbreak = fits(lb1);
                info.size_and_checksums.layerbreak_2 = fits(lb2);
                info.size_and_checksums.layerbreak_3 = fits(lb3);
            }
        }
        _ => {}
    }

    info.extras.pvd = Some(pvd(&suffixed(base_path, "_mainInfo.txt")).unwrap_or_default());

    if media == MediaType::BluRay {
        let trim = match platform {
            Platform::SonyPlayStation3
            | Platform::SonyPlayStation4
            | Platform::SonyPlayStation5 => Some(264),
            _ => None,
        };
        info.extras.pic =
            Some(pic_hex(&suffixed(base_path, "_PIC.bin"), trim).unwrap_or_default());
    }
}

fn platform_fields(info: &mut SubmissionInfo, platform: Platform, media: MediaType, base_path: &str) {
    match platform {
        Platform::AppleMacintosh | Platform::EnhancedCd | Platform::IbmPcCompatible => {
            // A non-empty subchannel intention log means SecuROM data
            let sub_intention = suffixed(base_path, "_subIntention.txt");
            if sub_intention.is_file() {
                if let Ok(text) = full_file(&sub_intention) {
                    if !text.is_empty() {
                        info.copy_protection.securom_data = Some(text);
                    }
                }
            }
        }

        Platform::DvdVideo => {
            info.copy_protection.protection = dvd_protection(
                &suffixed(base_path, "_CSSKey.txt"),
                &suffixed(base_path, "_disc.txt"),
            )
            .ok();
        }

        Platform::MicrosoftXbox => {
            if let Ok(xmid) = xgd1_xmid(&suffixed(base_path, "_DMI.bin")) {
                info.common_disc_info
                    .comments_special_fields
                    .insert(SiteCode::Xmid, xmid.clone());
                apply_xgd_id(info, XgdMasterId::from_xmid(&xmid));
            }
            xgd_fields(info, base_path);
        }

        Platform::MicrosoftXbox360 => {
            if let Ok(xemid) = xgd23_xemid(&suffixed(base_path, "_DMI.bin")) {
                info.common_disc_info
                    .comments_special_fields
                    .insert(SiteCode::XeMid, xemid.clone());
                apply_xgd_id(info, XgdMasterId::from_xemid(&xemid));
            }
            xgd_fields(info, base_path);
        }

        Platform::SegaChihiro
        | Platform::SegaDreamcast
        | Platform::SegaNaomi
        | Platform::SegaNaomi2
        | Platform::SegaTriforce => {
            // The GD-ROM build info lives in the LD area header, which
            // only the CD-side dump captures
            if media == MediaType::Cd {
                if let Some(header) = truncated_header(base_path, HeaderHalf::First) {
                    apply_build_info(info, gdrom_build_info(&header).ok());
                    info.extras.header = Some(header);
                }
            }
        }

        Platform::SegaMegaCd => {
            if let Some(header) = truncated_header(base_path, HeaderHalf::Last) {
                apply_build_info(info, segacd_build_info(&header).ok());
                info.extras.header = Some(header);
            }
        }

        Platform::SegaSaturn => {
            if let Some(header) = truncated_header(base_path, HeaderHalf::First) {
                apply_build_info(info, saturn_build_info(&header).ok());
                info.extras.header = Some(header);
            }
        }

        Platform::SonyPlayStation => {
            if let Some(edcecc) = edcecc_path(base_path) {
                if let Ok(edc) = edc_status(&edcecc) {
                    info.edc.edc = Some(yes_no(edc));
                }
            }
            if let Ok(detected) = anti_modchip_detected(&suffixed(base_path, "_disc.txt")) {
                info.copy_protection.anti_modchip = Some(yes_no(detected));
            }
        }

        _ => {}
    }
}

enum HeaderHalf {
    First,
    Last,
}

/// Sega consoles only use half of the 32-row sector 0 dump
fn truncated_header(base_path: &str, half: HeaderHalf) -> Option<String> {
    let header = sega_header(&suffixed(base_path, "_mainInfo.txt")).ok()?;
    let lines: Vec<&str> = header.lines().collect();
    let kept = match half {
        HeaderHalf::First => &lines[..lines.len().min(16)],
        HeaderHalf::Last => &lines[lines.len().min(16)..],
    };
    Some(kept.join("\n"))
}

fn apply_xgd_id(info: &mut SubmissionInfo, id: Option<XgdMasterId>) {
    if let Some(id) = id {
        info.common_disc_info.serial = Some(id.serial());
        if let Some(version) = &id.version {
            info.version_and_editions.version = Some(version.clone());
        }
        info.common_disc_info.region = id.region_name().map(str::to_string);
    }
}

fn apply_build_info(info: &mut SubmissionInfo, build: Option<BuildInfo>) {
    if let Some(build) = build {
        info.common_disc_info
            .comments_special_fields
            .insert(SiteCode::InternalSerialName, build.serial);
        if let Some(version) = build.version {
            info.version_and_editions.version = Some(version);
        }
        info.common_disc_info.exe_date_build_date = Some(build.date);
    }
}

/// Security sector data shared by both Xbox generations. When the tool
/// produced the supplementary datafile, the DMI/PFI/SS hashes come from
/// it instead of the inline rom lines.
fn xgd_fields(info: &mut SubmissionInfo, base_path: &str) {
    let mut aux = match xgd_aux_info(&suffixed(base_path, "_disc.txt")) {
        Ok(aux) => aux,
        Err(err) => {
            debug!(%err, "no security sector data");
            return;
        }
    };

    let suppl = suffixed(base_path, "_suppl.dat");
    if suppl.is_file() {
        if let Ok(roms) = datafile_roms(&suppl) {
            for rom in roms {
                let crc = rom.crc32.to_uppercase();
                if rom.name.contains("SS.bin") {
                    aux.ss_hash = Some(crc);
                } else if rom.name.contains("PFI.bin") {
                    aux.pfi_hash = Some(crc);
                } else if rom.name.contains("DMI.bin") {
                    aux.dmi_hash = Some(crc);
                }
            }
        }
    }

    let comments = &mut info.common_disc_info.comments_special_fields;
    if let Some(hash) = aux.dmi_hash {
        comments.insert(SiteCode::DmiHash, hash);
    }
    if let Some(hash) = aux.pfi_hash {
        comments.insert(SiteCode::PfiHash, hash);
    }
    if let Some(hash) = aux.ss_hash {
        comments.insert(SiteCode::SsHash, hash);
    }
    if let Some(version) = aux.ss_version {
        comments.insert(SiteCode::SsVersion, version);
    }
    info.extras.security_sector_ranges = aux.security_sector_ranges;
}

fn attach(info: &mut SubmissionInfo, base_path: &str, key: &str, suffix: &str) {
    if let Ok(blob) = file_base64(&suffixed(base_path, suffix)) {
        info.artifacts.insert(key.to_string(), blob);
    }
}

/// Base64 copies of every log file worth archiving with the submission
fn attach_artifacts(info: &mut SubmissionInfo, base_path: &str) {
    attach(info, base_path, "c2Error", "_c2Error.txt");
    attach(info, base_path, "ccd", ".ccd");
    attach(info, base_path, "cmd", "_cmd.txt");
    attach(info, base_path, "csskey", "_CSSKey.txt");
    attach(info, base_path, "cue", ".cue");
    attach(info, base_path, "dat", ".dat");
    attach(info, base_path, "disc", "_disc.txt");
    attach(info, base_path, "drive", "_drive.txt");
    attach(info, base_path, "img_cue", "_img.cue");
    if let Some(edcecc) = edcecc_path(base_path) {
        if let Ok(blob) = file_base64(&edcecc) {
            info.artifacts.insert("img_EdcEcc".to_string(), blob);
        }
    }
    attach(info, base_path, "mainError", "_mainError.txt");
    attach(info, base_path, "mainInfo", "_mainInfo.txt");
    attach(info, base_path, "sub", ".sub");
    attach(info, base_path, "subError", "_subError.txt");
    attach(info, base_path, "subInfo", "_subInfo.txt");
    attach(info, base_path, "subIntention", "_subIntention.txt");
    attach(info, base_path, "volDesc", "_volDesc.txt");
}

/// Redumper leaves its state in a single `.log`; aside from the program
/// identity there is nothing to scrape that the structured fields need.
pub fn redumper_submission_info(base_path: &str, include_artifacts: bool) -> SubmissionInfo {
    let mut info = SubmissionInfo::default();
    info.dumping_info.dumping_program = Some(DumpTool::Redumper.long_name().to_string());

    let log = suffixed(base_path, ".log");
    if let Ok(lines) = read_lines(&log) {
        // First line carries the program banner, e.g. "redumper v2022.10.26"
        if let Some(version) = lines
            .first()
            .and_then(|l| l.strip_prefix("redumper "))
            .map(|v| v.split_whitespace().next().unwrap_or(v))
        {
            info.dumping_info.dumping_program =
                Some(format!("{} {version}", DumpTool::Redumper.long_name()));
        }
        info.dumping_info.dumping_date = dumping_date(&log).ok();
    }

    if include_artifacts {
        if let Ok(blob) = file_base64(&log) {
            info.artifacts.insert("log".to_string(), blob);
        }
    }

    info
}

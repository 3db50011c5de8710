//! Extractors for the text logs DiscImageCreator writes next to the
//! image (`_disc.txt`, `_drive.txt`, `_mainInfo.txt` and friends).
//!
//! The log formats are not versioned; every function here scans for the
//! banner or prefix the tool has emitted historically and bails with
//! [`NotFound`] when the shape is off.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{read_bytes, read_lines, ExtractResult, NotFound};

static TRACK_LENGTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*.*?Track\s*([0-9]{1,2}), LBA\s*[0-9]{1,8} - \s*[0-9]{1,8}, Length\s*([0-9]{1,8})$")
        .expect("track length pattern")
});

static TRACK_SESSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Session\s*([0-9]{1,2}),.*?,\s*Track\s*([0-9]{1,2}).*?$")
        .expect("track session pattern")
});

static NO_TITLE_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^LBA:\s*[0-9]+, Filename: (.*?), No TitleKey$").expect("title key pattern")
});

static DECRYPTED_TITLE_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^LBA:\s*[0-9]+, Filename: (.*?), EncryptedTitleKey: .*?, DecryptedTitleKey: (.*?)$")
        .expect("title key pattern")
});

static SECURITY_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Layer [01].*, startLBA-endLBA:\s*(\d+)-\s*(\d+)").expect("security range pattern")
});

static ROM_ATTRS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"size="([^"]*)" crc="([^"]*)" md5="([^"]*)" sha1="([^"]*)""#)
        .expect("rom attribute pattern")
});

/// Find the next line at or after `from` satisfying `pred`
fn seek(
    lines: &[String],
    from: usize,
    marker: &'static str,
    pred: impl Fn(&str) -> bool,
) -> ExtractResult<usize> {
    lines[from.min(lines.len())..]
        .iter()
        .position(|l| pred(l))
        .map(|p| p + from)
        .ok_or(NotFound::MarkerNotFound(marker))
}

/// Modification time of the timestamped command file, rendered the way
/// the submission form expects it
pub fn dumping_date(command_file: &Path) -> ExtractResult<String> {
    let meta = std::fs::metadata(command_file)
        .map_err(|_| NotFound::MissingFile(command_file.to_path_buf()))?;
    let modified = meta
        .modified()
        .map_err(|_| NotFound::Malformed("file modification time"))?;
    let stamp: DateTime<Local> = modified.into();
    Ok(stamp.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Drive vendor/model/firmware triple from `_drive.txt`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
}

pub fn hardware_info(drive_log: &Path) -> ExtractResult<HardwareInfo> {
    let lines = read_lines(drive_log)?;
    let mut hw = HardwareInfo::default();
    for line in &lines {
        let line = line.trim();
        // Only the first occurrence of each field counts
        if hw.manufacturer.is_none() {
            if let Some(rest) = line.strip_prefix("VendorId: ") {
                hw.manufacturer = Some(rest.to_string());
                continue;
            }
        }
        if hw.model.is_none() {
            if let Some(rest) = line.strip_prefix("ProductId: ") {
                hw.model = Some(rest.to_string());
                continue;
            }
        }
        if hw.firmware.is_none() {
            if let Some(rest) = line.strip_prefix("ProductRevisionLevel: ") {
                hw.firmware = Some(rest.to_string());
            }
        }
    }
    if hw == HardwareInfo::default() {
        return Err(NotFound::MarkerNotFound("drive identification"));
    }
    Ok(hw)
}

/// Reported disc/book types from `_disc.txt`, deduplicated and sorted
pub fn disc_type(disc_log: &Path) -> ExtractResult<String> {
    let lines = read_lines(disc_log)?;
    let mut found: BTreeSet<String> = BTreeSet::new();
    for line in &lines {
        let line = line.trim();
        for prefix in [
            "DiscType: ",
            "DiscTypeIdentifier: ",
            "DiscTypeSpecific: ",
            "BookType: ",
        ] {
            if let Some(rest) = line.strip_prefix(prefix) {
                found.insert(rest.to_string());
            }
        }
    }
    if found.is_empty() {
        return Err(NotFound::MarkerNotFound("disc type"));
    }
    Ok(found.into_iter().collect::<Vec<_>>().join(", "))
}

/// Total C2 error count from the EDC/ECC check log. `[NO ERROR]` short
/// circuits to zero; otherwise the error and warning totals are summed.
pub fn error_count(edcecc_log: &Path) -> ExtractResult<i64> {
    let lines = read_lines(edcecc_log)?;
    let mut total: Option<i64> = None;
    for line in &lines {
        let line = line.trim();
        if line.starts_with("[NO ERROR]") {
            return Ok(0);
        }
        if let Some(rest) = line.strip_prefix("Total errors: ") {
            *total.get_or_insert(0) += rest.trim().parse::<i64>().unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("Total warnings: ") {
            *total.get_or_insert(0) += rest.trim().parse::<i64>().unwrap_or(0);
        }
    }
    total.ok_or(NotFound::MarkerNotFound("error totals"))
}

/// Combined write offset from the `========== Offset` section of
/// `_disc.txt`
pub fn write_offset(disc_log: &Path) -> ExtractResult<String> {
    let lines = read_lines(disc_log)?;
    let banner = seek(&lines, 0, "offset section", |l| {
        l.trim().starts_with("========== Offset")
    })?;
    // Banner, combined, drive, separator, then the per-disc row
    let row = lines
        .get(banner + 4)
        .ok_or(NotFound::Malformed("offset section"))?;
    row.split_whitespace()
        .last()
        .map(str::to_string)
        .ok_or(NotFound::Malformed("offset section"))
}

/// Session layout summary for multisession discs. A disc whose tracks
/// all sit in session 1 yields `Ok(None)`.
pub fn multisession(disc_log: &Path) -> ExtractResult<Option<String>> {
    let lines = read_lines(disc_log)?;

    // Track lengths from the TOC section
    let toc = seek(&lines, 0, "TOC section", |l| l.starts_with("========== TOC"))?;
    let mut track_lengths: BTreeMap<String, i64> = BTreeMap::new();
    let mut i = toc + 1;
    while i < lines.len() && lines[i].contains("Track") {
        if let Some(caps) = TRACK_LENGTH_RE.captures(&lines[i]) {
            track_lengths.insert(caps[1].to_string(), caps[2].parse().unwrap_or(0));
        }
        i += 1;
    }

    // Track-to-session assignments from the FULL TOC section
    let full_toc = seek(&lines, i, "FULL TOC section", |l| {
        l.starts_with("========== FULL TOC")
    })?;
    let mut track_sessions: BTreeMap<String, String> = BTreeMap::new();
    let mut j = full_toc + 1;
    loop {
        let line = lines.get(j).ok_or(NotFound::Malformed("FULL TOC section"))?;
        if line.starts_with("========== OpCode") {
            break;
        }
        if let Some(caps) = TRACK_SESSION_RE.captures(line) {
            track_sessions.insert(caps[2].to_string(), caps[1].to_string());
        }
        j += 1;
    }
    if track_sessions.values().all(|s| s == "1") {
        return Ok(None);
    }

    // Inter-session gap: lead-out of session 1, lead-in of session 2,
    // pregap of the first track of session 2
    let leadout_idx = seek(&lines, j, "lead-out length", |l| {
        l.trim().starts_with("Lead-out length")
    })?;
    let first_leadout: i64 = lines[leadout_idx]
        .trim()
        .strip_prefix("Lead-out length of 1st session: ")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let mut k = leadout_idx + 1;
    let mut second_leadin: i64 = 0;
    while let Some(line) = lines.get(k).map(|l| l.trim()) {
        if let Some(rest) = line.strip_prefix("Lead-in length of 2nd session: ") {
            second_leadin = rest.parse().unwrap_or(0);
            k += 1;
        } else {
            break;
        }
    }
    let pregap: i64 = lines
        .get(k)
        .and_then(|l| {
            l.trim()
                .strip_prefix("Pregap length of 1st track of 2nd session: ")
        })
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let mut gap = first_leadout + second_leadin + pregap;
    let mut first_session_length = 0i64;
    let mut total_length = 0i64;
    for (track, length) in &track_lengths {
        if track_sessions.get(track).map(String::as_str) == Some("1") {
            first_session_length += length;
        }
        total_length += length;
    }
    // Some drives report the pregap inside the track length already
    if first_session_length - gap < 0 {
        gap = first_leadout + second_leadin;
    }

    let first_session_end = first_session_length - gap;
    Ok(Some(format!(
        "Session 1: 0-{}\nSession 2: {}-{}",
        first_session_end - 1,
        first_session_end,
        total_length - 1,
    )))
}

/// Layerbreak sector from `_disc.txt`. Single-layer discs yield
/// `Ok(None)`; Xbox discs report the value on a different line.
pub fn layerbreak(disc_log: &Path, xgd: bool) -> ExtractResult<Option<i64>> {
    let lines = read_lines(disc_log)?;
    for line in &lines {
        if line.contains("NumberOfLayers: Single Layer") {
            return Ok(None);
        }
        let trimmed = line.trim();
        let field = if xgd { "LayerBreak" } else { "LayerZeroSector" };
        if trimmed.starts_with(field) {
            let value = trimmed
                .split_whitespace()
                .nth(1)
                .and_then(|t| t.parse().ok())
                .ok_or(NotFound::Malformed("layerbreak value"))?;
            return Ok(Some(value));
        }
    }
    Err(NotFound::MarkerNotFound("layerbreak"))
}

/// Whether `_mainInfo.txt` uses the newer layout that front-loads the
/// binary TOC dumps
fn is_new_main_info_layout(first: &str) -> bool {
    first.starts_with("========== OpCode")
        || first.starts_with("========== TOC (Binary)")
        || first.starts_with("========== FULL TOC (Binary)")
}

/// Primary Volume Descriptor hexdump rows (offsets 0x0320-0x0370) from
/// `_mainInfo.txt`
pub fn pvd(main_info_log: &Path) -> ExtractResult<String> {
    let lines = read_lines(main_info_log)?;
    let first = lines
        .first()
        .ok_or(NotFound::MarkerNotFound("volume descriptor"))?;
    let mut cursor = 0;
    if is_new_main_info_layout(first) {
        cursor = seek(&lines, 1, "volume descriptor section", |l| {
            l.starts_with("========== Check Volume Descriptor ==========")
        })? + 1;
    }

    let mut lba = seek(&lines, cursor, "sector banner", |l| {
        l.starts_with("========== LBA")
    })?;
    // Raw sector 0 and the mode-switch resync sector precede the PVD on
    // some drives
    if lines[lba].starts_with("========== LBA[000000, 0000000]: Main Channel ==========") {
        lba = seek(&lines, lba + 1, "sector banner", |l| {
            l.starts_with("========== LBA")
        })?;
    }
    if lines[lba].starts_with("========== LBA[000004, 0x00004]: Main Channel ==========") {
        lba = seek(&lines, lba + 1, "sector banner", |l| {
            l.starts_with("========== LBA")
        })?;
    }

    let row = seek(&lines, lba + 1, "volume descriptor rows", |l| {
        l.starts_with("0310")
    })?;
    if row + 7 > lines.len() {
        return Err(NotFound::Malformed("volume descriptor rows"));
    }
    let mut out = String::new();
    for line in &lines[row + 1..row + 7] {
        out.push_str(line);
        out.push('\n');
    }
    Ok(out)
}

/// Raw 32-row header hexdump of sector 0, used by the Sega consoles
pub fn sega_header(main_info_log: &Path) -> ExtractResult<String> {
    let lines = read_lines(main_info_log)?;
    let first = lines.first().ok_or(NotFound::MarkerNotFound("header"))?;
    let mut cursor = 0;
    if is_new_main_info_layout(first) {
        cursor = seek(&lines, 1, "MCN/ISRC section", |l| {
            l.contains("Check MCN and/or ISRC")
        })? + 1;
    }

    let lba = seek(&lines, cursor, "sector banner", |l| {
        l.starts_with("========== LBA")
    })?;
    let sector_zero = seek(&lines, lba, "sector zero dump", |l| {
        l.starts_with("========== LBA[000000, 0000000]: Main Channel ==========")
    })?;
    let ruler = seek(&lines, sector_zero, "hexdump ruler", |l| {
        l.trim()
            .starts_with("+0 +1 +2 +3 +4 +5 +6 +7  +8 +9 +A +B +C +D +E +F")
    })?;
    if ruler + 33 > lines.len() {
        return Err(NotFound::Malformed("header rows"));
    }
    let mut out = String::new();
    for line in &lines[ruler + 1..ruler + 33] {
        out.push_str(line);
        out.push('\n');
    }
    Ok(out)
}

/// Whole-image SHA-1 from the universal hash section of `_disc.txt`
pub fn universal_hash(disc_log: &Path) -> ExtractResult<String> {
    let lines = read_lines(disc_log)?;
    let banner = seek(&lines, 0, "universal hash section", |l| {
        l.trim()
            .starts_with("========== Hash(Universal Whole image) ==========")
    })?;
    let row = seek(&lines, banner + 1, "universal hash rom line", |l| {
        l.trim_start().starts_with("<rom name")
    })?;
    rom_line_values(&lines[row])
        .and_then(|v| v.sha1)
        .ok_or(NotFound::Malformed("universal hash rom line"))
}

/// Hash attributes pulled off a Logiqx `<rom .../>` line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomValues {
    pub size: Option<i64>,
    pub crc32: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
}

pub fn rom_line_values(line: &str) -> Option<RomValues> {
    let caps = ROM_ATTRS_RE.captures(line)?;
    Some(RomValues {
        size: caps[1].parse().ok(),
        crc32: Some(caps[2].to_string()),
        md5: Some(caps[3].to_string()),
        sha1: Some(caps[4].to_string()),
    })
}

/// PlayStation anti-modchip string detection from `_disc.txt`. A log
/// without either marker reads as not detected.
pub fn anti_modchip_detected(disc_log: &Path) -> ExtractResult<bool> {
    let lines = read_lines(disc_log)?;
    for line in &lines {
        if line.contains("Detected anti-mod string") {
            return Ok(true);
        }
        if line.contains("No anti-mod string") {
            return Ok(false);
        }
    }
    Ok(false)
}

/// PlayStation EDC presence from the EDC/ECC check log. Counts mode 2
/// form 2 sectors against mode 2 no-EDC sectors; a mix of both (or
/// neither) is indeterminate.
pub fn edc_status(edcecc_log: &Path) -> ExtractResult<bool> {
    let lines = read_lines(edcecc_log)?;
    let mut form_two = 0u64;
    let mut no_edc = 0u64;
    for line in &lines {
        if line.contains("mode 2 form 2") {
            form_two += 1;
        } else if line.contains("mode 2 no edc") {
            no_edc += 1;
        }
    }
    match (form_two, no_edc) {
        (0, 0) => Err(NotFound::MarkerNotFound("mode 2 sector counters")),
        (_, 0) => Ok(true),
        (0, _) => Ok(false),
        _ => Err(NotFound::Malformed("mixed mode 2 sector counters")),
    }
}

/// CSS protection report for DVD-Video: region and protection type from
/// `_disc.txt`, disc and title keys from `_CSSKey.txt` when present
pub fn dvd_protection(css_key_log: &Path, disc_log: &Path) -> ExtractResult<String> {
    let lines = read_lines(disc_log)?;
    let mut region: Option<String> = None;
    let mut protection_type: Option<String> = None;
    if let Ok(start) = seek(&lines, 0, "copyright section", |l| {
        l.starts_with("========== CopyrightInformation ==========")
    }) {
        for line in &lines[start + 1..] {
            let line = line.trim();
            if line.starts_with("========== ManufacturingInformation ==========") {
                break;
            }
            if let Some(rest) = line.strip_prefix("CopyrightProtectionType: ") {
                protection_type = Some(rest.to_string());
            } else if let Some(rest) = line.strip_prefix("RegionManagementInformation: ") {
                region = Some(rest.to_string());
            }
        }
    }

    let mut disc_key: Option<String> = None;
    let mut vob_keys = String::new();
    if let Ok(css_lines) = read_lines(css_key_log) {
        for line in &css_lines {
            let line = line.trim();
            if line.contains("DecryptedDiscKey") {
                if let Some(rest) = line.strip_prefix("DecryptedDiscKey[020]: ") {
                    disc_key = Some(rest.to_string());
                }
            } else if line.starts_with("LBA:") {
                if let Some(caps) = NO_TITLE_KEY_RE.captures(line) {
                    let file = caps[1].trim_end_matches(";1").to_string();
                    vob_keys.push_str(&format!("{file} Title Key: No Title Key\n"));
                } else if let Some(caps) = DECRYPTED_TITLE_KEY_RE.captures(line) {
                    let file = caps[1].trim_end_matches(";1").to_string();
                    let key = &caps[2];
                    vob_keys.push_str(&format!("{file} Title Key: {key}\n"));
                }
            }
        }
    } else {
        debug!(path = %css_key_log.display(), "no CSS key log");
    }

    let mut out = String::new();
    if let Some(region) = region {
        out.push_str(&format!("Region: {region}\n"));
    }
    if let Some(protection_type) = protection_type {
        out.push_str(&format!("Copyright Protection System Type: {protection_type}\n"));
    }
    out.push_str(&vob_keys);
    if let Some(disc_key) = disc_key {
        out.push_str(&format!("Decrypted Disc Key: {disc_key}\n"));
    }
    Ok(out)
}

/// Security sector data scraped from `_disc.txt` for Xbox-family discs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XgdAuxInfo {
    pub ss_version: Option<String>,
    pub security_sector_ranges: Option<String>,
    pub dmi_hash: Option<String>,
    pub pfi_hash: Option<String>,
    pub ss_hash: Option<String>,
}

pub fn xgd_aux_info(disc_log: &Path) -> ExtractResult<XgdAuxInfo> {
    let lines = read_lines(disc_log)?;
    let mut aux = XgdAuxInfo::default();
    let mut found_security_sectors = false;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim().to_string();

        if line.starts_with("Version of challenge table") {
            aux.ss_version = line.split_whitespace().nth(4).map(str::to_string);
        }

        // The range table repeats per challenge response; only the
        // first table is kept
        if line.starts_with("Number of security sector ranges:") && !found_security_sectors {
            found_security_sectors = true;
            let mut ranges = String::new();
            i += 1;
            while i < lines.len() {
                let range_line = lines[i].trim();
                if range_line.starts_with("========== TotalLength ==========")
                    || range_line.starts_with("========== Unlock 2 state(wxripper) ==========")
                {
                    break;
                }
                if range_line.starts_with("Layer ") {
                    if let Some(caps) = SECURITY_RANGE_RE.captures(range_line) {
                        ranges.push_str(&format!("{}-{}\n", &caps[1], &caps[2]));
                    }
                }
                i += 1;
            }
            aux.security_sector_ranges = Some(ranges.trim_end().to_string());
            continue;
        }

        if line.starts_with("<rom") {
            if let Some(values) = rom_line_values(&line) {
                let crc = values.crc32.map(|c| c.to_uppercase());
                if line.contains("SS.bin") {
                    aux.ss_hash = crc;
                } else if line.contains("PFI.bin") {
                    aux.pfi_hash = crc;
                } else if line.contains("DMI.bin") {
                    aux.dmi_hash = crc;
                }
            }
        }

        i += 1;
    }
    if aux == XgdAuxInfo::default() {
        return Err(NotFound::MarkerNotFound("security sector data"));
    }
    Ok(aux)
}

/// Uppercase hex render of `_PIC.bin`, wrapped at 32 characters per
/// row. `trim_length` truncates the hex string before wrapping; the
/// PlayStation 3/4/5 forms only take the first 264 characters.
pub fn pic_hex(pic_path: &Path, trim_length: Option<usize>) -> ExtractResult<String> {
    let bytes = read_bytes(pic_path)?;
    let mut hex_string = hex::encode_upper(bytes);
    if let Some(trim) = trim_length {
        hex_string.truncate(trim);
    }
    let mut out = String::with_capacity(hex_string.len() + hex_string.len() / 32 + 1);
    let mut chars = hex_string.chars().peekable();
    let mut column = 0;
    while let Some(c) = chars.next() {
        out.push(c);
        column += 1;
        if column == 32 && chars.peek().is_some() {
            out.push('\n');
            column = 0;
        }
    }
    if column == 32 {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_log(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn error_count_sums_totals() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc.img_EdcEcc.txt",
            "Total errors: 12\nTotal warnings: 3\n",
        );
        assert_eq!(error_count(&log), Ok(15));
    }

    #[test]
    fn error_count_no_error_marker() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(&dir, "disc.img_EdcEcc.txt", "[NO ERROR]\nTotal errors: 7\n");
        assert_eq!(error_count(&log), Ok(0));
    }

    #[test]
    fn error_count_without_totals() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(&dir, "disc.img_EdcEcc.txt", "nothing of note\n");
        assert_eq!(error_count(&log), Err(NotFound::MarkerNotFound("error totals")));
    }

    #[test]
    fn hardware_info_takes_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc_drive.txt",
            "VendorId: PLEXTOR\nProductId: DVDR PX-760A\nProductRevisionLevel: 1.07\nVendorId: OTHER\n",
        );
        let hw = hardware_info(&log).unwrap();
        assert_eq!(hw.manufacturer.as_deref(), Some("PLEXTOR"));
        assert_eq!(hw.model.as_deref(), Some("DVDR PX-760A"));
        assert_eq!(hw.firmware.as_deref(), Some("1.07"));
    }

    #[test]
    fn disc_type_collects_sorted_unique() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc_disc.txt",
            "BookType: DVD-ROM\nDiscTypeSpecific: CD-DA or CD-ROM Disc\nBookType: DVD-ROM\n",
        );
        assert_eq!(
            disc_type(&log).unwrap(),
            "CD-DA or CD-ROM Disc, DVD-ROM"
        );
    }

    #[test]
    fn write_offset_reads_last_token() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc_disc.txt",
            concat!(
                "========== Offset ==========\n",
                "Combined Offset(Byte)   2376, (Samples)  594\n",
                "-   Drive Offset(Byte)  2328, (Samples)  582\n",
                "----------------------------------------\n",
                "+           CD Offset(Byte)    48, (Samples)    +12\n",
            ),
        );
        assert_eq!(write_offset(&log).unwrap(), "+12");
    }

    #[test]
    fn multisession_single_session_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc_disc.txt",
            concat!(
                "========== TOC ==========\n",
                "     Audio Track  1, LBA        0 -      819, Length      820\n",
                "========== FULL TOC ==========\n",
                "	Session  1, Ctl 0, Adr 1, Point 0xa0,  AMSF 00:00:00, Track  1\n",
                "========== OpCode ==========\n",
            ),
        );
        assert_eq!(multisession(&log).unwrap(), None);
    }

    #[test]
    fn multisession_two_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc_disc.txt",
            concat!(
                "========== TOC ==========\n",
                "     Audio Track  1, LBA        0 -      999, Length     1000\n",
                "      Data Track  2, LBA     1000 -     2999, Length     2000\n",
                "========== FULL TOC ==========\n",
                "	Session  1, Ctl 0, Adr 1, Point 0x01,  AMSF 00:02:00, Track  1\n",
                "	Session  2, Ctl 4, Adr 1, Point 0x02,  AMSF 00:02:00, Track  2\n",
                "========== OpCode ==========\n",
                "	Lead-out length of 1st session: 100\n",
                "	Lead-in length of 2nd session: 50\n",
                "	Pregap length of 1st track of 2nd session: 30\n",
            ),
        );
        assert_eq!(
            multisession(&log).unwrap().unwrap(),
            "Session 1: 0-819\nSession 2: 820-2999"
        );
    }

    #[test]
    fn layerbreak_single_layer() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc_disc.txt",
            "NumberOfLayers: Single Layer\nLayerZeroSector: 0 (0x0)\n",
        );
        assert_eq!(layerbreak(&log, false).unwrap(), None);
    }

    #[test]
    fn layerbreak_dual_layer() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc_disc.txt",
            "NumberOfLayers: Double Layer\n	LayerZeroSector: 2084960 (0x1FD060)\n",
        );
        assert_eq!(layerbreak(&log, false).unwrap(), Some(2084960));
    }

    #[test]
    fn layerbreak_xgd_field() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc_disc.txt",
            "	LayerBreak 1913776 (L0 Video: 198944 + L0 Middle: 62342 + L0 Game: 1652490)\n",
        );
        assert_eq!(layerbreak(&log, true).unwrap(), Some(1913776));
    }

    #[test]
    fn pvd_joins_six_rows() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc_mainInfo.txt",
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
        let pvd = pvd(&log).unwrap();
        assert!(pvd.starts_with("0320"));
        assert_eq!(pvd.lines().count(), 6);
        assert!(pvd.ends_with('\n'));
    }

    #[test]
    fn anti_modchip_markers() {
        let dir = tempfile::tempdir().unwrap();
        let detected = write_log(&dir, "a.txt", "Detected anti-mod string\n");
        let clean = write_log(&dir, "b.txt", "No anti-mod string\n");
        let silent = write_log(&dir, "c.txt", "unrelated\n");
        assert_eq!(anti_modchip_detected(&detected), Ok(true));
        assert_eq!(anti_modchip_detected(&clean), Ok(false));
        assert_eq!(anti_modchip_detected(&silent), Ok(false));
    }

    #[test]
    fn edc_status_counters() {
        let dir = tempfile::tempdir().unwrap();
        let with_edc = write_log(&dir, "a.txt", "LBA 100 mode 2 form 2\n");
        let without = write_log(&dir, "b.txt", "LBA 100 mode 2 no edc\n");
        let mixed = write_log(&dir, "c.txt", "mode 2 form 2\nmode 2 no edc\n");
        assert_eq!(edc_status(&with_edc), Ok(true));
        assert_eq!(edc_status(&without), Ok(false));
        assert!(edc_status(&mixed).is_err());
    }

    #[test]
    fn dvd_protection_formats_sections() {
        let dir = tempfile::tempdir().unwrap();
        let disc = write_log(
            &dir,
            "disc_disc.txt",
            concat!(
                "========== CopyrightInformation ==========\n",
                "	CopyrightProtectionType: CSS/CPPM\n",
                "	RegionManagementInformation: 1 2 3 4 5 6 7 8\n",
                "========== ManufacturingInformation ==========\n",
            ),
        );
        let css = write_log(
            &dir,
            "disc_CSSKey.txt",
            concat!(
                "DecryptedDiscKey[020]: 0011223344\n",
                "LBA:     300, Filename: VIDEO_TS.VOB;1, No TitleKey\n",
                "LBA:     400, Filename: VTS_01_1.VOB;1, EncryptedTitleKey: a1, DecryptedTitleKey: b2\n",
            ),
        );
        let report = dvd_protection(&css, &disc).unwrap();
        assert_eq!(
            report,
            concat!(
                "Region: 1 2 3 4 5 6 7 8\n",
                "Copyright Protection System Type: CSS/CPPM\n",
                "VIDEO_TS.VOB Title Key: No Title Key\n",
                "VTS_01_1.VOB Title Key: b2\n",
                "Decrypted Disc Key: 0011223344\n",
            )
        );
    }

    #[test]
    fn xgd_aux_scrapes_ranges_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(
            &dir,
            "disc_disc.txt",
            concat!(
                "Version of challenge table: 1\n",
                "	Number of security sector ranges: 2\n",
                "	Layer 0, startLBA-endLBA:   196608-   196863\n",
                "	Layer 1, startLBA-endLBA:  3530496- 3530751\n",
                "========== TotalLength ==========\n",
                "	Number of security sector ranges: 9\n",
                "<rom name=\"SS.bin\" size=\"2048\" crc=\"abcd1234\" md5=\"00\" sha1=\"00\"/>\n",
            ),
        );
        let aux = xgd_aux_info(&log).unwrap();
        assert_eq!(aux.ss_version.as_deref(), Some("1"));
        assert_eq!(
            aux.security_sector_ranges.as_deref(),
            Some("196608-196863\n3530496-3530751")
        );
        assert_eq!(aux.ss_hash.as_deref(), Some("ABCD1234"));
        assert_eq!(aux.dmi_hash, None);
    }

    #[test]
    fn pic_hex_wraps_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disc_PIC.bin");
        std::fs::write(&path, vec![0xABu8; 24]).unwrap();
        let full = pic_hex(&path, None).unwrap();
        assert_eq!(full.lines().count(), 2);
        assert_eq!(full.lines().next().unwrap().len(), 32);
        let trimmed = pic_hex(&path, Some(8)).unwrap();
        assert_eq!(trimmed, "ABABABAB");
    }

    #[test]
    fn rom_line_attribute_parse() {
        let line = r#"<rom name="disc.iso" size="734003200" crc="deadbeef" md5="a" sha1="b"/>"#;
        let values = rom_line_values(line).unwrap();
        assert_eq!(values.size, Some(734003200));
        assert_eq!(values.crc32.as_deref(), Some("deadbeef"));
        assert_eq!(values.sha1.as_deref(), Some("b"));
    }
}

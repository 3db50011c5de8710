//! Decoders for binary sidecar files and the fixed-column hexdump
//! headers captured in `_mainInfo.txt`.
//!
//! The Sega build-info readers take the 32-row header hexdump produced
//! by [`super::dic::sega_header`] and pick fields out of the ASCII
//! gutter, which starts at column 58 of each row.

use std::path::Path;

use super::{read_bytes, ExtractResult, NotFound};

const ASCII_GUTTER: usize = 58;

/// Serial, version and build date pulled from a console header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub serial: String,
    /// Not every console encodes a version in the header
    pub version: Option<String>,
    pub date: String,
}

fn gutter(header_lines: &[&str], row: usize) -> ExtractResult<String> {
    header_lines
        .get(row)
        .and_then(|line| line.get(ASCII_GUTTER..))
        .map(str::to_string)
        .ok_or(NotFound::Malformed("header row"))
}

fn slice(text: &str, range: std::ops::Range<usize>) -> ExtractResult<&str> {
    text.get(range).ok_or(NotFound::Malformed("header field"))
}

/// Saturn system area: serial and version share row 2, the build date
/// sits on row 3 as `YYYYMMDD`
pub fn saturn_build_info(header: &str) -> ExtractResult<BuildInfo> {
    let lines: Vec<&str> = header.split('\n').collect();
    let serial_version = gutter(&lines, 2)?;
    let date_line = gutter(&lines, 3)?;
    let serial = slice(&serial_version, 0..10)?.trim().to_string();
    let version = slice(&serial_version, 10..16)?
        .trim_start_matches(['V', 'v'])
        .to_string();
    let raw = slice(&date_line, 0..8)?;
    let date = format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8]);
    Ok(BuildInfo {
        serial,
        version: Some(version),
        date,
    })
}

/// GD-ROM LD area: one row lower than Saturn, and the date is kept raw
pub fn gdrom_build_info(header: &str) -> ExtractResult<BuildInfo> {
    let lines: Vec<&str> = header.split('\n').collect();
    let serial_version = gutter(&lines, 4)?;
    let date_line = gutter(&lines, 5)?;
    let serial = slice(&serial_version, 0..10)?.trim_end().to_string();
    let version = slice(&serial_version, 10..16)?
        .trim_start_matches(['V', 'v'])
        .to_string();
    let date = slice(&date_line, 0..8)?.to_string();
    Ok(BuildInfo {
        serial,
        version: Some(version),
        date,
    })
}

/// Sega CD system area. The copyright row carries `YYYY.MMM`; month
/// names are normalized to two digits. Headers where the copyright
/// notice spills onto a second row are not handled.
pub fn segacd_build_info(header: &str) -> ExtractResult<BuildInfo> {
    let lines: Vec<&str> = header.split('\n').collect();
    let serial_line = gutter(&lines, 8)?;
    let date_line = gutter(&lines, 1)?;
    let serial = slice(&serial_line, 3..11)?
        .trim_end_matches(['-', ' '])
        .to_string();

    let raw = date_line
        .get(8..)
        .ok_or(NotFound::Malformed("header field"))?
        .trim();
    let mut parts: Vec<String> = raw.split('.').map(str::to_string).collect();
    if parts.len() == 1 && raw.len() >= 4 {
        parts = vec![raw[0..4].to_string(), raw[4..].to_string()];
    }
    if parts.len() < 2 {
        return Err(NotFound::Malformed("build date"));
    }
    parts[1] = match parts[1].as_str() {
        "JAN" => "01",
        "FEB" => "02",
        "MAR" => "03",
        "APR" => "04",
        "MAY" => "05",
        "JUN" => "06",
        "JUL" => "07",
        "AUG" => "08",
        "SEP" => "09",
        "OCT" => "10",
        "NOV" => "11",
        "DEC" => "12",
        _ => "00",
    }
    .to_string();
    Ok(BuildInfo {
        serial,
        version: None,
        date: parts.join("-"),
    })
}

fn dmi_ascii(dmi_path: &Path, offset: usize, length: usize) -> ExtractResult<String> {
    let bytes = read_bytes(dmi_path)?;
    let raw = bytes
        .get(offset..offset + length)
        .ok_or(NotFound::Malformed("DMI length"))?;
    Ok(String::from_utf8_lossy(raw).to_string())
}

/// XGD1 Master ID: eight ASCII characters at offset 8 of `_DMI.bin`
pub fn xgd1_xmid(dmi_path: &Path) -> ExtractResult<String> {
    dmi_ascii(dmi_path, 8, 8)
}

/// XGD2/3 Master ID: fourteen ASCII characters at offset 64
pub fn xgd23_xemid(dmi_path: &Path) -> ExtractResult<String> {
    dmi_ascii(dmi_path, 64, 14)
}

/// Decoded Xbox master ID.
///
/// XGD1 packs publisher (2), game number (3), version (2) and region
/// (1) into the eight-character XMID. The fourteen-character XeMID has
/// publisher (2), a platform digit, game number (4), SKU (2) and the
/// region at offset 9; no version is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XgdMasterId {
    pub raw: String,
    pub publisher: String,
    pub game_id: String,
    pub version: Option<String>,
    pub region: Option<char>,
}

impl XgdMasterId {
    pub fn from_xmid(raw: &str) -> Option<XgdMasterId> {
        if raw.len() < 8 || !raw.is_ascii() {
            return None;
        }
        Some(XgdMasterId {
            raw: raw.to_string(),
            publisher: raw[0..2].to_string(),
            game_id: raw[2..5].to_string(),
            version: Some(format!("1.{}", &raw[5..7])),
            region: raw[7..8].chars().next(),
        })
    }

    pub fn from_xemid(raw: &str) -> Option<XgdMasterId> {
        if raw.len() < 10 || !raw.is_ascii() {
            return None;
        }
        Some(XgdMasterId {
            raw: raw.to_string(),
            publisher: raw[0..2].to_string(),
            game_id: raw[3..7].to_string(),
            version: None,
            region: raw[9..10].chars().next(),
        })
    }

    pub fn serial(&self) -> String {
        format!("{}-{}", self.publisher, self.game_id)
    }

    pub fn region_name(&self) -> Option<&'static str> {
        match self.region? {
            'W' => Some("World"),
            'A' => Some("USA"),
            'E' => Some("Europe"),
            'J' => Some("Japan, Asia"),
            'K' => Some("USA, Japan"),
            'L' => Some("USA, Europe"),
            'H' => Some("Japan, Europe"),
            _ => None,
        }
    }
}

/// One Disc Information unit out of a BluRay `_PIC.bin` capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PicUnit {
    /// Three-character disc type, e.g. `BDO` or `XG4`
    pub type_id: String,
    pub first_psn: u32,
    pub last_psn: u32,
}

const PIC_HEADER_LEN: usize = 4;
const PIC_UNIT_LEN: usize = 64;
const PIC_TYPE_OFFSET: usize = 8;
const PIC_FIRST_PSN_OFFSET: usize = 0x14;
const PIC_LAST_PSN_OFFSET: usize = 0x18;

fn psn(unit: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([unit[offset], unit[offset + 1], unit[offset + 2], unit[offset + 3]])
}

/// Decode the per-layer Disc Information units out of `_PIC.bin`. The
/// capture is a 4-byte response header followed by 64-byte units; the
/// unit list ends at the first chunk without the `DI` signature.
pub fn pic_units(pic_path: &Path) -> ExtractResult<Vec<PicUnit>> {
    let bytes = read_bytes(pic_path)?;
    let body = bytes
        .get(PIC_HEADER_LEN..)
        .ok_or(NotFound::Malformed("PIC header"))?;
    let mut units = Vec::new();
    for chunk in body.chunks_exact(PIC_UNIT_LEN) {
        if &chunk[0..2] != b"DI" {
            break;
        }
        let type_id = String::from_utf8_lossy(&chunk[PIC_TYPE_OFFSET..PIC_TYPE_OFFSET + 3]).to_string();
        units.push(PicUnit {
            type_id,
            first_psn: psn(chunk, PIC_FIRST_PSN_OFFSET),
            last_psn: psn(chunk, PIC_LAST_PSN_OFFSET),
        });
    }
    if units.is_empty() {
        return Err(NotFound::MarkerNotFound("disc information units"));
    }
    Ok(units)
}

/// Disc type identifier of the first unit
pub fn pic_identifier(units: &[PicUnit]) -> Option<String> {
    units.first().map(|u| u.type_id.clone())
}

/// Cumulative layerbreak sectors for up to four layers. A single-layer
/// disc has no layerbreak at all.
pub fn pic_layerbreaks(units: &[PicUnit]) -> (Option<i64>, Option<i64>, Option<i64>) {
    let layer_len = |u: &PicUnit| i64::from(u.last_psn) - i64::from(u.first_psn) + 1;
    let mut breaks = [None, None, None];
    let mut running = 0i64;
    for (i, unit) in units.iter().enumerate().take(3) {
        if units.len() < i + 2 {
            break;
        }
        running += layer_len(unit);
        breaks[i] = Some(running);
    }
    (breaks[0], breaks[1], breaks[2])
}

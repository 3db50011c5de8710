use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Keys for the special-field comments a cataloging site understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SiteCode {
    #[serde(rename = "multisession")]
    Multisession,
    #[serde(rename = "universal_hash")]
    UniversalHash,
    #[serde(rename = "internal_serial")]
    InternalSerialName,
    #[serde(rename = "xmid")]
    Xmid,
    #[serde(rename = "xemid")]
    XeMid,
    #[serde(rename = "dmi_hash")]
    DmiHash,
    #[serde(rename = "pfi_hash")]
    PfiHash,
    #[serde(rename = "ss_hash")]
    SsHash,
    #[serde(rename = "ss_version")]
    SsVersion,
}

/// Program, hardware and timing data about the dump itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DumpingInfo {
    pub dumping_program: Option<String>,
    pub dumping_date: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
    pub reported_disc_type: Option<String>,
}

/// Identity data shared by every media type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonDiscInfo {
    pub region: Option<String>,
    pub serial: Option<String>,
    pub errors_count: Option<String>,
    pub exe_date_build_date: Option<String>,
    pub ring_write_offset: Option<String>,
    /// Special-field comments keyed by site code; BTreeMap keeps the
    /// serialized order stable
    pub comments_special_fields: BTreeMap<SiteCode, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionAndEditions {
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeAndChecksums {
    pub size: Option<i64>,
    pub crc32: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub layerbreak: Option<i64>,
    pub layerbreak_2: Option<i64>,
    pub layerbreak_3: Option<i64>,
    pub pic_identifier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TracksAndWriteOffsets {
    pub cuesheet: Option<String>,
    pub clrmamepro_data: Option<String>,
    pub other_write_offsets: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopyProtection {
    pub protection: Option<String>,
    pub anti_modchip: Option<String>,
    pub securom_data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdcInfo {
    pub edc: Option<String>,
}

/// Raw captured payloads that don't fit a structured field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extras {
    pub pvd: Option<String>,
    pub header: Option<String>,
    pub pic: Option<String>,
    pub security_sector_ranges: Option<String>,
}

/// The full submission record handed to the upload collaborator.
///
/// Sections are independently populated; a dump with incomplete logs
/// yields a record with some fields unset, never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionInfo {
    pub dumping_info: DumpingInfo,
    pub common_disc_info: CommonDiscInfo,
    pub version_and_editions: VersionAndEditions,
    pub size_and_checksums: SizeAndChecksums,
    pub tracks_and_write_offsets: TracksAndWriteOffsets,
    pub copy_protection: CopyProtection,
    pub edc: EdcInfo,
    pub extras: Extras,
    /// Named base64 blobs of selected log files, when requested
    pub artifacts: BTreeMap<String, String>,
}

impl SubmissionInfo {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

//! Command-line grammar for DiscImageCreator.
//!
//! The grammar is positional: a command token, then command-specific
//! required fields, then slash-prefixed flags with optional trailing
//! values. Serialization refuses to emit a line the tool would reject;
//! parsing accepts anything the tool itself would tolerate, which
//! includes unknown trailing tokens.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use super::{
    is_valid_drive_id, parse_i32, tokenize, FlagMap, ParseError, SerializeError, ToolParams,
};
use crate::config::Config;
use crate::media::{MediaType, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DicCommand {
    Audio,
    BluRay,
    Close,
    CompactDisc,
    Data,
    DigitalVideoDisc,
    Disk,
    DriveSpeed,
    Eject,
    Floppy,
    GdRom,
    Mds,
    Merge,
    Reset,
    Sacd,
    Start,
    Stop,
    Sub,
    Swap,
    Tape,
    Version,
    Xbox,
    XboxSwap,
    Xgd2Swap,
    Xgd3Swap,
}

impl DicCommand {
    pub fn token(&self) -> &'static str {
        match self {
            DicCommand::Audio => "audio",
            DicCommand::BluRay => "bd",
            DicCommand::Close => "close",
            DicCommand::CompactDisc => "cd",
            DicCommand::Data => "data",
            DicCommand::DigitalVideoDisc => "dvd",
            DicCommand::Disk => "disk",
            DicCommand::DriveSpeed => "ls",
            DicCommand::Eject => "eject",
            DicCommand::Floppy => "fd",
            DicCommand::GdRom => "gd",
            DicCommand::Mds => "mds",
            DicCommand::Merge => "merge",
            DicCommand::Reset => "reset",
            DicCommand::Sacd => "sacd",
            DicCommand::Start => "start",
            DicCommand::Stop => "stop",
            DicCommand::Sub => "sub",
            DicCommand::Swap => "swap",
            DicCommand::Tape => "tape",
            DicCommand::Version => "/v",
            DicCommand::Xbox => "xbox",
            DicCommand::XboxSwap => "xboxswap",
            DicCommand::Xgd2Swap => "xgd2swap",
            DicCommand::Xgd3Swap => "xgd3swap",
        }
    }

    pub fn from_token(token: &str) -> Option<DicCommand> {
        match token {
            "audio" => Some(DicCommand::Audio),
            "bd" => Some(DicCommand::BluRay),
            "close" => Some(DicCommand::Close),
            "cd" => Some(DicCommand::CompactDisc),
            "data" => Some(DicCommand::Data),
            "dvd" => Some(DicCommand::DigitalVideoDisc),
            "disk" => Some(DicCommand::Disk),
            "ls" => Some(DicCommand::DriveSpeed),
            "eject" => Some(DicCommand::Eject),
            "fd" => Some(DicCommand::Floppy),
            "gd" => Some(DicCommand::GdRom),
            "mds" => Some(DicCommand::Mds),
            "merge" => Some(DicCommand::Merge),
            "reset" => Some(DicCommand::Reset),
            "sacd" => Some(DicCommand::Sacd),
            "start" => Some(DicCommand::Start),
            "stop" => Some(DicCommand::Stop),
            "sub" => Some(DicCommand::Sub),
            "swap" => Some(DicCommand::Swap),
            "tape" => Some(DicCommand::Tape),
            "/v" => Some(DicCommand::Version),
            "xbox" => Some(DicCommand::Xbox),
            "xboxswap" => Some(DicCommand::XboxSwap),
            "xgd2swap" => Some(DicCommand::Xgd2Swap),
            "xgd3swap" => Some(DicCommand::Xgd3Swap),
            _ => None,
        }
    }

    /// Flags the tool accepts after this command's positional fields
    pub fn supported_flags(&self) -> &'static [DicFlag] {
        use DicFlag::*;
        match self {
            DicCommand::Audio => &[
                BeOpcode,
                C2Opcode,
                D8Opcode,
                DatExpand,
                DisableBeep,
                ForceUnitAccess,
                NoFixSubP,
                NoFixSubQ,
                NoFixSubRtoW,
                Reverse,
                ScanAntiMod,
                ScanFileProtect,
                ScanSectorProtect,
                SkipSector,
                SubchannelReadLevel,
            ],
            DicCommand::BluRay => &[
                DatExpand,
                DisableBeep,
                DvdReread,
                ForceUnitAccess,
                UseAnchorVolumeDescriptorPointer,
            ],
            DicCommand::CompactDisc => &[
                AddOffset,
                Amsf,
                AtariJaguar,
                BeOpcode,
                C2Opcode,
                D8Opcode,
                DatExpand,
                DisableBeep,
                ExtractMicroSoftCabFile,
                ForceUnitAccess,
                MultiSectorRead,
                NoFixSubP,
                NoFixSubQ,
                NoFixSubQLibCrypt,
                NoFixSubQSecuRom,
                NoFixSubRtoW,
                ScanAntiMod,
                ScanFileProtect,
                ScanSectorProtect,
                SeventyFour,
                SubchannelReadLevel,
                VideoNow,
                VideoNowColor,
                VideoNowXp,
            ],
            DicCommand::Data => &[
                BeOpcode,
                C2Opcode,
                D8Opcode,
                DatExpand,
                DisableBeep,
                ForceUnitAccess,
                NoFixSubP,
                NoFixSubQ,
                NoFixSubRtoW,
                Reverse,
                ScanAntiMod,
                ScanFileProtect,
                ScanSectorProtect,
                SkipSector,
                SubchannelReadLevel,
            ],
            DicCommand::DigitalVideoDisc => &[
                CopyrightManagementInformation,
                DatExpand,
                DisableBeep,
                DvdReread,
                Fix,
                ForceUnitAccess,
                PadSector,
                Range,
                Raw,
                Resume,
                Reverse,
                ScanFileProtect,
                SkipSector,
                UseAnchorVolumeDescriptorPointer,
            ],
            DicCommand::Disk | DicCommand::Floppy => &[DatExpand],
            DicCommand::GdRom => &[
                BeOpcode,
                C2Opcode,
                D8Opcode,
                DatExpand,
                DisableBeep,
                ForceUnitAccess,
                NoFixSubP,
                NoFixSubQ,
                NoFixSubRtoW,
                SubchannelReadLevel,
            ],
            DicCommand::Sacd => &[DatExpand, DisableBeep],
            DicCommand::Swap => &[
                AddOffset,
                BeOpcode,
                C2Opcode,
                D8Opcode,
                DatExpand,
                DisableBeep,
                ForceUnitAccess,
                NoFixSubP,
                NoFixSubQ,
                NoFixSubQLibCrypt,
                NoFixSubQSecuRom,
                NoFixSubRtoW,
                ScanAntiMod,
                ScanFileProtect,
                ScanSectorProtect,
                SeventyFour,
                SubchannelReadLevel,
                VideoNow,
                VideoNowColor,
                VideoNowXp,
            ],
            DicCommand::Xbox => &[DatExpand, DisableBeep, DvdReread, ForceUnitAccess, NoSkipSs],
            DicCommand::XboxSwap | DicCommand::Xgd2Swap | DicCommand::Xgd3Swap => {
                &[DatExpand, DisableBeep, ForceUnitAccess, NoSkipSs]
            }
            DicCommand::Close
            | DicCommand::DriveSpeed
            | DicCommand::Eject
            | DicCommand::Mds
            | DicCommand::Merge
            | DicCommand::Reset
            | DicCommand::Start
            | DicCommand::Stop
            | DicCommand::Sub
            | DicCommand::Tape
            | DicCommand::Version => &[],
        }
    }

    fn takes_drive_id(&self) -> bool {
        !matches!(
            self,
            DicCommand::Mds
                | DicCommand::Merge
                | DicCommand::Sub
                | DicCommand::Tape
                | DicCommand::Version
        )
    }

    fn takes_filename(&self) -> bool {
        matches!(
            self,
            DicCommand::Audio
                | DicCommand::BluRay
                | DicCommand::CompactDisc
                | DicCommand::Data
                | DicCommand::DigitalVideoDisc
                | DicCommand::Disk
                | DicCommand::Floppy
                | DicCommand::GdRom
                | DicCommand::Mds
                | DicCommand::Merge
                | DicCommand::Sacd
                | DicCommand::Sub
                | DicCommand::Swap
                | DicCommand::Tape
                | DicCommand::Xbox
                | DicCommand::XboxSwap
                | DicCommand::Xgd2Swap
                | DicCommand::Xgd3Swap
        )
    }

    fn takes_speed(&self) -> bool {
        matches!(
            self,
            DicCommand::Audio
                | DicCommand::BluRay
                | DicCommand::CompactDisc
                | DicCommand::Data
                | DicCommand::DigitalVideoDisc
                | DicCommand::GdRom
                | DicCommand::Sacd
                | DicCommand::Swap
                | DicCommand::Xbox
                | DicCommand::XboxSwap
                | DicCommand::Xgd2Swap
                | DicCommand::Xgd3Swap
        )
    }

    fn takes_lba_range(&self) -> bool {
        matches!(self, DicCommand::Audio | DicCommand::Data)
    }

    /// Upper speed bound accepted at parse time. The DVD bound is wider
    /// than the officially documented 0-16 because real drives accept it.
    fn speed_bound(&self) -> i32 {
        match self {
            DicCommand::DigitalVideoDisc => 24,
            DicCommand::Sacd => 16,
            _ => 72,
        }
    }

    /// Media family implied by the command, used to select the output
    /// file set
    pub fn media_type(&self) -> Option<MediaType> {
        match self {
            DicCommand::Audio
            | DicCommand::CompactDisc
            | DicCommand::Data
            | DicCommand::Sacd
            | DicCommand::Swap => Some(MediaType::Cd),
            DicCommand::GdRom => Some(MediaType::Gd),
            DicCommand::DigitalVideoDisc
            | DicCommand::Xbox
            | DicCommand::XboxSwap
            | DicCommand::Xgd2Swap
            | DicCommand::Xgd3Swap => Some(MediaType::Dvd),
            DicCommand::BluRay => Some(MediaType::BluRay),
            DicCommand::Floppy => Some(MediaType::Floppy),
            DicCommand::Disk => Some(MediaType::HardDisk),
            DicCommand::Tape => Some(MediaType::DataCartridge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DicFlag {
    AddOffset,
    Amsf,
    AtariJaguar,
    BeOpcode,
    C2Opcode,
    CopyrightManagementInformation,
    D8Opcode,
    DatExpand,
    DisableBeep,
    DvdReread,
    ExtractMicroSoftCabFile,
    Fix,
    ForceUnitAccess,
    MultiSectorRead,
    NoFixSubP,
    NoFixSubQ,
    NoFixSubQLibCrypt,
    NoFixSubQSecuRom,
    NoFixSubRtoW,
    NoSkipSs,
    PadSector,
    Range,
    Raw,
    Resume,
    Reverse,
    ScanAntiMod,
    ScanFileProtect,
    ScanSectorProtect,
    SeventyFour,
    SkipSector,
    SubchannelReadLevel,
    UseAnchorVolumeDescriptorPointer,
    VideoNow,
    VideoNowColor,
    VideoNowXp,
}

impl DicFlag {
    pub fn token(&self) -> &'static str {
        match self {
            DicFlag::AddOffset => "/a",
            DicFlag::Amsf => "/p",
            DicFlag::AtariJaguar => "/aj",
            DicFlag::BeOpcode => "/be",
            DicFlag::C2Opcode => "/c2",
            DicFlag::CopyrightManagementInformation => "/c",
            DicFlag::D8Opcode => "/d8",
            DicFlag::DatExpand => "/d",
            DicFlag::DisableBeep => "/q",
            DicFlag::DvdReread => "/rr",
            DicFlag::ExtractMicroSoftCabFile => "/mscf",
            DicFlag::Fix => "/fix",
            DicFlag::ForceUnitAccess => "/f",
            DicFlag::MultiSectorRead => "/mr",
            DicFlag::NoFixSubP => "/np",
            DicFlag::NoFixSubQ => "/nq",
            DicFlag::NoFixSubQLibCrypt => "/nl",
            DicFlag::NoFixSubQSecuRom => "/ns",
            DicFlag::NoFixSubRtoW => "/nr",
            DicFlag::NoSkipSs => "/nss",
            DicFlag::PadSector => "/ps",
            DicFlag::Range => "/ra",
            DicFlag::Raw => "/raw",
            DicFlag::Resume => "/re",
            DicFlag::Reverse => "/r",
            DicFlag::ScanAntiMod => "/am",
            DicFlag::ScanFileProtect => "/sf",
            DicFlag::ScanSectorProtect => "/ss",
            DicFlag::SeventyFour => "/74",
            DicFlag::SkipSector => "/sk",
            DicFlag::SubchannelReadLevel => "/s",
            DicFlag::UseAnchorVolumeDescriptorPointer => "/avdp",
            DicFlag::VideoNow => "/vn",
            DicFlag::VideoNowColor => "/vnc",
            DicFlag::VideoNowXp => "/vnx",
        }
    }

    pub fn from_token(token: &str) -> Option<DicFlag> {
        match token {
            "/a" => Some(DicFlag::AddOffset),
            "/p" => Some(DicFlag::Amsf),
            "/aj" => Some(DicFlag::AtariJaguar),
            "/be" => Some(DicFlag::BeOpcode),
            "/c2" => Some(DicFlag::C2Opcode),
            "/c" => Some(DicFlag::CopyrightManagementInformation),
            "/d8" => Some(DicFlag::D8Opcode),
            "/d" => Some(DicFlag::DatExpand),
            "/q" => Some(DicFlag::DisableBeep),
            "/rr" => Some(DicFlag::DvdReread),
            "/mscf" => Some(DicFlag::ExtractMicroSoftCabFile),
            "/fix" => Some(DicFlag::Fix),
            "/f" => Some(DicFlag::ForceUnitAccess),
            "/mr" => Some(DicFlag::MultiSectorRead),
            "/np" => Some(DicFlag::NoFixSubP),
            "/nq" => Some(DicFlag::NoFixSubQ),
            "/nl" => Some(DicFlag::NoFixSubQLibCrypt),
            "/ns" => Some(DicFlag::NoFixSubQSecuRom),
            "/nr" => Some(DicFlag::NoFixSubRtoW),
            "/nss" => Some(DicFlag::NoSkipSs),
            "/ps" => Some(DicFlag::PadSector),
            "/ra" => Some(DicFlag::Range),
            "/raw" => Some(DicFlag::Raw),
            "/re" => Some(DicFlag::Resume),
            "/r" => Some(DicFlag::Reverse),
            "/am" => Some(DicFlag::ScanAntiMod),
            "/sf" => Some(DicFlag::ScanFileProtect),
            "/ss" => Some(DicFlag::ScanSectorProtect),
            "/74" => Some(DicFlag::SeventyFour),
            "/sk" => Some(DicFlag::SkipSector),
            "/s" => Some(DicFlag::SubchannelReadLevel),
            "/avdp" => Some(DicFlag::UseAnchorVolumeDescriptorPointer),
            "/vn" => Some(DicFlag::VideoNow),
            "/vnc" => Some(DicFlag::VideoNowColor),
            "/vnx" => Some(DicFlag::VideoNowXp),
            _ => None,
        }
    }
}

/// Serialization order the tool expects; also drives the emission loop
const SERIALIZE_ORDER: &[DicFlag] = &[
    DicFlag::AddOffset,
    DicFlag::Amsf,
    DicFlag::AtariJaguar,
    DicFlag::BeOpcode,
    DicFlag::C2Opcode,
    DicFlag::CopyrightManagementInformation,
    DicFlag::D8Opcode,
    DicFlag::DatExpand,
    DicFlag::DisableBeep,
    DicFlag::DvdReread,
    DicFlag::ExtractMicroSoftCabFile,
    DicFlag::Fix,
    DicFlag::ForceUnitAccess,
    DicFlag::MultiSectorRead,
    DicFlag::NoFixSubP,
    DicFlag::NoFixSubQ,
    DicFlag::NoFixSubQLibCrypt,
    DicFlag::NoFixSubQSecuRom,
    DicFlag::NoFixSubRtoW,
    DicFlag::NoSkipSs,
    DicFlag::PadSector,
    DicFlag::Range,
    DicFlag::Raw,
    DicFlag::Resume,
    DicFlag::Reverse,
    DicFlag::ScanAntiMod,
    DicFlag::ScanFileProtect,
    DicFlag::ScanSectorProtect,
    DicFlag::SeventyFour,
    DicFlag::SkipSector,
    DicFlag::SubchannelReadLevel,
    DicFlag::UseAnchorVolumeDescriptorPointer,
    DicFlag::VideoNow,
    DicFlag::VideoNowColor,
    DicFlag::VideoNowXp,
];

/// Full parameter state for a DiscImageCreator invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DicParams {
    pub command: Option<DicCommand>,
    pub drive_id: Option<String>,
    /// Stored without quotes; quoting is a serialization concern
    pub filename: Option<String>,
    pub optiarc_filename: Option<String>,
    pub speed: Option<i32>,
    pub start_lba: Option<i32>,
    pub end_lba: Option<i32>,

    pub flags: FlagMap<DicFlag>,

    pub add_offset_value: Option<i32>,
    pub be_opcode_value: Option<String>,
    pub c2_values: [Option<i32>; 5],
    pub dvd_reread_value: Option<i32>,
    pub fix_value: Option<i32>,
    pub force_unit_access_value: Option<i32>,
    pub multi_sector_read_value: Option<i32>,
    pub no_skip_ss_value: Option<i32>,
    pub pad_sector_value: Option<u8>,
    pub reverse_start_lba: Option<i32>,
    pub reverse_end_lba: Option<i32>,
    pub scan_file_protect_value: Option<i32>,
    pub skip_sector_values: [Option<i32>; 2],
    pub subchannel_read_level_value: Option<i32>,
    pub video_now_value: Option<i32>,
}

impl DicParams {
    fn flag_supported(&self, flag: DicFlag) -> bool {
        self.command
            .map(|c| c.supported_flags().contains(&flag))
            .unwrap_or(false)
    }

    /// Whether a token is a flag the current command accepts. Flag-value
    /// consumption stops at these.
    fn is_supported_flag_token(&self, token: &str) -> bool {
        DicFlag::from_token(token)
            .map(|f| self.flag_supported(f))
            .unwrap_or(false)
    }

    fn set_base_command(&mut self, platform: Platform, media: MediaType) {
        if !platform.supports(media) {
            self.command = None;
            return;
        }
        self.command = Some(match media {
            MediaType::Cd => {
                if platform == Platform::SuperAudioCd {
                    DicCommand::Sacd
                } else {
                    DicCommand::CompactDisc
                }
            }
            MediaType::Dvd => {
                if platform.is_xgd() {
                    DicCommand::Xbox
                } else {
                    DicCommand::DigitalVideoDisc
                }
            }
            MediaType::Gd => DicCommand::GdRom,
            MediaType::HdDvd => DicCommand::DigitalVideoDisc,
            MediaType::BluRay => DicCommand::BluRay,
            MediaType::GameCubeDisc | MediaType::WiiDisc => DicCommand::DigitalVideoDisc,
            MediaType::Floppy => DicCommand::Floppy,
            MediaType::HardDisk => DicCommand::Disk,
            MediaType::DataCartridge => DicCommand::Tape,
        });
    }

    /// Consume the positional fields. Returns the index where the flag
    /// region starts, or None for commands that take no flags.
    fn parse_positional(&mut self, tokens: &[String]) -> Result<Option<usize>, ParseError> {
        let command = match self.command {
            Some(c) => c,
            None => return Err(ParseError::Empty),
        };
        let name = command.token();

        // Exact token counts for the fixed-arity commands
        let exact = |count: usize| -> Result<(), ParseError> {
            if tokens.len() != count {
                Err(ParseError::TokenCount(name))
            } else {
                Ok(())
            }
        };
        let at_least = |count: usize| -> Result<(), ParseError> {
            if tokens.len() < count {
                Err(ParseError::TokenCount(name))
            } else {
                Ok(())
            }
        };

        match command {
            DicCommand::Version => {
                exact(1)?;
                Ok(None)
            }
            DicCommand::Close
            | DicCommand::DriveSpeed
            | DicCommand::Eject
            | DicCommand::Reset
            | DicCommand::Start
            | DicCommand::Stop => {
                exact(2)?;
                self.take_drive(tokens, 1)?;
                Ok(None)
            }
            DicCommand::Mds | DicCommand::Sub | DicCommand::Tape => {
                exact(2)?;
                self.filename = Some(self.take_filename(tokens, 1)?);
                Ok(None)
            }
            DicCommand::Merge => {
                exact(3)?;
                self.filename = Some(self.take_filename(tokens, 1)?);
                self.optiarc_filename = Some(self.take_filename(tokens, 2)?);
                Ok(None)
            }
            DicCommand::Disk | DicCommand::Floppy => {
                exact(3)?;
                self.take_drive(tokens, 1)?;
                self.filename = Some(self.take_filename(tokens, 2)?);
                Ok(None)
            }
            DicCommand::Audio | DicCommand::Data => {
                at_least(6)?;
                self.take_drive(tokens, 1)?;
                self.filename = Some(self.take_filename(tokens, 2)?);
                self.take_speed(tokens, 3, command)?;
                self.start_lba = Some(self.take_int(tokens, 4)?);
                self.end_lba = Some(self.take_int(tokens, 5)?);
                Ok(Some(6))
            }
            DicCommand::XboxSwap | DicCommand::Xgd2Swap | DicCommand::Xgd3Swap => {
                at_least(4)?;
                self.take_drive(tokens, 1)?;
                self.filename = Some(self.take_filename(tokens, 2)?);
                self.take_speed(tokens, 3, command)?;
                // Trailing tokens are layerbreak sector values
                for token in &tokens[4..] {
                    if token.parse::<i64>().is_err() {
                        return Err(ParseError::InvalidNumber(token.clone()));
                    }
                }
                Ok(None)
            }
            DicCommand::BluRay
            | DicCommand::CompactDisc
            | DicCommand::DigitalVideoDisc
            | DicCommand::GdRom
            | DicCommand::Sacd
            | DicCommand::Swap
            | DicCommand::Xbox => {
                at_least(4)?;
                self.take_drive(tokens, 1)?;
                self.filename = Some(self.take_filename(tokens, 2)?);
                self.take_speed(tokens, 3, command)?;
                Ok(Some(4))
            }
        }
    }

    fn take_drive(&mut self, tokens: &[String], index: usize) -> Result<(), ParseError> {
        let token = &tokens[index];
        if !is_valid_drive_id(token) {
            return Err(ParseError::InvalidDrive(token.clone()));
        }
        self.drive_id = Some(token.clone());
        Ok(())
    }

    fn take_filename(&self, tokens: &[String], index: usize) -> Result<String, ParseError> {
        let token = &tokens[index];
        if self.is_supported_flag_token(token) {
            return Err(ParseError::FilenameIsFlag(token.clone()));
        }
        Ok(token.clone())
    }

    fn take_speed(
        &mut self,
        tokens: &[String],
        index: usize,
        command: DicCommand,
    ) -> Result<(), ParseError> {
        let token = &tokens[index];
        match parse_i32(token, Some(0), Some(command.speed_bound())) {
            Some(value) => {
                self.speed = Some(value);
                Ok(())
            }
            None => Err(ParseError::InvalidNumber(token.clone())),
        }
    }

    fn take_int(&self, tokens: &[String], index: usize) -> Result<i32, ParseError> {
        let token = &tokens[index];
        token
            .parse()
            .map_err(|_| ParseError::InvalidNumber(token.clone()))
    }

    /// Trailing value for an int-valued flag: consumed when it parses,
    /// left in place otherwise so the main loop skips it as garbage
    fn take_flag_value(&self, tokens: &[String], i: &mut usize) -> Option<i32> {
        let next = tokens.get(*i + 1)?;
        if self.is_supported_flag_token(next) {
            return None;
        }
        let value = next.parse().ok()?;
        *i += 1;
        Some(value)
    }

    fn take_flag_value_u8(&self, tokens: &[String], i: &mut usize) -> Option<u8> {
        let next = tokens.get(*i + 1)?;
        if self.is_supported_flag_token(next) {
            return None;
        }
        let value = next.parse().ok()?;
        *i += 1;
        Some(value)
    }

    fn parse_flags(&mut self, tokens: &[String], start: usize) -> Result<(), ParseError> {
        let mut i = start;
        while i < tokens.len() {
            match DicFlag::from_token(&tokens[i]) {
                Some(flag) if self.flag_supported(flag) => {
                    self.apply_flag(tokens, &mut i, flag)?;
                }
                _ => {
                    debug!(token = %tokens[i], "skipping unrecognized token");
                }
            }
            i += 1;
        }
        Ok(())
    }

    fn apply_flag(
        &mut self,
        tokens: &[String],
        i: &mut usize,
        flag: DicFlag,
    ) -> Result<(), ParseError> {
        match flag {
            DicFlag::AddOffset => {
                self.flags.set(flag, true);
                if let Some(v) = self.take_flag_value(tokens, i) {
                    self.add_offset_value = Some(v);
                }
            }
            DicFlag::BeOpcode => {
                self.flags.set(flag, true);
                if let Some(next) = tokens.get(*i + 1) {
                    if next == "raw" || next == "pack" {
                        self.be_opcode_value = Some(next.clone());
                        *i += 1;
                    }
                }
            }
            // A malformed reread chain invalidates the whole line: the
            // tool would misread every later positional value
            DicFlag::C2Opcode => {
                self.flags.set(flag, true);
                for slot in 0..5 {
                    let next = match tokens.get(*i + 1) {
                        Some(t) if !self.is_supported_flag_token(t) => t,
                        _ => break,
                    };
                    match parse_i32(next, Some(0), None) {
                        Some(value) => {
                            self.c2_values[slot] = Some(value);
                            *i += 1;
                        }
                        None => {
                            return Err(ParseError::FlagValue {
                                flag: "/c2",
                                value: next.clone(),
                            })
                        }
                    }
                }
            }
            DicFlag::DvdReread => {
                self.flags.set(flag, true);
                if let Some(v) = self.take_flag_value(tokens, i) {
                    self.dvd_reread_value = Some(v);
                }
            }
            DicFlag::Fix => {
                self.flags.set(flag, true);
                if let Some(v) = self.take_flag_value(tokens, i) {
                    self.fix_value = Some(v);
                }
            }
            DicFlag::ForceUnitAccess => {
                self.flags.set(flag, true);
                if let Some(v) = self.take_flag_value(tokens, i) {
                    if v >= 0 {
                        self.force_unit_access_value = Some(v);
                    }
                }
            }
            DicFlag::MultiSectorRead => {
                self.flags.set(flag, true);
                if let Some(v) = self.take_flag_value(tokens, i) {
                    if v >= 0 {
                        self.multi_sector_read_value = Some(v);
                    }
                }
            }
            DicFlag::NoSkipSs => {
                self.flags.set(flag, true);
                if let Some(v) = self.take_flag_value(tokens, i) {
                    if v >= 0 {
                        self.no_skip_ss_value = Some(v);
                    }
                }
            }
            DicFlag::PadSector => {
                self.flags.set(flag, true);
                if let Some(v) = self.take_flag_value_u8(tokens, i) {
                    self.pad_sector_value = Some(v);
                }
            }
            DicFlag::Reverse => {
                // The dvd command requires an explicit LBA range here
                if self.command == Some(DicCommand::DigitalVideoDisc) {
                    let start = tokens.get(*i + 1).and_then(|t| parse_i32(t, Some(0), None));
                    let end = tokens.get(*i + 2).and_then(|t| parse_i32(t, Some(0), None));
                    match (start, end) {
                        (Some(s), Some(e)) => {
                            self.reverse_start_lba = Some(s);
                            self.reverse_end_lba = Some(e);
                            *i += 2;
                        }
                        _ => {
                            return Err(ParseError::FlagValue {
                                flag: "/r",
                                value: tokens.get(*i + 1).cloned().unwrap_or_default(),
                            })
                        }
                    }
                }
                self.flags.set(flag, true);
            }
            DicFlag::ScanFileProtect => {
                self.flags.set(flag, true);
                if let Some(v) = self.take_flag_value(tokens, i) {
                    if v >= 0 {
                        self.scan_file_protect_value = Some(v);
                    }
                }
            }
            // A bad skip chain drops the flag but keeps the rest of the
            // line usable
            DicFlag::SkipSector => {
                let mut still_valid = true;
                for slot in 0..2 {
                    let next = match tokens.get(*i + 1) {
                        Some(t) if !self.is_supported_flag_token(t) => t,
                        _ => break,
                    };
                    match parse_i32(next, Some(0), None) {
                        Some(value) => {
                            self.skip_sector_values[slot] = Some(value);
                            *i += 1;
                        }
                        None => {
                            still_valid = false;
                            break;
                        }
                    }
                }
                if still_valid {
                    self.flags.set(flag, true);
                }
            }
            DicFlag::SubchannelReadLevel => {
                self.flags.set(flag, true);
                if let Some(v) = self.take_flag_value(tokens, i) {
                    if (0..=2).contains(&v) {
                        self.subchannel_read_level_value = Some(v);
                    }
                }
            }
            DicFlag::VideoNow => {
                self.flags.set(flag, true);
                if let Some(v) = self.take_flag_value(tokens, i) {
                    if v >= 0 {
                        self.video_now_value = Some(v);
                    }
                }
            }
            // Plain boolean flags
            _ => {
                self.flags.set(flag, true);
            }
        }
        Ok(())
    }

    fn emit_flag(
        &self,
        flag: DicFlag,
        command: DicCommand,
        parts: &mut Vec<String>,
    ) -> Result<(), SerializeError> {
        if !self.flag_supported(flag) || !self.flags.is_on(flag) {
            return Ok(());
        }
        match flag {
            DicFlag::AddOffset => {
                parts.push(flag.token().to_string());
                if let Some(v) = self.add_offset_value {
                    parts.push(v.to_string());
                }
            }
            DicFlag::BeOpcode => {
                // D8 wins when both reading opcodes are requested
                if self.flags.is_on(DicFlag::D8Opcode) {
                    return Ok(());
                }
                parts.push(flag.token().to_string());
                if let Some(value) = &self.be_opcode_value {
                    if value == "raw" || value == "pack" {
                        parts.push(value.clone());
                    }
                }
            }
            DicFlag::C2Opcode => {
                parts.push(flag.token().to_string());
                if let Some(reread) = self.c2_values[0] {
                    if reread <= 0 {
                        return Err(SerializeError::OutOfBounds {
                            flag: "/c2",
                            value: reread as i64,
                        });
                    }
                    parts.push(reread.to_string());
                }
                if let Some(v) = self.c2_values[1] {
                    parts.push(v.to_string());
                }
                match self.c2_values[2] {
                    Some(0) => parts.push("0".to_string()),
                    Some(1) => {
                        parts.push("1".to_string());
                        if let (Some(start), Some(end)) = (self.c2_values[3], self.c2_values[4]) {
                            if start > 0 && end > 0 {
                                parts.push(start.to_string());
                                parts.push(end.to_string());
                            } else {
                                return Err(SerializeError::OutOfBounds {
                                    flag: "/c2",
                                    value: start.min(end) as i64,
                                });
                            }
                        }
                    }
                    Some(other) => {
                        return Err(SerializeError::OutOfBounds {
                            flag: "/c2",
                            value: other as i64,
                        })
                    }
                    None => {}
                }
            }
            DicFlag::DvdReread => {
                parts.push(flag.token().to_string());
                if let Some(v) = self.dvd_reread_value {
                    parts.push(v.to_string());
                }
            }
            DicFlag::Fix => {
                parts.push(flag.token().to_string());
                match self.fix_value {
                    Some(v) => parts.push(v.to_string()),
                    None => return Err(SerializeError::MissingField("fix LBA")),
                }
            }
            DicFlag::ForceUnitAccess => {
                parts.push(flag.token().to_string());
                if let Some(v) = self.force_unit_access_value {
                    parts.push(v.to_string());
                }
            }
            DicFlag::MultiSectorRead => {
                parts.push(flag.token().to_string());
                if let Some(v) = self.multi_sector_read_value {
                    parts.push(v.to_string());
                }
            }
            DicFlag::NoSkipSs => {
                parts.push(flag.token().to_string());
                if let Some(v) = self.no_skip_ss_value {
                    parts.push(v.to_string());
                }
            }
            DicFlag::PadSector => {
                parts.push(flag.token().to_string());
                if let Some(v) = self.pad_sector_value {
                    parts.push(v.to_string());
                }
            }
            DicFlag::Reverse => {
                parts.push(flag.token().to_string());
                if command == DicCommand::DigitalVideoDisc {
                    match (self.reverse_start_lba, self.reverse_end_lba) {
                        (Some(start), Some(end)) => {
                            parts.push(start.to_string());
                            parts.push(end.to_string());
                        }
                        _ => return Err(SerializeError::MissingField("reverse LBA range")),
                    }
                }
            }
            DicFlag::ScanFileProtect => {
                parts.push(flag.token().to_string());
                if let Some(v) = self.scan_file_protect_value {
                    if v <= 0 {
                        return Err(SerializeError::OutOfBounds {
                            flag: "/sf",
                            value: v as i64,
                        });
                    }
                    parts.push(v.to_string());
                }
            }
            DicFlag::SkipSector => {
                parts.push(flag.token().to_string());
                if let Some(count) = self.skip_sector_values[0] {
                    if count <= 0 {
                        return Err(SerializeError::OutOfBounds {
                            flag: "/sk",
                            value: count as i64,
                        });
                    }
                    parts.push(count.to_string());
                }
                if let Some(0) = self.skip_sector_values[1] {
                    parts.push("0".to_string());
                }
            }
            DicFlag::SubchannelReadLevel => {
                parts.push(flag.token().to_string());
                if let Some(v) = self.subchannel_read_level_value {
                    if !(0..=2).contains(&v) {
                        return Err(SerializeError::OutOfBounds {
                            flag: "/s",
                            value: v as i64,
                        });
                    }
                    parts.push(v.to_string());
                }
            }
            DicFlag::VideoNow => {
                parts.push(flag.token().to_string());
                if let Some(v) = self.video_now_value {
                    if v < 0 {
                        return Err(SerializeError::OutOfBounds {
                            flag: "/vn",
                            value: v as i64,
                        });
                    }
                    parts.push(v.to_string());
                }
            }
            _ => parts.push(flag.token().to_string()),
        }
        Ok(())
    }

    pub fn media_type(&self) -> Option<MediaType> {
        self.command.and_then(|c| c.media_type())
    }

    /// Every log file the tool left next to the image, for archival.
    /// The timestamped command file is matched by pattern since its name
    /// embeds the run time.
    pub fn log_file_paths(&self, base_path: &str) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        let mut push = |suffix: &str| {
            let candidate = PathBuf::from(format!("{base_path}{suffix}"));
            if candidate.is_file() {
                paths.push(candidate);
            }
        };

        match self.media_type() {
            Some(m) if m.is_cd_family() => {
                push(".c2");
                push("_c2Error.txt");
                push(".ccd");
                push("_cmd.txt");
                push(".dat");
                push(".sub");
                push(" (Track 0).sub");
                push(" (Track 00).sub");
                push(" (Track 1)(-LBA).sub");
                push(" (Track 01)(-LBA).sub");
                push(" (Track AA).sub");
                push(".subtmp");
                push(".toc");
                push("_disc.txt");
                push("_drive.txt");
                push("_img.cue");
                push(".img_EdcEcc.txt");
                push(".img_EccEdc.txt");
                push("_mainError.txt");
                push("_mainInfo.txt");
                push("_sub.txt");
                push("_subError.txt");
                push("_subInfo.txt");
                push("_subIntention.txt");
                push("_subReadable.txt");
                push("_suppl.dat");
                push("_volDesc.txt");
            }
            Some(m) if m.is_dvd_family() => {
                push("_cmd.txt");
                push("_CSSKey.txt");
                push(".dat");
                push(".toc");
                push("_disc.txt");
                push("_drive.txt");
                push("_mainError.txt");
                push("_mainInfo.txt");
                push("_suppl.dat");
                push("_volDesc.txt");
                push("_DMI.bin");
                push("_PFI.bin");
                push("_PIC.bin");
                push("_SS.bin");
            }
            Some(MediaType::Floppy) | Some(MediaType::HardDisk) => {
                push("_cmd.txt");
                push(".dat");
                push("_disc.txt");
            }
            _ => {}
        }

        if let Some((command_file, _)) = command_file_path_and_version(base_path) {
            paths.push(command_file);
        }
        paths
    }

    /// Required output files that are absent after a dump, empty when
    /// the dump looks complete
    pub fn missing_output_files(&self, base_path: &str, platform: Platform) -> Vec<String> {
        let exists = |suffix: &str| Path::new(&format!("{base_path}{suffix}")).is_file();
        let mut missing = Vec::new();
        let require = |primary: &str, alternates: &[&str], missing: &mut Vec<String>| {
            if !exists(primary) && !alternates.iter().any(|a| exists(a)) {
                missing.push(format!("{base_path}{primary}"));
            }
        };

        match self.media_type() {
            Some(m) if m.is_cd_family() => {
                require(".cue", &[], &mut missing);
                require(".img", &[".imgtmp"], &mut missing);
                if !platform.is_audio() {
                    require(".scm", &[".scmtmp"], &mut missing);
                }
                // GD-ROM HD areas don't produce a ccd
                if m != MediaType::Gd {
                    require(".ccd", &[], &mut missing);
                }
                require(".dat", &[], &mut missing);
                require(".sub", &[".subtmp"], &mut missing);
                require("_disc.txt", &[], &mut missing);
                require("_drive.txt", &[], &mut missing);
                require("_img.cue", &[], &mut missing);
                require("_mainError.txt", &[], &mut missing);
                require("_mainInfo.txt", &[], &mut missing);
                require("_subError.txt", &[], &mut missing);
                require("_subInfo.txt", &[], &mut missing);
                require("_subReadable.txt", &["_sub.txt"], &mut missing);
                require("_volDesc.txt", &[], &mut missing);
                if !platform.is_audio() {
                    require(".img_EdcEcc.txt", &[".img_EccEdc.txt"], &mut missing);
                }
            }
            Some(m) if m.is_dvd_family() => {
                require(".dat", &[], &mut missing);
                require("_disc.txt", &[], &mut missing);
                require("_drive.txt", &[], &mut missing);
                require("_mainError.txt", &[], &mut missing);
                require("_mainInfo.txt", &[], &mut missing);
                require("_volDesc.txt", &[], &mut missing);
            }
            Some(MediaType::Floppy) | Some(MediaType::HardDisk) => {
                require(".dat", &[], &mut missing);
                require("_disc.txt", &[], &mut missing);
            }
            _ => {}
        }
        missing
    }
}

/// Locate the timestamped command echo file next to the image and pull
/// the tool version (a yyyymmdd stamp) out of its name
pub fn command_file_path_and_version(base_path: &str) -> Option<(PathBuf, String)> {
    let base = Path::new(base_path);
    let file_name = base.file_name()?.to_str()?;
    let parent = base.parent().filter(|p| !p.as_os_str().is_empty())?;

    let pattern = format!(r"{}_(\d{{8}})T\d{{6}}\.txt$", regex::escape(file_name));
    let matcher = Regex::new(&pattern).ok()?;

    let entries = fs::read_dir(parent).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        if let Some(caps) = matcher.captures(name) {
            let version = caps[1].to_string();
            return Some((path, version));
        }
    }
    None
}

impl ToolParams for DicParams {
    fn from_fields(
        platform: Platform,
        media: MediaType,
        drive_id: &str,
        filename: &str,
        speed: Option<i32>,
        config: &Config,
    ) -> Self {
        let mut params = DicParams {
            drive_id: Some(drive_id.to_string()),
            filename: Some(filename.to_string()),
            speed,
            ..Default::default()
        };
        params.set_base_command(platform, media);
        if params.command.is_none() {
            debug!(?platform, ?media, "unsupported platform/media combination");
            return params;
        }

        if config.quiet_mode {
            params.flags.set(DicFlag::DisableBeep, true);
        }

        params.c2_values[0] = match config.reread_count {
            -1 => None,
            0 => Some(20),
            n => Some(n),
        };
        params.dvd_reread_value = match config.dvd_reread_count {
            -1 => None,
            0 => Some(10),
            n => Some(n),
        };

        match media {
            MediaType::Cd => {
                params.flags.set(DicFlag::C2Opcode, true);
                params
                    .flags
                    .set(DicFlag::MultiSectorRead, config.multi_sector_read);
                if config.multi_sector_read {
                    params.multi_sector_read_value = Some(config.multi_sector_read_value);
                }

                match platform {
                    Platform::AppleMacintosh | Platform::IbmPcCompatible => {
                        params.flags.set(DicFlag::NoFixSubQSecuRom, true);
                        params.flags.set(DicFlag::ScanFileProtect, true);
                        params
                            .flags
                            .set(DicFlag::ScanSectorProtect, config.paranoid_mode);
                        params
                            .flags
                            .set(DicFlag::SubchannelReadLevel, config.paranoid_mode);
                        if config.paranoid_mode {
                            params.subchannel_read_level_value = Some(2);
                        }
                    }
                    Platform::AtariJaguarCd => {
                        params.flags.set(DicFlag::AtariJaguar, true);
                    }
                    Platform::HasbroVideoNow
                    | Platform::HasbroVideoNowColor
                    | Platform::HasbroVideoNowJr
                    | Platform::HasbroVideoNowXp => {
                        // Placeholder offset; the first run reports the
                        // real one
                        params.flags.set(DicFlag::AddOffset, true);
                        params.add_offset_value = Some(0);
                    }
                    Platform::SonyPlayStation => {
                        params.flags.set(DicFlag::ScanAntiMod, true);
                        params.flags.set(DicFlag::NoFixSubQLibCrypt, true);
                    }
                    _ => {}
                }
            }
            MediaType::Dvd => {
                params
                    .flags
                    .set(DicFlag::CopyrightManagementInformation, config.use_cmi_flag);
                params
                    .flags
                    .set(DicFlag::ScanFileProtect, config.paranoid_mode);
                params.flags.set(DicFlag::DvdReread, true);
            }
            MediaType::Gd => {
                params.flags.set(DicFlag::C2Opcode, true);
            }
            MediaType::HdDvd => {
                params
                    .flags
                    .set(DicFlag::CopyrightManagementInformation, config.use_cmi_flag);
                params.flags.set(DicFlag::DvdReread, true);
            }
            MediaType::BluRay => {
                params.flags.set(DicFlag::DvdReread, true);
            }
            MediaType::GameCubeDisc | MediaType::WiiDisc => {
                params.flags.set(DicFlag::Raw, true);
            }
            MediaType::Floppy | MediaType::HardDisk | MediaType::DataCartridge => {}
        }

        params
    }

    fn from_command_line(raw: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(raw);
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        let command = DicCommand::from_token(&tokens[0])
            .ok_or_else(|| ParseError::UnknownCommand(tokens[0].clone()))?;

        let mut params = DicParams {
            command: Some(command),
            ..Default::default()
        };
        if let Some(start) = params.parse_positional(&tokens)? {
            params.parse_flags(&tokens, start)?;
        }
        Ok(params)
    }

    fn to_command_line(&self) -> Result<String, SerializeError> {
        let command = self.command.ok_or(SerializeError::CommandUnset)?;
        let mut parts = vec![command.token().to_string()];

        if command.takes_drive_id() {
            let drive = self
                .drive_id
                .as_ref()
                .ok_or(SerializeError::MissingField("drive"))?;
            parts.push(drive.clone());
        }
        if command.takes_filename() {
            let filename = self
                .filename
                .as_ref()
                .ok_or(SerializeError::MissingField("filename"))?;
            parts.push(format!("\"{}\"", filename.trim_matches('"')));
        }
        if command == DicCommand::Merge {
            let optiarc = self
                .optiarc_filename
                .as_ref()
                .ok_or(SerializeError::MissingField("optiarc filename"))?;
            parts.push(format!("\"{}\"", optiarc.trim_matches('"')));
        }
        if command.takes_speed() {
            let speed = self.speed.ok_or(SerializeError::MissingField("speed"))?;
            if !(0..=command.speed_bound()).contains(&speed) {
                return Err(SerializeError::OutOfBounds {
                    flag: "speed",
                    value: speed as i64,
                });
            }
            parts.push(speed.to_string());
        }
        if command.takes_lba_range() {
            match (self.start_lba, self.end_lba) {
                (Some(start), Some(end)) => {
                    parts.push(start.to_string());
                    parts.push(end.to_string());
                }
                _ => return Err(SerializeError::MissingField("LBA range")),
            }
        }

        for &flag in SERIALIZE_ORDER {
            self.emit_flag(flag, command, &mut parts)?;
        }

        Ok(parts.join(" "))
    }

    fn is_dump_command(&self) -> bool {
        matches!(
            self.command,
            Some(
                DicCommand::Audio
                    | DicCommand::BluRay
                    | DicCommand::CompactDisc
                    | DicCommand::Data
                    | DicCommand::DigitalVideoDisc
                    | DicCommand::Disk
                    | DicCommand::Floppy
                    | DicCommand::GdRom
                    | DicCommand::Sacd
                    | DicCommand::Swap
                    | DicCommand::Tape
                    | DicCommand::Xbox
                    | DicCommand::XboxSwap
                    | DicCommand::Xgd2Swap
                    | DicCommand::Xgd3Swap
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> DicParams {
        DicParams::from_command_line(line).expect("line should parse")
    }

    #[test]
    fn cd_round_trip() {
        let params = parse("cd D \"disc image\" 24 /c2 20 /np");
        assert_eq!(params.command, Some(DicCommand::CompactDisc));
        assert_eq!(params.drive_id.as_deref(), Some("D"));
        assert_eq!(params.filename.as_deref(), Some("disc image"));
        assert_eq!(params.speed, Some(24));
        assert!(params.flags.is_on(DicFlag::C2Opcode));
        assert_eq!(params.c2_values[0], Some(20));
        assert!(params.flags.is_on(DicFlag::NoFixSubP));

        let line = params.to_command_line().unwrap();
        assert_eq!(line, "cd D \"disc image\" 24 /c2 20 /np");
    }

    #[test]
    fn unknown_tokens_are_tolerated() {
        let params = parse("cd D: \"image\" 24 UNKNOWNTOKEN /c2 4000 0 0");
        assert!(params.flags.is_on(DicFlag::C2Opcode));
        assert_eq!(params.c2_values[0], Some(4000));
        assert_eq!(params.c2_values[1], Some(0));
        assert_eq!(params.c2_values[2], Some(0));
    }

    #[test]
    fn unknown_command_fails() {
        let err = DicParams::from_command_line("rip D \"image\" 24").unwrap_err();
        assert_eq!(err, ParseError::UnknownCommand("rip".to_string()));
    }

    #[test]
    fn audio_requires_lba_pair() {
        let err = DicParams::from_command_line("audio D \"image\" 24").unwrap_err();
        assert_eq!(err, ParseError::TokenCount("audio"));

        let params = parse("audio D \"image\" 24 0 15000");
        assert_eq!(params.start_lba, Some(0));
        assert_eq!(params.end_lba, Some(15000));
    }

    #[test]
    fn speed_bounds_per_command() {
        assert!(DicParams::from_command_line("cd D \"image\" 73").is_err());
        assert!(DicParams::from_command_line("dvd D \"image\" 25").is_err());
        assert!(DicParams::from_command_line("dvd D \"image\" 24").is_ok());
        assert!(DicParams::from_command_line("sacd D \"image\" 17").is_err());
        assert!(DicParams::from_command_line("sacd D \"image\" 16").is_ok());
    }

    #[test]
    fn filename_cannot_be_flag_token() {
        let err = DicParams::from_command_line("cd D /c2 24").unwrap_err();
        assert_eq!(err, ParseError::FilenameIsFlag("/c2".to_string()));
    }

    #[test]
    fn bad_c2_value_fails_whole_parse() {
        let err = DicParams::from_command_line("cd D \"image\" 24 /c2 twenty").unwrap_err();
        assert!(matches!(err, ParseError::FlagValue { flag: "/c2", .. }));
    }

    #[test]
    fn bad_skip_sector_value_drops_flag_only() {
        let params = parse("dvd D \"image\" 16 /sk junk /rr");
        assert!(!params.flags.is_on(DicFlag::SkipSector));
        assert!(params.flags.is_on(DicFlag::DvdReread));
    }

    #[test]
    fn unsupported_flag_is_ignored() {
        // /raw is a dvd-only flag
        let params = parse("cd D \"image\" 24 /raw");
        assert!(!params.flags.is_on(DicFlag::Raw));
    }

    #[test]
    fn dvd_reverse_requires_range() {
        let err = DicParams::from_command_line("dvd D \"image\" 16 /r").unwrap_err();
        assert!(matches!(err, ParseError::FlagValue { flag: "/r", .. }));

        let params = parse("dvd D \"image\" 16 /r 0 100000");
        assert_eq!(params.reverse_start_lba, Some(0));
        assert_eq!(params.reverse_end_lba, Some(100000));

        // Other commands take /r bare
        let params = parse("data D \"image\" 24 0 100 /r");
        assert!(params.flags.is_on(DicFlag::Reverse));
    }

    #[test]
    fn serialize_fails_closed_on_bad_values() {
        let mut params = parse("cd D \"image\" 24");
        params.flags.set(DicFlag::SubchannelReadLevel, true);
        params.subchannel_read_level_value = Some(3);
        assert!(matches!(
            params.to_command_line(),
            Err(SerializeError::OutOfBounds { flag: "/s", .. })
        ));

        params.subchannel_read_level_value = Some(2);
        let line = params.to_command_line().unwrap();
        assert!(line.ends_with("/s 2"));
    }

    #[test]
    fn serialize_rejects_out_of_bounds_speed() {
        let params = DicParams::from_fields(
            Platform::IbmPcCompatible,
            MediaType::Cd,
            "D",
            "disc",
            Some(-1),
            &Config::default(),
        );
        assert_eq!(
            params.to_command_line(),
            Err(SerializeError::OutOfBounds {
                flag: "speed",
                value: -1,
            })
        );

        let mut params = parse("dvd D \"disc\" 16 /rr");
        params.speed = Some(25);
        assert!(matches!(
            params.to_command_line(),
            Err(SerializeError::OutOfBounds { flag: "speed", .. })
        ));
        params.speed = Some(24);
        assert!(params.to_command_line().is_ok());
    }

    #[test]
    fn serialize_requires_positionals() {
        let params = DicParams {
            command: Some(DicCommand::CompactDisc),
            drive_id: Some("D".to_string()),
            ..Default::default()
        };
        assert_eq!(
            params.to_command_line(),
            Err(SerializeError::MissingField("filename"))
        );
    }

    #[test]
    fn d8_suppresses_be() {
        let mut params = parse("cd D \"image\" 24");
        params.flags.set(DicFlag::BeOpcode, true);
        params.flags.set(DicFlag::D8Opcode, true);
        let line = params.to_command_line().unwrap();
        assert!(!line.contains("/be"));
        assert!(line.contains("/d8"));
    }

    #[test]
    fn c2_rescue_range_validation() {
        let mut params = parse("cd D \"image\" 24 /c2");
        params.c2_values = [Some(20), Some(0), Some(1), Some(100), Some(200)];
        let line = params.to_command_line().unwrap();
        assert!(line.contains("/c2 20 0 1 100 200"));

        params.c2_values[3] = Some(0);
        assert!(matches!(
            params.to_command_line(),
            Err(SerializeError::OutOfBounds { flag: "/c2", .. })
        ));

        params.c2_values[2] = Some(2);
        assert!(params.to_command_line().is_err());
    }

    #[test]
    fn defaults_for_playstation_cd() {
        let config = Config::default();
        let params = DicParams::from_fields(
            Platform::SonyPlayStation,
            MediaType::Cd,
            "E",
            "image.bin",
            Some(24),
            &config,
        );
        assert_eq!(params.command, Some(DicCommand::CompactDisc));
        assert!(params.flags.is_on(DicFlag::C2Opcode));
        assert_eq!(params.c2_values[0], Some(20));
        assert!(params.flags.is_on(DicFlag::ScanAntiMod));
        assert!(params.flags.is_on(DicFlag::NoFixSubQLibCrypt));
    }

    #[test]
    fn defaults_for_pc_paranoid() {
        let config = Config {
            paranoid_mode: true,
            reread_count: 1000,
            ..Config::default()
        };
        let params = DicParams::from_fields(
            Platform::IbmPcCompatible,
            MediaType::Cd,
            "D",
            "image",
            Some(8),
            &config,
        );
        assert!(params.flags.is_on(DicFlag::NoFixSubQSecuRom));
        assert!(params.flags.is_on(DicFlag::ScanFileProtect));
        assert!(params.flags.is_on(DicFlag::ScanSectorProtect));
        assert_eq!(params.subchannel_read_level_value, Some(2));
        assert_eq!(params.c2_values[0], Some(1000));
    }

    #[test]
    fn invalid_combination_leaves_command_unset() {
        let params = DicParams::from_fields(
            Platform::SonyPlayStation,
            MediaType::Dvd,
            "D",
            "image",
            Some(16),
            &Config::default(),
        );
        assert_eq!(params.command, None);
        assert!(params.to_command_line().is_err());
    }

    #[test]
    fn xbox_from_fields() {
        let params = DicParams::from_fields(
            Platform::MicrosoftXbox,
            MediaType::Dvd,
            "F",
            "xgd",
            Some(16),
            &Config::default(),
        );
        assert_eq!(params.command, Some(DicCommand::Xbox));
        assert!(params.flags.is_on(DicFlag::DvdReread));
    }

    #[test]
    fn data_cartridge_maps_to_tape() {
        let params = DicParams::from_fields(
            Platform::Other,
            MediaType::DataCartridge,
            "D",
            "backup",
            None,
            &Config::default(),
        );
        assert_eq!(params.command, Some(DicCommand::Tape));
        assert!(params.is_dump_command());
        // tape takes only the filename positional
        assert_eq!(params.to_command_line().unwrap(), "tape \"backup\"");
    }

    #[test]
    fn version_command_is_exact() {
        let params = parse("/v");
        assert_eq!(params.command, Some(DicCommand::Version));
        assert!(!params.is_dump_command());
        assert!(DicParams::from_command_line("/v extra").is_err());
    }

    #[test]
    fn swap_commands_validate_trailing_sectors() {
        assert!(DicParams::from_command_line("xgd2swap D \"image\" 4 123456 654321").is_ok());
        assert!(DicParams::from_command_line("xgd2swap D \"image\" 4 123456 abc").is_err());
    }

    #[test]
    fn support_matrix_is_reflexive() {
        // Every supported flag must map back to a token the parser
        // recognizes for that command
        let commands = [
            DicCommand::Audio,
            DicCommand::BluRay,
            DicCommand::CompactDisc,
            DicCommand::Data,
            DicCommand::DigitalVideoDisc,
            DicCommand::GdRom,
            DicCommand::Sacd,
            DicCommand::Swap,
            DicCommand::Xbox,
        ];
        for command in commands {
            for &flag in command.supported_flags() {
                assert_eq!(DicFlag::from_token(flag.token()), Some(flag));
            }
        }
    }
}

//! Command-line grammar for redumper.
//!
//! Unlike DiscImageCreator the grammar is keyword-driven: one command
//! token followed by `--flag` or `--flag=value` options in any order.
//! Every real command accepts the same option set, so the support table
//! only distinguishes the bare help invocation.

use tracing::debug;

use super::{tokenize, FlagMap, ParseError, SerializeError, ToolParams};
use crate::config::Config;
use crate::media::{MediaType, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedumperCommand {
    Cd,
    Dump,
    Info,
    Protection,
    Refine,
    Split,
    /// `--help` / `-h` in command position
    Help,
}

impl RedumperCommand {
    pub fn token(&self) -> &'static str {
        match self {
            RedumperCommand::Cd => "cd",
            RedumperCommand::Dump => "dump",
            RedumperCommand::Info => "info",
            RedumperCommand::Protection => "protection",
            RedumperCommand::Refine => "refine",
            RedumperCommand::Split => "split",
            RedumperCommand::Help => "--help",
        }
    }

    pub fn from_token(token: &str) -> Option<RedumperCommand> {
        match token {
            "cd" => Some(RedumperCommand::Cd),
            "dump" => Some(RedumperCommand::Dump),
            "info" => Some(RedumperCommand::Info),
            "protection" => Some(RedumperCommand::Protection),
            "refine" => Some(RedumperCommand::Refine),
            "split" => Some(RedumperCommand::Split),
            "--help" | "-h" => Some(RedumperCommand::Help),
            _ => None,
        }
    }

    fn accepts_options(&self) -> bool {
        !matches!(self, RedumperCommand::Help)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedumperFlag {
    AudioSilenceThreshold,
    CdiCorrectOffset,
    CdiReadyNormalize,
    DescrambleNew,
    Drive,
    ForceOffset,
    ForceQToc,
    ForceSplit,
    ForceToc,
    Iso9660Trim,
    ImageName,
    ImagePath,
    LeaveUnchanged,
    Overwrite,
    RefineSubchannel,
    Retries,
    RingSize,
    Skip,
    SkipFill,
    SkipLeadIn,
    SkipSize,
    Speed,
    StopLba,
    Unsupported,
    Verbose,
}

impl RedumperFlag {
    pub fn token(&self) -> &'static str {
        match self {
            RedumperFlag::AudioSilenceThreshold => "--audio-silence-threshold",
            RedumperFlag::CdiCorrectOffset => "--cdi-correct-offset",
            RedumperFlag::CdiReadyNormalize => "--cdi-ready-normalize",
            RedumperFlag::DescrambleNew => "--descramble-new",
            RedumperFlag::Drive => "--drive",
            RedumperFlag::ForceOffset => "--force-offset",
            RedumperFlag::ForceQToc => "--force-qtoc",
            RedumperFlag::ForceSplit => "--force-split",
            RedumperFlag::ForceToc => "--force-toc",
            RedumperFlag::Iso9660Trim => "--iso9660-trim",
            RedumperFlag::ImageName => "--image-name",
            RedumperFlag::ImagePath => "--image-path",
            RedumperFlag::LeaveUnchanged => "--leave-unchanged",
            RedumperFlag::Overwrite => "--overwrite",
            RedumperFlag::RefineSubchannel => "--refine-subchannel",
            RedumperFlag::Retries => "--retries",
            RedumperFlag::RingSize => "--ring-size",
            RedumperFlag::Skip => "--skip",
            RedumperFlag::SkipFill => "--skip-fill",
            RedumperFlag::SkipLeadIn => "--skip-lead-in",
            RedumperFlag::SkipSize => "--skip-size",
            RedumperFlag::Speed => "--speed",
            RedumperFlag::StopLba => "--stop-lba",
            RedumperFlag::Unsupported => "--unsupported",
            RedumperFlag::Verbose => "--verbose",
        }
    }

    pub fn from_token(token: &str) -> Option<RedumperFlag> {
        match token {
            "--audio-silence-threshold" => Some(RedumperFlag::AudioSilenceThreshold),
            "--cdi-correct-offset" => Some(RedumperFlag::CdiCorrectOffset),
            "--cdi-ready-normalize" => Some(RedumperFlag::CdiReadyNormalize),
            "--descramble-new" => Some(RedumperFlag::DescrambleNew),
            "--drive" => Some(RedumperFlag::Drive),
            "--force-offset" => Some(RedumperFlag::ForceOffset),
            "--force-qtoc" => Some(RedumperFlag::ForceQToc),
            "--force-split" => Some(RedumperFlag::ForceSplit),
            "--force-toc" => Some(RedumperFlag::ForceToc),
            "--iso9660-trim" => Some(RedumperFlag::Iso9660Trim),
            "--image-name" => Some(RedumperFlag::ImageName),
            "--image-path" => Some(RedumperFlag::ImagePath),
            "--leave-unchanged" => Some(RedumperFlag::LeaveUnchanged),
            "--overwrite" => Some(RedumperFlag::Overwrite),
            "--refine-subchannel" => Some(RedumperFlag::RefineSubchannel),
            "--retries" => Some(RedumperFlag::Retries),
            "--ring-size" => Some(RedumperFlag::RingSize),
            "--skip" => Some(RedumperFlag::Skip),
            "--skip-fill" => Some(RedumperFlag::SkipFill),
            "--skip-lead-in" => Some(RedumperFlag::SkipLeadIn),
            "--skip-size" => Some(RedumperFlag::SkipSize),
            "--speed" => Some(RedumperFlag::Speed),
            "--stop-lba" => Some(RedumperFlag::StopLba),
            "--unsupported" => Some(RedumperFlag::Unsupported),
            "--verbose" => Some(RedumperFlag::Verbose),
            _ => None,
        }
    }
}

/// Emission order for serialization
const SERIALIZE_ORDER: &[RedumperFlag] = &[
    RedumperFlag::AudioSilenceThreshold,
    RedumperFlag::CdiCorrectOffset,
    RedumperFlag::CdiReadyNormalize,
    RedumperFlag::DescrambleNew,
    RedumperFlag::Drive,
    RedumperFlag::ForceOffset,
    RedumperFlag::ForceQToc,
    RedumperFlag::ForceSplit,
    RedumperFlag::ForceToc,
    RedumperFlag::Iso9660Trim,
    RedumperFlag::ImageName,
    RedumperFlag::ImagePath,
    RedumperFlag::LeaveUnchanged,
    RedumperFlag::Overwrite,
    RedumperFlag::RefineSubchannel,
    RedumperFlag::Retries,
    RedumperFlag::RingSize,
    RedumperFlag::Skip,
    RedumperFlag::SkipFill,
    RedumperFlag::SkipLeadIn,
    RedumperFlag::SkipSize,
    RedumperFlag::Speed,
    RedumperFlag::StopLba,
    RedumperFlag::Unsupported,
    RedumperFlag::Verbose,
];

/// Full parameter state for a redumper invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedumperParams {
    pub command: Option<RedumperCommand>,
    pub flags: FlagMap<RedumperFlag>,

    pub audio_silence_threshold_value: Option<i32>,
    pub drive_value: Option<String>,
    pub force_offset_value: Option<i32>,
    pub image_name_value: Option<String>,
    pub image_path_value: Option<String>,
    pub retries_value: Option<i32>,
    pub ring_size_value: Option<i32>,
    /// LBA ranges of sectors to skip, passed through verbatim
    pub skip_value: Option<String>,
    /// Fill byte for skipped sectors, rendered as lowercase hex
    pub skip_fill_value: Option<u8>,
    pub skip_size_value: Option<i32>,
    pub speed_value: Option<i32>,
    pub stop_lba_value: Option<i32>,
}

impl RedumperParams {
    fn flag_usable(&self, _flag: RedumperFlag) -> bool {
        matches!(self.command, Some(c) if c.accepts_options())
    }

    fn set(&mut self, flag: RedumperFlag, value: bool) {
        self.flags.set(flag, value);
    }

    /// Value for `--flag=value` or `--flag value`. The inline form is
    /// what the tool itself generates; the split form appears in
    /// hand-written lines.
    fn flag_value<'a>(
        &self,
        inline: Option<&'a str>,
        tokens: &'a [String],
        i: &mut usize,
    ) -> Option<&'a str> {
        if let Some(v) = inline {
            return Some(v);
        }
        let next = tokens.get(*i + 1)?;
        if next.starts_with("--") {
            return None;
        }
        *i += 1;
        Some(next.as_str())
    }

    fn emit_flag(&self, flag: RedumperFlag, parts: &mut Vec<String>) -> Result<(), SerializeError> {
        if !self.flag_usable(flag) || !self.flags.is_on(flag) {
            return Ok(());
        }
        let token = flag.token();
        let require_min =
            |value: Option<i32>, min: i32, field: &'static str| -> Result<i32, SerializeError> {
                match value {
                    Some(v) if v >= min => Ok(v),
                    Some(v) => Err(SerializeError::OutOfBounds {
                        flag: token,
                        value: v as i64,
                    }),
                    None => Err(SerializeError::MissingField(field)),
                }
            };

        match flag {
            RedumperFlag::AudioSilenceThreshold => {
                let v = require_min(self.audio_silence_threshold_value, 0, "silence threshold")?;
                parts.push(format!("{token}={v}"));
            }
            RedumperFlag::Drive => {
                let v = self
                    .drive_value
                    .as_ref()
                    .ok_or(SerializeError::MissingField("drive"))?;
                parts.push(format!("{token}={v}"));
            }
            RedumperFlag::ForceOffset => {
                let v = self
                    .force_offset_value
                    .ok_or(SerializeError::MissingField("force offset"))?;
                parts.push(format!("{token}={v}"));
            }
            RedumperFlag::ImageName => {
                let v = self
                    .image_name_value
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(SerializeError::MissingField("image name"))?;
                parts.push(format!("{token}={v}"));
            }
            RedumperFlag::ImagePath => {
                let v = self
                    .image_path_value
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(SerializeError::MissingField("image path"))?;
                parts.push(format!("{token}={v}"));
            }
            RedumperFlag::Retries => {
                let v = require_min(self.retries_value, 0, "retries")?;
                parts.push(format!("{token}={v}"));
            }
            RedumperFlag::RingSize => {
                let v = require_min(self.ring_size_value, 0, "ring size")?;
                parts.push(format!("{token}={v}"));
            }
            RedumperFlag::Skip => {
                let v = self
                    .skip_value
                    .as_ref()
                    .ok_or(SerializeError::MissingField("skip ranges"))?;
                parts.push(format!("{token}={v}"));
            }
            RedumperFlag::SkipFill => {
                let v = self
                    .skip_fill_value
                    .ok_or(SerializeError::MissingField("skip fill byte"))?;
                parts.push(format!("{token}={v:x}"));
            }
            RedumperFlag::SkipSize => {
                let v = require_min(self.skip_size_value, 0, "skip size")?;
                parts.push(format!("{token}={v}"));
            }
            RedumperFlag::Speed => {
                let v = require_min(self.speed_value, 1, "speed")?;
                parts.push(format!("{token}={v}"));
            }
            RedumperFlag::StopLba => {
                let v = self
                    .stop_lba_value
                    .ok_or(SerializeError::MissingField("stop LBA"))?;
                parts.push(format!("{token}={v}"));
            }
            _ => parts.push(token.to_string()),
        }
        Ok(())
    }

    fn apply_flag(
        &mut self,
        flag: RedumperFlag,
        inline: Option<&str>,
        tokens: &[String],
        i: &mut usize,
    ) -> Result<(), ParseError> {
        // Negative values on these would make the tool bail out
        // immediately, so reject them here
        let check_min = |value: i32, min: i32, raw: &str| -> Result<i32, ParseError> {
            if value < min {
                Err(ParseError::FlagValue {
                    flag: flag.token(),
                    value: raw.to_string(),
                })
            } else {
                Ok(value)
            }
        };

        self.set(flag, true);
        match flag {
            RedumperFlag::AudioSilenceThreshold => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    if let Ok(v) = raw.parse() {
                        self.audio_silence_threshold_value = Some(check_min(v, 0, raw)?);
                    }
                }
            }
            RedumperFlag::Drive => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    self.drive_value = Some(raw.to_string());
                }
            }
            RedumperFlag::ForceOffset => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    if let Ok(v) = raw.parse() {
                        self.force_offset_value = Some(v);
                    }
                }
            }
            RedumperFlag::ImageName => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    self.image_name_value = Some(raw.trim_matches('"').to_string());
                }
            }
            RedumperFlag::ImagePath => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    self.image_path_value = Some(raw.trim_matches('"').to_string());
                }
            }
            RedumperFlag::Retries => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    if let Ok(v) = raw.parse() {
                        self.retries_value = Some(check_min(v, 0, raw)?);
                    }
                }
            }
            RedumperFlag::RingSize => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    if let Ok(v) = raw.parse() {
                        self.ring_size_value = Some(check_min(v, 0, raw)?);
                    }
                }
            }
            RedumperFlag::Skip => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    self.skip_value = Some(raw.to_string());
                }
            }
            RedumperFlag::SkipFill => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    if let Ok(v) = u8::from_str_radix(raw.trim_start_matches("0x"), 16) {
                        self.skip_fill_value = Some(v);
                    }
                }
            }
            RedumperFlag::SkipSize => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    if let Ok(v) = raw.parse() {
                        self.skip_size_value = Some(check_min(v, 0, raw)?);
                    }
                }
            }
            RedumperFlag::Speed => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    if let Ok(v) = raw.parse() {
                        self.speed_value = Some(check_min(v, 1, raw)?);
                    }
                }
            }
            RedumperFlag::StopLba => {
                if let Some(raw) = self.flag_value(inline, tokens, i) {
                    if let Ok(v) = raw.parse() {
                        self.stop_lba_value = Some(v);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl ToolParams for RedumperParams {
    fn from_fields(
        platform: Platform,
        media: MediaType,
        drive_id: &str,
        filename: &str,
        speed: Option<i32>,
        config: &Config,
    ) -> Self {
        let mut params = RedumperParams::default();
        if !platform.supports(media) {
            debug!(?platform, ?media, "unsupported platform/media combination");
            return params;
        }

        params.command = if media.is_cd_family() {
            Some(RedumperCommand::Cd)
        } else if media.is_optical() {
            Some(RedumperCommand::Dump)
        } else {
            None
        };
        if params.command.is_none() {
            return params;
        }

        params.set(RedumperFlag::Drive, true);
        params.drive_value = Some(drive_id.to_string());

        if !filename.is_empty() {
            params.set(RedumperFlag::ImageName, true);
            params.image_name_value = Some(filename.to_string());
        }

        if let Some(speed) = speed.filter(|s| *s >= 1) {
            params.set(RedumperFlag::Speed, true);
            params.speed_value = Some(speed);
        }

        if config.redumper_retries > 0 {
            params.set(RedumperFlag::Retries, true);
            params.retries_value = Some(config.redumper_retries);
        }

        params
    }

    fn from_command_line(raw: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(raw);
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        let command = RedumperCommand::from_token(&tokens[0])
            .ok_or_else(|| ParseError::UnknownCommand(tokens[0].clone()))?;

        let mut params = RedumperParams {
            command: Some(command),
            ..Default::default()
        };

        let mut i = 1;
        while i < tokens.len() {
            let token = tokens[i].as_str();
            let (head, inline) = match token.split_once('=') {
                Some((head, value)) => (head, Some(value)),
                None => (token, None),
            };
            match RedumperFlag::from_token(head) {
                Some(flag) if params.flag_usable(flag) => {
                    params.apply_flag(flag, inline, &tokens, &mut i)?;
                }
                _ => {
                    debug!(token, "skipping unrecognized token");
                }
            }
            i += 1;
        }
        Ok(params)
    }

    fn to_command_line(&self) -> Result<String, SerializeError> {
        let command = self.command.ok_or(SerializeError::CommandUnset)?;
        let mut parts = vec![command.token().to_string()];
        for &flag in SERIALIZE_ORDER {
            self.emit_flag(flag, &mut parts)?;
        }
        Ok(parts.join(" "))
    }

    fn is_dump_command(&self) -> bool {
        matches!(
            self.command,
            Some(RedumperCommand::Cd | RedumperCommand::Dump)
        )
    }
}

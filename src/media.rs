use serde::{Deserialize, Serialize};

/// Physical media families understood by the dumping tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Cd,
    Gd,
    Dvd,
    HdDvd,
    BluRay,
    GameCubeDisc,
    WiiDisc,
    Floppy,
    HardDisk,
    DataCartridge,
}

impl MediaType {
    /// CD-class media share the CloneCD-style output set
    pub fn is_cd_family(&self) -> bool {
        matches!(self, MediaType::Cd | MediaType::Gd)
    }

    /// DVD-class media share the ISO-style output set
    pub fn is_dvd_family(&self) -> bool {
        matches!(
            self,
            MediaType::Dvd
                | MediaType::HdDvd
                | MediaType::BluRay
                | MediaType::GameCubeDisc
                | MediaType::WiiDisc
        )
    }

    pub fn is_optical(&self) -> bool {
        self.is_cd_family() || self.is_dvd_family()
    }
}

/// Platform identifier used for defaulting policy and submission assembly.
///
/// `Other` covers platforms with no special handling; they contribute no
/// extra fields beyond the generic media-type-level ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    AppleMacintosh,
    AtariJaguarCd,
    EnhancedCd,
    HasbroVideoNow,
    HasbroVideoNowColor,
    HasbroVideoNowJr,
    HasbroVideoNowXp,
    IbmPcCompatible,
    KonamiPython2,
    MicrosoftXbox,
    MicrosoftXbox360,
    SegaChihiro,
    SegaDreamcast,
    SegaMegaCd,
    SegaNaomi,
    SegaNaomi2,
    SegaSaturn,
    SegaTriforce,
    SonyPlayStation,
    SonyPlayStation2,
    SonyPlayStation3,
    SonyPlayStation4,
    SonyPlayStation5,
    SuperAudioCd,
    DvdVideo,
    Other,
}

impl Platform {
    /// Media types a platform can legally be dumped from.
    ///
    /// Used by the defaulting path: a platform/media combination outside
    /// this set leaves the command unset instead of failing.
    pub fn media_types(&self) -> &'static [MediaType] {
        match self {
            Platform::AppleMacintosh | Platform::IbmPcCompatible => &[
                MediaType::Cd,
                MediaType::Dvd,
                MediaType::HdDvd,
                MediaType::BluRay,
                MediaType::Floppy,
                MediaType::HardDisk,
            ],
            Platform::AtariJaguarCd
            | Platform::EnhancedCd
            | Platform::HasbroVideoNow
            | Platform::HasbroVideoNowColor
            | Platform::HasbroVideoNowJr
            | Platform::HasbroVideoNowXp
            | Platform::SegaMegaCd
            | Platform::SegaSaturn
            | Platform::SonyPlayStation
            | Platform::SuperAudioCd => &[MediaType::Cd],
            Platform::KonamiPython2 | Platform::SonyPlayStation2 => {
                &[MediaType::Cd, MediaType::Dvd]
            }
            Platform::MicrosoftXbox | Platform::MicrosoftXbox360 => &[MediaType::Dvd],
            Platform::SegaChihiro
            | Platform::SegaDreamcast
            | Platform::SegaNaomi
            | Platform::SegaNaomi2
            | Platform::SegaTriforce => &[MediaType::Cd, MediaType::Gd],
            Platform::SonyPlayStation3 | Platform::SonyPlayStation4 | Platform::SonyPlayStation5 => {
                &[MediaType::BluRay]
            }
            Platform::DvdVideo => &[MediaType::Dvd],
            Platform::Other => &[
                MediaType::Cd,
                MediaType::Gd,
                MediaType::Dvd,
                MediaType::HdDvd,
                MediaType::BluRay,
                MediaType::GameCubeDisc,
                MediaType::WiiDisc,
                MediaType::Floppy,
                MediaType::HardDisk,
                MediaType::DataCartridge,
            ],
        }
    }

    pub fn supports(&self, media: MediaType) -> bool {
        self.media_types().contains(&media)
    }

    /// Xbox-family discs carry the XGD layerbreak field instead of the
    /// generic LayerZeroSector one
    pub fn is_xgd(&self) -> bool {
        matches!(self, Platform::MicrosoftXbox | Platform::MicrosoftXbox360)
    }

    /// Audio-only platforms skip the EDC/ECC output set entirely
    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            Platform::SuperAudioCd
                | Platform::HasbroVideoNow
                | Platform::HasbroVideoNowColor
                | Platform::HasbroVideoNowJr
                | Platform::HasbroVideoNowXp
        )
    }
}

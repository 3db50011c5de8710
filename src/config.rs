/// Defaulting policy applied when building a parameter set from discrete
/// fields. Loaded by the embedding application; only the knobs that change
/// generated command lines live here.
#[derive(Clone, Debug)]
pub struct Config {
    /// Suppress the tool's completion beep (DiscImageCreator `/q`)
    pub quiet_mode: bool,
    /// Enable the slower, more thorough scan flags
    pub paranoid_mode: bool,
    /// C2 reread count for CD-class media; -1 leaves the slot unset,
    /// 0 selects the tool default of 20
    pub reread_count: i32,
    /// Reread count for DVD/HD-DVD/BD; -1 leaves it unset, 0 selects 10
    pub dvd_reread_count: i32,
    /// Enable multi-sector reads for CD-class media
    pub multi_sector_read: bool,
    /// Sector count for multi-sector reads when enabled
    pub multi_sector_read_value: i32,
    /// Log Copyright Management Information while dumping DVDs
    pub use_cmi_flag: bool,
    /// Per-sector retry count passed to redumper
    pub redumper_retries: i32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            quiet_mode: false,
            paranoid_mode: false,
            reread_count: 0,
            dvd_reread_count: 0,
            multi_sector_read: false,
            multi_sector_read_value: 50,
            use_cmi_flag: false,
            redumper_retries: 0,
        }
    }
}

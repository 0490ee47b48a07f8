/// Knobs for the repair pass
#[derive(Clone, Debug)]
pub struct Settings {
    /// Check the exception table against the stream before doing anything
    ///
    /// Catches entries pointing at labels that are never placed and ranges that end before they
    /// start. Without it, only the problems the repair itself trips over get reported.
    pub validate_table: bool,

    /// Repair independent methods on the `rayon` thread pool
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            validate_table: true,
            parallel: true,
        }
    }
}

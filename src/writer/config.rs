//! Configuration of the container writer.

/// Options controlling container generation.
///
/// # Examples
///
/// ```rust
/// use dexscope::writer::{DexWriter, WriterConfig};
///
/// let writer = DexWriter::with_config(
///     WriterConfig::new()
///         .with_dex_version(39)
///         .with_empty_annotation_set(false),
/// );
/// assert_eq!(writer.config().dex_version, 39);
/// ```
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Format version written into the magic, as three decimal digits.
    ///
    /// Default: `35`
    pub dex_version: u16,

    /// Emit an empty annotation set ahead of the other sets and reference it for parameters
    /// without annotations. When disabled such parameters get offset 0.
    ///
    /// Default: `true`
    pub empty_annotation_set: bool,

    /// Outgoing argument count above which the outs are also counted into the registers of a
    /// code item.
    ///
    /// Default: `5`
    pub max_outs_promotion: u16,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            dex_version: 35,
            empty_annotation_set: true,
            max_outs_promotion: 5,
        }
    }
}

impl WriterConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the format version.
    #[must_use]
    pub fn with_dex_version(mut self, version: u16) -> Self {
        self.dex_version = version;
        self
    }

    /// Enables or disables the leading empty annotation set.
    #[must_use]
    pub fn with_empty_annotation_set(mut self, enabled: bool) -> Self {
        self.empty_annotation_set = enabled;
        self
    }

    /// Sets the outs promotion threshold.
    #[must_use]
    pub fn with_max_outs_promotion(mut self, threshold: u16) -> Self {
        self.max_outs_promotion = threshold;
        self
    }
}

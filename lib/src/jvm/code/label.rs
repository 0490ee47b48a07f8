use std::fmt;

/// Symbolic jump target or exception table boundary, rendered as `l<n>`
///
/// Two labels are equal only if they came from the same generator call, so labels from different
/// methods must never be mixed.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct SynLabel(usize);

impl SynLabel {
    /// `l0`, where every method's label numbering begins
    pub const START: SynLabel = SynLabel(0);

    pub fn next(&self) -> SynLabel {
        SynLabel(self.0 + 1)
    }

    /// Numeric id of the label (used when rendering)
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Source of labels not yet used in a method
pub trait LabelGenerator<Label> {
    /// Generate a fresh label
    fn fresh_label(&mut self) -> Label;
}

/// Hands out `l0`, `l1`, ... in order
///
/// Each instruction stream owns one, so labels minted while inserting markers never collide with
/// labels named in the parsed listing.
#[derive(Clone, Debug)]
pub struct SynLabelGenerator(SynLabel);

impl SynLabelGenerator {
    pub fn new(start: SynLabel) -> SynLabelGenerator {
        SynLabelGenerator(start)
    }
}

impl Default for SynLabelGenerator {
    fn default() -> SynLabelGenerator {
        SynLabelGenerator::new(SynLabel::START)
    }
}

impl LabelGenerator<SynLabel> for SynLabelGenerator {
    fn fresh_label(&mut self) -> SynLabel {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

impl fmt::Debug for SynLabel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}

impl fmt::Display for SynLabel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, formatter)
    }
}

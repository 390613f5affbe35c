//! Navigation over the stage registry for the two presentation variants.

use std::fmt;
use std::str::FromStr;

use super::registry::{StepDef, STEPS};

/// How the questionnaire is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// One stage at a time with Back / Next.
    #[default]
    A,
    /// A chosen preset of stages shown together.
    B,
}

impl Variant {
    /// Derive the variant from a `variant` query value.
    ///
    /// Only a case-insensitive `"B"` selects [`Variant::B`]; anything else,
    /// including no value, is [`Variant::A`].
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("b") => Variant::B,
            _ => Variant::A,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::A => "A",
            Variant::B => "B",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Variant::from_query(Some(s)))
    }
}

/// Linear wizard pointer, always within `[0, len - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearWizard {
    index: usize,
    len: usize,
}

impl LinearWizard {
    /// A wizard over the full registry, starting at the first stage.
    pub fn new() -> Self {
        Self::at(0)
    }

    /// A wizard positioned at `index`, clamped into range.
    pub fn at(index: usize) -> Self {
        Self::with_len(index, STEPS.len())
    }

    fn with_len(index: usize, len: usize) -> Self {
        debug_assert!(len > 0);
        Self {
            index: index.min(len.saturating_sub(1)),
            len,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.len
    }

    /// The stage under the pointer.
    pub fn current(&self) -> &'static StepDef {
        &STEPS[self.index]
    }

    /// Move one stage back, stopping at the first.
    pub fn back(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Move one stage forward, stopping at the last.
    pub fn next(&mut self) {
        if !self.is_last() {
            self.index += 1;
        }
    }

    /// Pointer after a Back press, without moving this one.
    pub fn back_index(&self) -> usize {
        let mut w = *self;
        w.back();
        w.index
    }

    /// Pointer after a Next press, without moving this one.
    pub fn next_index(&self) -> usize {
        let mut w = *self;
        w.next();
        w.index
    }

    /// Label of the forward button.
    pub fn next_label(&self) -> &'static str {
        if self.is_last() {
            "Finish"
        } else {
            "Next"
        }
    }
}

impl Default for LinearWizard {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed stage subsets offered by variant B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsetPreset {
    /// Start with the problem statement.
    Problem,
    /// Jump to the small experiment.
    Experiment,
}

impl SubsetPreset {
    pub const ALL: [SubsetPreset; 2] = [SubsetPreset::Problem, SubsetPreset::Experiment];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubsetPreset::Problem => "problem",
            SubsetPreset::Experiment => "experiment",
        }
    }

    /// Button label for choosing this preset.
    pub fn label(&self) -> &'static str {
        match self {
            SubsetPreset::Problem => "Start with Problem Statement",
            SubsetPreset::Experiment => "Jump to Small Experiment",
        }
    }

    pub fn step_ids(&self) -> &'static [&'static str] {
        match self {
            SubsetPreset::Problem => &["problem", "current", "root"],
            SubsetPreset::Experiment => &["experiment", "action", "obstacles"],
        }
    }

    /// The preset's stages in registry order.
    pub fn steps(&self) -> Vec<&'static StepDef> {
        let ids = self.step_ids();
        STEPS.iter().filter(|s| ids.contains(&s.id)).collect()
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "problem" => Some(SubsetPreset::Problem),
            "experiment" => Some(SubsetPreset::Experiment),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_from_query() {
        assert_eq!(Variant::from_query(Some("B")), Variant::B);
        assert_eq!(Variant::from_query(Some("b")), Variant::B);
        assert_eq!(Variant::from_query(Some("A")), Variant::A);
        assert_eq!(Variant::from_query(Some("c")), Variant::A);
        assert_eq!(Variant::from_query(Some("")), Variant::A);
        assert_eq!(Variant::from_query(None), Variant::A);
    }

    #[test]
    fn test_variant_from_query_is_not_trimmed() {
        assert_eq!(Variant::from_query(Some(" b")), Variant::A);
        assert_eq!(Variant::from_query(Some("B ")), Variant::A);
        assert_eq!(Variant::from_query(Some("bb")), Variant::A);
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("b".parse::<Variant>().unwrap(), Variant::B);
        assert_eq!("zzz".parse::<Variant>().unwrap(), Variant::A);
    }

    #[test]
    fn test_wizard_starts_at_first_stage() {
        let wizard = LinearWizard::new();
        assert_eq!(wizard.index(), 0);
        assert!(wizard.is_first());
        assert_eq!(wizard.current().id, "problem");
        assert_eq!(wizard.len(), 10);
    }

    #[test]
    fn test_wizard_back_clamps_at_start() {
        let mut wizard = LinearWizard::new();
        wizard.back();
        assert_eq!(wizard.index(), 0);
    }

    #[test]
    fn test_wizard_next_clamps_at_end() {
        let mut wizard = LinearWizard::new();
        for _ in 0..20 {
            wizard.next();
        }
        assert_eq!(wizard.index(), 9);
        assert!(wizard.is_last());
        assert_eq!(wizard.current().id, "mastery");
    }

    #[test]
    fn test_wizard_at_clamps_out_of_range() {
        assert_eq!(LinearWizard::at(99).index(), 9);
    }

    #[test]
    fn test_wizard_next_label() {
        assert_eq!(LinearWizard::at(0).next_label(), "Next");
        assert_eq!(LinearWizard::at(8).next_label(), "Next");
        assert_eq!(LinearWizard::at(9).next_label(), "Finish");
    }

    #[test]
    fn test_wizard_finish_is_clamped_move() {
        let wizard = LinearWizard::at(9);
        assert_eq!(wizard.next_index(), 9);
        assert_eq!(wizard.back_index(), 8);
    }

    #[test]
    fn test_subset_presets() {
        let ids: Vec<_> = SubsetPreset::Problem.steps().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["problem", "current", "root"]);

        // Registry order, not preset listing order
        let ids: Vec<_> = SubsetPreset::Experiment
            .steps()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["experiment", "obstacles", "action"]);
    }

    #[test]
    fn test_subset_preset_parse() {
        assert_eq!(SubsetPreset::parse("Problem"), Some(SubsetPreset::Problem));
        assert_eq!(
            SubsetPreset::parse("experiment"),
            Some(SubsetPreset::Experiment)
        );
        assert_eq!(SubsetPreset::parse("root"), None);
    }
}

//! Static questionnaire definition and the navigation modes built on it.

mod registry;
mod wizard;

pub use registry::{find_step, step_position, step_title, FieldDef, FieldKind, StepDef, STEPS};
pub use wizard::{LinearWizard, SubsetPreset, Variant};

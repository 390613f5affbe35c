//! The ten PS101 stages and their fields.

use serde::Serialize;

/// Input control used for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
}

/// One labeled input within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

/// One stage of the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDef {
    pub id: &'static str,
    pub title: &'static str,
    pub fields: &'static [FieldDef],
}

impl StepDef {
    /// Session key of one of this stage's fields.
    pub fn field_key(&self, field: &FieldDef) -> String {
        format!("{}.{}", self.id, field.key)
    }

    pub fn find_field(&self, key: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Registry position of a field, used for export ordering.
    pub fn field_position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key == key)
    }
}

const fn textarea(key: &'static str, label: &'static str) -> FieldDef {
    FieldDef {
        key,
        label,
        kind: FieldKind::Textarea,
    }
}

const fn text(key: &'static str, label: &'static str) -> FieldDef {
    FieldDef {
        key,
        label,
        kind: FieldKind::Text,
    }
}

/// All stages, in questionnaire order.
pub static STEPS: [StepDef; 10] = [
    StepDef {
        id: "problem",
        title: "1) Problem Identification & Delta",
        fields: &[
            textarea("challenge", "What specific challenge are you facing?"),
            textarea("why_problem", "Why is it a problem?"),
            textarea("problem_statement", "Reduce to a simple problem statement"),
            textarea(
                "miracle",
                "Miracle Question: If it were solved tomorrow, what would be different?",
            ),
            textarea(
                "delta",
                "What is the gap (delta) between current and desired?",
            ),
            textarea(
                "alignment",
                "How does solving this align with your long-term goals/values?",
            ),
        ],
    },
    StepDef {
        id: "current",
        title: "2) Current Situation",
        fields: &[
            textarea(
                "current_desc",
                "Describe your current situation. What factors contribute?",
            ),
            textarea("attempts", "What have you tried so far? Outcomes?"),
            textarea("patterns", "Patterns or recurring themes?"),
            textarea("impact", "Impact on career/relationships/personal growth?"),
        ],
    },
    StepDef {
        id: "root",
        title: "3) Root Cause (5 Whys)",
        fields: &[
            textarea("root_causes", "What do you believe are the underlying causes?"),
            textarea("assumptions", "Any assumptions you might be making?"),
            textarea("beliefs", "Beliefs/habits/experiences contributing?"),
            textarea("outsider", "If you were an outsider, what would you notice?"),
        ],
    },
    StepDef {
        id: "selfeff",
        title: "4) Self-Efficacy",
        fields: &[
            text("confidence", "Confidence (1–10) and why?"),
            textarea("past_skills", "Past experiences or skills to draw on"),
            textarea(
                "capability_view",
                "How does your capability perception affect approach?",
            ),
            textarea("micro_wins", "Past small wins you can build on"),
        ],
    },
    StepDef {
        id: "solutions",
        title: "5) Solutions Brainstorm",
        fields: &[
            textarea(
                "ideas",
                "List at least five potential solutions (one per line)",
            ),
            textarea(
                "benefits_drawbacks",
                "Benefits and drawbacks of each (map line-by-line if possible)",
            ),
            textarea(
                "aligned_choice",
                "Which solution aligns most with your values/goals?",
            ),
            textarea("hybrid", "Combine elements into a comprehensive approach"),
        ],
    },
    StepDef {
        id: "experiment",
        title: "6) Experimental Design",
        fields: &[
            textarea("small_experiment", "Define a small, low-risk experiment"),
            textarea("success_metric", "Measurable outcome indicating success"),
            textarea("resources", "Resources/support needed"),
            text("duration", "How long will you run the experiment?"),
        ],
    },
    StepDef {
        id: "obstacles",
        title: "7) Obstacles",
        fields: &[
            textarea("external", "External factors that could hinder progress"),
            textarea(
                "internal",
                "Internal obstacles (self-doubt, fear, knowledge gaps)",
            ),
            textarea("mitigations", "Strategies to overcome/mitigate obstacles"),
            textarea("reframe", "Reframe obstacles as opportunities for growth"),
        ],
    },
    StepDef {
        id: "action",
        title: "8) Action Plan",
        fields: &[
            textarea("steps", "Specific steps to implement the experiment"),
            textarea("tracking", "How you will measure/track progress"),
            textarea("milestones", "Milestones to celebrate small wins"),
            textarea("accountability", "Who will support or hold you accountable?"),
        ],
    },
    StepDef {
        id: "reflection",
        title: "9) Reflection & Iteration",
        fields: &[
            textarea("results", "Results and learnings"),
            textarea("confidence_change", "Effect on your confidence"),
            textarea("adjustments", "Adjustments you will make"),
            textarea("new_actions", "New experiments/actions you will take"),
        ],
    },
    StepDef {
        id: "mastery",
        title: "10) Mastery & Commitment",
        fields: &[
            textarea("skills_gained", "New skills or knowledge gained"),
            textarea("apply_future", "How you will apply this in future"),
            textarea("momentum", "Strategies to maintain momentum"),
            textarea("self_view", "How has your self-view changed?"),
            textarea(
                "commitment",
                "What specific actions will you commit to this week?",
            ),
            textarea("hold_accountable", "How will you hold yourself accountable?"),
            textarea("share_plan", "Who will you share your plan with?"),
        ],
    },
];

/// Look up a stage by id.
pub fn find_step(id: &str) -> Option<&'static StepDef> {
    STEPS.iter().find(|s| s.id == id)
}

/// Registry position of a stage.
pub fn step_position(id: &str) -> Option<usize> {
    STEPS.iter().position(|s| s.id == id)
}

/// Title of a stage, falling back to the raw id for unknown stages.
pub fn step_title(id: &str) -> &str {
    find_step(id).map_or(id, |s| s.title)
}

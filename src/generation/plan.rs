//! Section plans: the ordered chapters of one report and how each is rendered.

use crate::error::ReportError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Persona contract sent verbatim as the system instruction of every call.
pub const SYSTEM_INSTRUCTION: &str = "\
You are Natalie Lau, a Vedic astrology (cosmography) consultant who speaks as a wise, grounded counselor.
Language guidelines:
1. Clear and meaningful: give deep insight but get to the point. Do not ramble.
2. Warm but professional: be poetic only as much as comforting requires; avoid florid prose and abstract metaphors.
3. Narrative structure: write flowing, logically connected paragraphs. Avoid rigid bullet lists; write like a thoughtful consultation letter.
4. Educational: explain technical terms (Lagna, Houses, Dasha) in everyday language a lay client understands.
5. Solution-focused: do not only read the future; help the client understand their inner patterns so they can make better decisions.
6. Consistency: connect each chapter to the previous ones so the report reads as one whole.";

/// Values a plan is rendered against. Rebuilt before every section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanContext {
    pub display_name: String,
    pub period_label: String,
}

impl PlanContext {
    pub fn new(display_name: impl Into<String>, period_label: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            period_label: period_label.into(),
        }
    }
}

/// One chapter of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    pub id: String,
    pub title: String,
    /// Instruction text; `{name}` and `{period}` are substituted at render time.
    pub template: String,
    pub is_first: bool,
}

impl SectionDescriptor {
    pub fn new(id: impl Into<String>, title: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            template: template.into(),
            is_first: false,
        }
    }

    pub fn render(&self, context: &PlanContext) -> String {
        self.template
            .replace("{name}", &context.display_name)
            .replace("{period}", &context.period_label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPlan {
    pub sections: Vec<SectionDescriptor>,
}

impl SectionPlan {
    /// Build a plan from descriptors in order; only the first is flagged `is_first`.
    pub fn from_sections(sections: Vec<SectionDescriptor>) -> Self {
        let sections = sections
            .into_iter()
            .enumerate()
            .map(|(index, mut section)| {
                section.is_first = index == 0;
                section
            })
            .collect();
        Self { sections }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SectionDescriptor> {
        self.sections.get(index)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.sections.is_empty() {
            return Err(ReportError::InvalidPlan(
                "Section plan must contain at least one section".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.id.trim().is_empty() {
                return Err(ReportError::InvalidPlan(
                    "Section id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(section.id.as_str()) {
                return Err(ReportError::InvalidPlan(format!(
                    "Duplicate section id '{}'",
                    section.id
                )));
            }
        }
        for (index, section) in self.sections.iter().enumerate() {
            if section.is_first != (index == 0) {
                return Err(ReportError::InvalidPlan(format!(
                    "Section '{}' has is_first={} at position {}",
                    section.id, section.is_first, index
                )));
            }
        }
        Ok(())
    }
}

/// Produces the plan for a given context.
pub type PlanBuilder = dyn Fn(&PlanContext) -> SectionPlan + Send + Sync;

const CONSULTATION_SECTIONS: [(&str, &str, &str); 15] = [
    (
        "CH1",
        "Chapter 1: Lagna & Worldview",
        "Greet {name} warmly. Find the client's name in the data and write it as [[NAME: Name]]. Discuss the Lagna (Ascendant) as the main filter through which they live their life.",
    ),
    (
        "CH2",
        "Chapter 2: Finances & Self-Worth",
        "Discuss House 2. Focus on how {name} seeks financial security and what they value personally.",
    ),
    (
        "CH3",
        "Chapter 3: Initiative & Communication",
        "Discuss House 3. Willpower, way of speaking, and how {name} executes ideas.",
    ),
    (
        "CH4",
        "Chapter 4: Inner Peace & Mother",
        "Discuss House 4. The relationship with roots and family, and what makes {name} feel emotionally safe.",
    ),
    (
        "CH5",
        "Chapter 5: Talent & Intuition",
        "Discuss House 5. Creativity, innate intelligence, and what {name} enjoys for its own sake.",
    ),
    (
        "CH6",
        "Chapter 6: Discipline & Obstacles",
        "Discuss House 6. How {name} handles conflict, health routines, and daily obstacles.",
    ),
    (
        "CH7",
        "Chapter 7: Relationship Dynamics",
        "Discuss House 7. Interaction with others, partners, and the social contracts {name} lives by.",
    ),
    (
        "CH8",
        "Chapter 8: Transformation & Crisis",
        "Discuss House 8. Unexpected events, inner depth, and how {name} rises from major change.",
    ),
    (
        "CH9",
        "Chapter 9: Philosophy & Fortune",
        "Discuss House 9. Spiritual outlook, the relationship with teacher and father figures, and the role of luck.",
    ),
    (
        "CH10",
        "Chapter 10: Career & Public Contribution",
        "Discuss House 10. The role {name} plays in society, professional achievement, and responsibility.",
    ),
    (
        "CH11",
        "Chapter 11: Gains & Connections",
        "Discuss House 11. Financial gains, friendships, and long-term ambitions.",
    ),
    (
        "CH12",
        "Chapter 12: Reflection & Release",
        "Discuss House 12. What happens behind the scenes, expenses, and the need for solitude and healing.",
    ),
    (
        "CH13",
        "Chapter 13: The Rahu & Ketu Axis",
        "Discuss shadow work: where the area of obsession (Rahu) and the area of release (Ketu) lie in {name}'s life right now.",
    ),
    (
        "CH14",
        "Chapter 14: Navigating Time (Dasha)",
        "Discuss the current time period ({period}). Explain, in practical terms, the energy that dominates right now.",
    ),
    (
        "CH15",
        "Chapter 15: Natalie's Guidance & Remedy",
        "Give practical remedies to balance the energies. Close the letter to {name} with a clear, encouraging message.",
    ),
];

/// The built-in fifteen-chapter consultation plan.
pub fn consultation_plan(_context: &PlanContext) -> SectionPlan {
    SectionPlan::from_sections(
        CONSULTATION_SECTIONS
            .iter()
            .map(|(id, title, template)| SectionDescriptor::new(*id, *title, *template))
            .collect(),
    )
}

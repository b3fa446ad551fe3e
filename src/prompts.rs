//! Prompt builders for code generation, name brainstorming, and yes/no
//! classification. Style and complexity only change the wording sent to the
//! model; nothing downstream depends on them.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Visual style requested for a generated model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Realistic,
    Stylized,
    Minimal,
}

/// Level of detail requested for a generated model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Detailed,
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Realistic => write!(f, "realistic"),
            Self::Stylized => write!(f, "stylized"),
            Self::Minimal => write!(f, "minimal"),
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Medium => write!(f, "medium"),
            Self::Detailed => write!(f, "detailed"),
        }
    }
}

impl Style {
    fn guidance(self) -> &'static str {
        match self {
            Self::Realistic => "more detail and accurate proportions",
            Self::Stylized => "simplified but recognizable features",
            Self::Minimal => "very simple geometric shapes",
        }
    }
}

impl Complexity {
    fn guidance(self) -> &'static str {
        match self {
            Self::Simple => "basic shapes, roughly 20-50 lines of code",
            Self::Medium => "moderate detail, roughly 50-150 lines of code",
            Self::Detailed => "high detail, 150 or more lines of code",
        }
    }
}

/// Code-generation prompt for one category
#[derive(Debug, Clone)]
pub struct ScadPrompt {
    noun: String,
    style: Style,
    complexity: Complexity,
}

impl ScadPrompt {
    pub fn new(noun: impl Into<String>, style: Style, complexity: Complexity) -> Self {
        Self {
            noun: noun.into(),
            style,
            complexity,
        }
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    /// Prompt asking for an OpenSCAD model of `subject`
    pub fn for_subject(&self, subject: &str) -> String {
        format!(
            "Generate OpenSCAD code for a {subject} ({noun}) in {style} style with {complexity} complexity.\n\
             \n\
             Requirements:\n\
             - Use only OpenSCAD primitives, transformations, boolean operations, loops and modules\n\
             - Make it 3D printable, roughly 50-100mm in its largest dimension\n\
             - The model should be recognizable as a {subject}\n\
             - Style: {style_guidance}\n\
             - Complexity: {complexity_guidance}\n\
             \n\
             Output only the OpenSCAD code, no explanations or markdown formatting.",
            noun = self.noun,
            style = self.style,
            complexity = self.complexity,
            style_guidance = self.style.guidance(),
            complexity_guidance = self.complexity.guidance(),
        )
    }
}

/// Prompt asking for a newline-separated list of single-word names
pub fn brainstorm_prompt(noun: &str, count: usize, focus: Option<&str>) -> String {
    let focus_line = focus
        .map(|f| format!("- Focus on {f}\n"))
        .unwrap_or_default();
    format!(
        "Generate a list of exactly {count} diverse {noun} names.\n\
         \n\
         Requirements:\n\
         - Only single-word names (no spaces, hyphens, or compound words)\n\
         {focus_line}\
         - No brand names, scientific names, or duplicates\n\
         \n\
         Return ONLY the names, one per line, no numbers, no explanations."
    )
}

/// Yes/no question used to filter a brainstormed list
pub fn classification_prompt(noun: &str, name: &str) -> String {
    format!(
        "Is \"{name}\" an actual {noun} that could be modeled as a recognizable 3D object?\n\
         Answer with just \"yes\" or \"no\".\n\
         \n\
         Answer:"
    )
}

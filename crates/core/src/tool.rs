//! Tool selection

use crate::stroke::Color;
use std::fmt;
use std::str::FromStr;

/// One of the two fixed inks shared by the pen and rectangle tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ink {
    Red,
    Yellow,
}

impl Ink {
    pub fn color(self) -> Color {
        match self {
            Ink::Red => Color::RED,
            Ink::Yellow => Color::YELLOW,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Ink::Red => "red",
            Ink::Yellow => "yellow",
        }
    }
}

/// The currently armed drawing tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    /// Nothing armed; pointer input passes through to the page
    #[default]
    None,
    Pen(Ink),
    Rect(Ink),
    Text,
}

impl Tool {
    /// Every selectable tool, in toolbar order
    pub const ALL: [Tool; 6] = [
        Tool::None,
        Tool::Pen(Ink::Red),
        Tool::Pen(Ink::Yellow),
        Tool::Rect(Ink::Red),
        Tool::Rect(Ink::Yellow),
        Tool::Text,
    ];

    pub fn is_armed(self) -> bool {
        self != Tool::None
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::None => f.write_str("none"),
            Tool::Pen(ink) => write!(f, "pen-{}", ink.name()),
            Tool::Rect(ink) => write!(f, "rect-{}", ink.name()),
            Tool::Text => f.write_str("text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool {0:?}")]
pub struct UnknownTool(pub String);

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.to_string() == s)
            .ok_or_else(|| UnknownTool(s.to_owned()))
    }
}

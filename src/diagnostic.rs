// ABOUTME: Positioned diagnostics accumulated across lex, parse, and runtime phases

use crate::position::Position;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lex,
    Parse,
    Runtime,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Lex => "lex",
            Phase::Parse => "parse",
            Phase::Runtime => "runtime",
        };
        write!(f, "{name}")
    }
}

/// A single positioned error message. Never thrown across the public API;
/// always collected into a list.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub position: Position,
    pub phase: Phase,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, position: Position, phase: Phase) -> Self {
        Diagnostic {
            message: message.into(),
            position,
            phase,
        }
    }

    pub fn lex(message: impl Into<String>, position: Position) -> Self {
        Diagnostic::new(message, position, Phase::Lex)
    }

    pub fn parse(message: impl Into<String>, position: Position) -> Self {
        Diagnostic::new(message, position, Phase::Parse)
    }

    pub fn runtime(message: impl Into<String>, position: Position) -> Self {
        Diagnostic::new(message, position, Phase::Runtime)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.position, self.phase, self.message)
    }
}

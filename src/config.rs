// ABOUTME: Version and welcome-banner constants for the demo CLI

pub const VERSION: &str = "0.1.0";
pub const WELCOME_MESSAGE: &str = "scriptling REPL";
pub const WELCOME_SUBTITLE: &str = "An embeddable tree-walking scripting interpreter";

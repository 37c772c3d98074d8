use console::style;
use std::fmt::Display;

/// Green bold: success checkmarks
pub fn success<D: Display>(text: D) -> String {
    style(text).green().bold().to_string()
}

/// Yellow bold: warnings
pub fn warning<D: Display>(text: D) -> String {
    style(text).yellow().bold().to_string()
}

/// Red bold: errors
pub fn error<D: Display>(text: D) -> String {
    style(text).red().bold().to_string()
}

/// White bold: section headers, titles
pub fn header<D: Display>(text: D) -> String {
    style(text).white().bold().to_string()
}

/// Dim: secondary text such as directory scopes
pub fn dim<D: Display>(text: D) -> String {
    style(text).dim().to_string()
}

/// Cyan bold: list numbers, prompts
pub fn accent<D: Display>(text: D) -> String {
    style(text).cyan().bold().to_string()
}

/// Green: confirmed values, role names
pub fn value<D: Display>(text: D) -> String {
    style(text).green().to_string()
}

//! Terminal theme
//!
//! Thin wrappers over `colored`. Colors are dropped automatically when
//! `NO_COLOR` is set or stdout is not a terminal.

use colored::Colorize;

use crate::classify::Category;

/// Text formatting utilities
pub struct Theme;

impl Theme {
    pub fn header(text: &str) -> String {
        text.bold().to_string()
    }

    pub fn primary(text: &str) -> String {
        text.bold().to_string()
    }

    pub fn muted(text: &str) -> String {
        text.dimmed().to_string()
    }

    pub fn success(text: &str) -> String {
        text.green().to_string()
    }

    pub fn warning(text: &str) -> String {
        text.yellow().to_string()
    }

    pub fn error(text: &str) -> String {
        text.red().bold().to_string()
    }

    pub fn size(text: &str) -> String {
        text.cyan().to_string()
    }

    pub fn value(text: &str) -> String {
        text.to_string()
    }

    pub fn command(text: &str) -> String {
        text.cyan().to_string()
    }

    /// Category label, colored by how safe the category usually is to remove
    pub fn category(category: Category) -> String {
        let label = format!("{:<9}", category.as_str());
        match category {
            Category::Installer | Category::Archive => label.green().to_string(),
            Category::Video | Category::Image => label.yellow().to_string(),
            Category::Document => label.magenta().to_string(),
            Category::Other => label.normal().to_string(),
        }
    }

    pub fn divider(width: usize) -> String {
        "-".repeat(width)
    }

    pub fn divider_bold(width: usize) -> String {
        "=".repeat(width)
    }
}

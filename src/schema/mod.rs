pub mod catalog;
pub mod node;
pub mod style;
pub mod theme;

//! TUI screens

mod dashboard;

pub use dashboard::DashboardScreen;

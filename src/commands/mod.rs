pub mod fetch;
pub mod run;
pub mod send;
pub mod show;

// Re-export command functions for convenience
pub use fetch::fetch;
pub use run::run;
pub use send::send;
pub use show::show;

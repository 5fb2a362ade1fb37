pub mod config;
pub mod inspect;
pub mod plugin;
pub mod run;

pub mod config;
pub mod decoder;
pub mod detect;
pub mod event;
pub mod fetch;
pub mod pipeline;

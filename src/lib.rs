pub mod application;
pub mod compose;
pub mod deb;
pub mod dependency;
pub mod error;
pub mod fetch;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod sandbox;
pub mod version;

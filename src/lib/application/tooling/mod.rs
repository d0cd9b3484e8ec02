//! Tool Registry: the closed set of tools and resources and their handlers

mod registry;
mod resources;
mod tools;


pub use registry::{HealthReport, ToolRegistry, generation_result};
pub use resources::{Resource, ResourceDescriptor};
pub use tools::{Tool, ToolDescriptor};

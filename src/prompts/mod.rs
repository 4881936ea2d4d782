// Prompt construction for the mental-health assistant

mod category;
mod formatter;
mod resources;

pub use category::Category;
pub use formatter::{category_instructions, topic_suggestion, PromptFormatter};
pub use resources::{resources_for, Resource};

// Search index construction and query serving.

pub mod builder;
pub mod filters;
pub mod handlers;
pub mod relevance;

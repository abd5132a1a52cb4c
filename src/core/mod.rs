pub mod discovery;
pub mod events;
pub mod expression;
pub mod graph;
pub mod ids;
pub mod layout;
pub mod types;

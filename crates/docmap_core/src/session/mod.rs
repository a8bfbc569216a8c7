//! Sessions: state, managed entities and typed queries.

mod query;
mod state;
mod unit;
mod working;

pub use query::TypedQuery;
pub use state::SessionState;
pub use unit::Session;

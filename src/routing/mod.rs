//! Ordered path dispatch for the `/api/` surface.

pub mod dispatcher;
pub mod endpoints;
pub mod grammar;
pub mod table;

pub use dispatcher::{normalize_path, Dispatcher};
pub use endpoints::{DispatchRequest, RequestMethod};
pub use grammar::{Captures, Grammar, GrammarError, SlotKind};
pub use table::{Endpoint, RouteTable, Rule, API_RULES};

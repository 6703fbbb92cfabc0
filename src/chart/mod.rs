pub mod loader;
pub mod resolver;
pub mod schema;

pub use loader::load_chart;
pub use resolver::{ChartResolver, ResolvePolicy};
pub use schema::{AwardChart, ProgramId, ProgramParseError, Route, RouteParseError};

pub use error::ResolveError;
pub use resolution::{Node, ResolvedPackage, Resolution, SkippedRequirement};
pub use resolver::{Reporter, Resolver, ResolverOptions};
pub use source::{PipReportSource, ReportSource};

mod error;
mod resolution;
mod resolver;
mod source;

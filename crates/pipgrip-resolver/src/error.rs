use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Report(#[from] pipgrip_interpreter::Error),

    #[error("The requirements that resolve on their own conflict with each other")]
    Conflict(#[source] pipgrip_interpreter::Error),
}

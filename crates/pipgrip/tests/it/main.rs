//! this is the single integration test, as documented by matklad
//! in <https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html>

mod help;

#[cfg(unix)]
mod install;

#[cfg(unix)]
mod lock;

#[cfg(feature = "pypi")]
mod pypi;

#[cfg(unix)]
mod resolve;

#[cfg(unix)]
mod skip_invalid_input;

#[cfg(unix)]
mod tree;

mod version;

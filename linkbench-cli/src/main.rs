//! The `linkbench` binary runs the request phase of the workload generator.
//!
//! Requesters are driven against an in-memory store, which is optionally populated with links and
//! nodes first. At the end, a summary of all requesters and the latency of every operation kind is
//! printed. See [`config`] for all options.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod cli;
mod config;
mod observability;
mod run;

fn main() -> anyhow::Result<()> {
    cli::execute()
}

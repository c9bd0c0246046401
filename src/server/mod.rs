//! Tool-server side: the `serve` subcommand and its runtime.

pub mod runtime;

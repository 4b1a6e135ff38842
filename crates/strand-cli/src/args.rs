//! Command-line argument definitions for the Strand CLI.
//!
//! This module defines the [`Args`] structure parsed from the command
//! line using [`clap`]. One subcommand per core operation: `check`,
//! `rules`, `rewrite`, and `compile`, all over a JSON diagram document.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Strand diagram compiler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Type-check a diagram document and report diagnostics
    Check {
        /// Path to the input diagram file (JSON)
        input: String,
    },

    /// List rewrite rules applicable to a node selection
    Rules {
        /// Path to the input diagram file (JSON)
        input: String,

        /// Selected node ids
        #[arg(short, long, value_delimiter = ',', required = true)]
        select: Vec<String>,
    },

    /// Apply a rewrite rule and emit the rewritten document
    Rewrite {
        /// Path to the input diagram file (JSON)
        input: String,

        /// Rule to apply (e.g. identity-left, braiding)
        #[arg(short, long)]
        rule: String,

        /// Selected node ids
        #[arg(short, long, value_delimiter = ',', required = true)]
        select: Vec<String>,

        /// Output path; stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Compile a diagram to source code for a target
    Compile {
        /// Path to the input diagram file (JSON)
        input: String,

        /// Target language (rust, python)
        #[arg(short, long, default_value = "rust")]
        target: String,

        /// Name of the generated function
        #[arg(long, default_value = "diagram")]
        function_name: String,

        /// Module or namespace qualifying every generated call
        #[arg(long)]
        module_prefix: Option<String>,

        /// Base-type mapping as `Base=TargetType`, repeatable
        #[arg(short, long)]
        map: Vec<String>,

        /// Output path; stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },
}

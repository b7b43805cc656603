/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Options for a single layout session. These are created once by the embedder and handed
//! to every reflow through the layout context; nothing here is global.

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Options for one layout session.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Opts {
    /// True to turn off incremental layout. Every line of every container is treated as
    /// dirty on every reflow.
    pub nonincremental_layout: bool,

    /// Debug options, usually set with `-Z`.
    pub debug: DebugOptions,

    /// Legacy compatibility behaviours that are off unless asked for.
    pub quirks: ReflowQuirks,
}

/// Debug options for layout, set with a comma separated list such as
/// `trace-reflow,verify-line-invariants`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DebugOptions {
    /// List all the debug options.
    pub help: bool,

    /// Log every container and line reflow.
    pub trace_reflow: bool,

    /// Log every float placement, clearance computation and band query.
    pub trace_float_manager: bool,

    /// Check line list invariants after each container reflow and report violations.
    pub verify_line_invariants: bool,

    /// Dump each container's line list as JSON after reflow.
    pub dump_line_lists: bool,
}

impl DebugOptions {
    pub fn extend(&mut self, debug_string: String) -> Result<(), String> {
        for option in debug_string.split(',') {
            match option {
                "help" => self.help = true,
                "trace-reflow" => self.trace_reflow = true,
                "trace-float-manager" => self.trace_float_manager = true,
                "verify-line-invariants" => self.verify_line_invariants = true,
                "dump-line-lists" => self.dump_line_lists = true,
                "" => {},
                _ => return Err(String::from(option)),
            };
        }
        Ok(())
    }

    /// Whether any option that produces log output is set.
    pub fn any_tracing(&self) -> bool {
        self.trace_reflow || self.trace_float_manager || self.dump_line_lists
    }
}

/// Compatibility behaviours that deviate from CSS 2.1 float ordering.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ReflowQuirks {
    /// Once a line has backed up to an earlier soft break, floats met while replaying the
    /// line are placed below it even when they would fit beside it. Legacy engines did this
    /// for floats next to tables.
    pub float_below_line_after_backup: bool,
}

/// Usage text for the debug options, one option per line.
pub fn debug_usage() -> String {
    let options = [
        ("help", "Show this help message."),
        ("trace-reflow", "Log every container and line reflow."),
        (
            "trace-float-manager",
            "Log float placement, clearance and band queries.",
        ),
        (
            "verify-line-invariants",
            "Check line list invariants after each container reflow.",
        ),
        ("dump-line-lists", "Dump line lists as JSON after reflow."),
    ];
    let mut usage = String::from("Usage: -Z option,[options,...]\n\twhere options include\n\nOptions:\n");
    for (name, description) in options {
        usage.push_str(&format!("\t{:<35} {}\n", name, description));
    }
    usage
}

impl Opts {
    /// Builds options from a `-Z` style debug string. Unknown options are reported and
    /// returned as the error. `help` logs the usage text.
    pub fn from_debug_string(debug_string: &str) -> Result<Opts, String> {
        let mut opts = Opts::default();
        if let Err(option) = opts.debug.extend(debug_string.to_owned()) {
            warn!("Unknown debug option: {option}\n{}", debug_usage());
            return Err(option);
        }
        if opts.debug.help {
            info!("{}", debug_usage());
        }
        Ok(opts)
    }
}

//! Solution reporting.
//!
//! Text lines look like
//!
//! ```text
//! [arcset_supervisor] Solution with 2 edges: 2-0 3-1
//! [arcset_supervisor] Solution with 0 edges:
//! [arcset_supervisor] The graph is acyclic!
//! ```
//!
//! With `--json` each event is one JSON object per line instead.

use arcset::arcset::Record;
use serde::Serialize;
use std::io::{self, Stdout, Write};

/// Receives coordinator events worth telling the user about.
pub trait SolutionSink {
    /// A strictly smaller arc set was found.
    fn improved(&mut self, record: &Record) -> io::Result<()>;

    /// An empty arc set was found: the graph has no cycle.
    fn acyclic(&mut self) -> io::Result<()>;
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Solution { program: &'a str, solution: &'a Record },
    Acyclic { program: &'a str },
}

/// Prints events to a writer, stdout by default.
pub struct ConsoleReporter<W: Write = Stdout> {
    program: String,
    json: bool,
    out: W,
}

impl ConsoleReporter<Stdout> {
    /// Reporter writing to stdout.
    pub fn stdout(program: impl Into<String>, json: bool) -> Self {
        Self::new(program, json, io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    /// Reporter writing to `out`.
    pub fn new(program: impl Into<String>, json: bool, out: W) -> Self {
        Self {
            program: program.into(),
            json,
            out,
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn write_json<W: Write>(out: &mut W, event: &Event<'_>) -> io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    out.flush()
}

impl<W: Write> SolutionSink for ConsoleReporter<W> {
    fn improved(&mut self, record: &Record) -> io::Result<()> {
        if self.json {
            let event = Event::Solution {
                program: &self.program,
                solution: record,
            };
            return write_json(&mut self.out, &event);
        }
        writeln!(
            self.out,
            "[{}] Solution with {} edges: {}",
            self.program,
            record.len(),
            record
        )?;
        self.out.flush()
    }

    fn acyclic(&mut self) -> io::Result<()> {
        if self.json {
            let event = Event::Acyclic {
                program: &self.program,
            };
            return write_json(&mut self.out, &event);
        }
        writeln!(self.out, "[{}] The graph is acyclic!", self.program)?;
        self.out.flush()
    }
}

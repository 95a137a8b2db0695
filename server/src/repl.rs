//! Line-oriented query loops over stdin/stdout.
//!
//! Each loop reads one query per line and answers it before reading the
//! next. A [`Shutdown`] request is honored between queries only.

use anyhow::Result;
use parking_lot::{Mutex, MutexGuard};
use quarry_core::index::sort_doc_ids;
use quarry_core::{BooleanEngine, VectorEngine};
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const BOOLEAN_PROMPT: &str = "search: ";
pub const RANKED_PROMPT: &str = "query: ";

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    in_flight: Arc<Mutex<()>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop. Returns once no query is being answered.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        drop(self.in_flight.lock());
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn begin_query(&self) -> Option<MutexGuard<'_, ()>> {
        let guard = self.in_flight.lock();
        (!self.is_requested()).then_some(guard)
    }
}

fn run<R, W, F>(prompt: &str, mut input: R, mut out: W, shutdown: &Shutdown, mut answer: F) -> Result<()>
where
    R: BufRead,
    W: Write,
    F: FnMut(&[u8], &mut W) -> std::io::Result<()>,
{
    let mut line = Vec::new();
    while !shutdown.is_requested() {
        write!(out, "{prompt}")?;
        out.flush()?;

        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let Some(_guard) = shutdown.begin_query() else { break };
        answer(&line, &mut out)?;
        out.flush()?;
    }
    Ok(())
}

/// Prints matching ids as `[1 2 3]`, `[]` when nothing matches, or the query error.
pub fn run_boolean<R: BufRead, W: Write>(engine: &BooleanEngine, input: R, out: W, shutdown: &Shutdown) -> Result<()> {
    run(BOOLEAN_PROMPT, input, out, shutdown, |line, out| match engine.search_bytes(line) {
        Ok(hits) => {
            let ids = sort_doc_ids(hits.iter().map(String::as_str));
            writeln!(out, "[{}]", ids.join(" "))
        }
        Err(e) => writeln!(out, "{e}"),
    })
}

/// Prints up to K result lines followed by a blank line.
pub fn run_ranked<R: BufRead, W: Write>(engine: &VectorEngine, input: R, out: W, shutdown: &Shutdown) -> Result<()> {
    run(RANKED_PROMPT, input, out, shutdown, |line, out| {
        let query = String::from_utf8_lossy(line);
        writeln!(out)?;
        for result in engine.search(&query) {
            writeln!(out, "{result}")?;
        }
        writeln!(out)
    })
}

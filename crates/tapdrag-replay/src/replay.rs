//! Script replay: JSONL steps in, JSONL reports out.
//!
//! Each non-blank line is either an encoded input event (see
//! [`tapdrag_web::input_parser`]) or a clock step:
//!
//! ```json
//! {"type":"advance","ms":150}
//! ```
//!
//! Lines starting with `#` are comments.

use core::time::Duration;
use std::io::{BufRead, Write};

use serde_json::Value;
use tapdrag_core::InputEvent;
use tapdrag_web::input_parser::parse_encoded_input;

use crate::demo::{DemoPage, Report};
use crate::error::{ReplayError, Result};

/// One parsed script step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Input(InputEvent),
    Advance(Duration),
}

/// Parse one script line. Returns `Ok(None)` for blank and comment lines.
pub fn parse_step(line_no: usize, line: &str) -> Result<Option<Step>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(line)
        && map.get("type").and_then(Value::as_str) == Some("advance")
    {
        let ms = map
            .get("ms")
            .and_then(Value::as_f64)
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .ok_or_else(|| ReplayError::Step {
                line: line_no,
                message: "advance needs a non-negative \"ms\"".to_string(),
            })?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let micros = (ms * 1000.0).round() as u64;
        return Ok(Some(Step::Advance(Duration::from_micros(micros))));
    }

    parse_encoded_input(line)
        .map(|event| Some(Step::Input(event)))
        .map_err(|source| ReplayError::Input {
            line: line_no,
            source,
        })
}

/// Apply `step` to the demo page and collect the reports it produced.
pub fn apply_step(demo: &DemoPage, step: &Step) -> Vec<Report> {
    match step {
        Step::Input(event) => {
            let outcome = demo.page().dispatch(event);
            tracing::trace!(
                event = event.kind.name(),
                default_prevented = outcome.default_prevented,
                "replayed input"
            );
        }
        Step::Advance(dt) => demo.page().advance(*dt),
    }
    demo.drain_reports()
}

/// Replay `script` against `demo`, writing one JSON line per report.
///
/// Returns the number of steps applied.
pub fn replay<R: BufRead, W: Write>(demo: &DemoPage, script: R, out: &mut W) -> Result<usize> {
    let mut steps = 0;
    write_reports(out, &demo.drain_reports())?;
    for (index, line) in script.lines().enumerate() {
        let line = line?;
        let Some(step) = parse_step(index + 1, &line)? else {
            continue;
        };
        write_reports(out, &apply_step(demo, &step))?;
        steps += 1;
    }
    out.flush()?;
    tracing::debug!(steps, "replay finished");
    Ok(steps)
}

fn write_reports<W: Write>(out: &mut W, reports: &[Report]) -> Result<()> {
    for report in reports {
        serde_json::to_writer(&mut *out, report)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

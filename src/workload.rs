use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use elevator::{Direction, ElevatorError, Request, Sector};

use crate::device::Device;
use crate::error::{ClookError, Result};

/// One step of a replayed workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkloadOp {
    Add(Request),
    Dispatch,
    Drain,
    Merge(Sector),
}

/// Ordered list of admissions and dispatch triggers.
///
/// Text form, one op per line:
///
/// ```text
/// # comment
/// R 50        read at sector 50
/// W 20 8      write of 8 sectors at sector 20
/// dispatch
/// merge 50    drop the first queued request at sector 50
/// drain
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    ops: Vec<WorkloadOp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub admitted: usize,
    pub dispatched: usize,
    pub merged: usize,
    pub throttled: usize,
}

impl Workload {
    pub fn new(ops: Vec<WorkloadOp>) -> Self {
        Self { ops }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut ops = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let op = parse_line(line).map_err(|message| ClookError::Workload {
                line: index + 1,
                message,
            })?;
            ops.push(op);
        }
        Ok(Self { ops })
    }

    /// Reproducible mix of admissions (about 70%) and single dispatches.
    pub fn random(count: usize, max_sector: Sector, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let ops = (0..count)
            .map(|_| {
                if rng.gen_bool(0.7) {
                    let direction = if rng.gen_bool(0.5) {
                        Direction::Read
                    } else {
                        Direction::Write
                    };
                    let sector = rng.gen_range(0..max_sector.max(1));
                    WorkloadOp::Add(Request::new(direction, sector).with_len(rng.gen_range(1..=8)))
                } else {
                    WorkloadOp::Dispatch
                }
            })
            .collect();
        Self { ops }
    }

    pub fn ops(&self) -> &[WorkloadOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Feeds every op to `device`. A full queue is relieved by dispatching
    /// one request before admitting again.
    pub async fn replay(&self, device: &Device) -> Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();

        for op in &self.ops {
            match op {
                WorkloadOp::Add(request) => {
                    match device.add_request(request.clone()).await {
                        Ok(_) => {}
                        Err(ClookError::Elevator(ElevatorError::ResourceExhausted(reason))) => {
                            warn!("{}: {}, dispatching before admitting {}", device.name(), reason, request);
                            summary.throttled += 1;
                            if device.dispatch().await? {
                                summary.dispatched += 1;
                            }
                            device.add_request(request.clone()).await?;
                        }
                        Err(e) => return Err(e),
                    }
                    summary.admitted += 1;
                }
                WorkloadOp::Dispatch => {
                    if device.dispatch().await? {
                        summary.dispatched += 1;
                    }
                }
                WorkloadOp::Drain => {
                    summary.dispatched += device.drain().await?;
                }
                WorkloadOp::Merge(sector) => match device.find_pending(*sector).await {
                    Some(id) => {
                        if device.merge(id).await.is_some() {
                            summary.merged += 1;
                        }
                    }
                    None => warn!("{}: no queued request at sector {} to merge", device.name(), sector),
                },
            }
        }

        Ok(summary)
    }
}

fn parse_line(line: &str) -> std::result::Result<WorkloadOp, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let keyword = fields[0].to_ascii_lowercase();

    let parse_number = |field: Option<&&str>, what: &str| -> std::result::Result<u64, String> {
        field
            .ok_or_else(|| format!("missing {}", what))?
            .parse::<u64>()
            .map_err(|e| format!("invalid {} {:?}: {}", what, field.copied().unwrap_or(""), e))
    };

    let op = match keyword.as_str() {
        "r" | "w" => {
            let direction = if keyword == "r" { Direction::Read } else { Direction::Write };
            let sector = parse_number(fields.get(1), "sector")?;
            let len = match fields.get(2) {
                Some(_) => parse_number(fields.get(2), "length")?,
                None => 1,
            };
            let len = u32::try_from(len)
                .ok()
                .filter(|len| *len > 0)
                .ok_or_else(|| format!("length {} out of range", len))?;
            if fields.len() > 3 {
                return Err(format!("unexpected trailing fields in {:?}", line));
            }
            WorkloadOp::Add(Request::new(direction, sector).with_len(len))
        }
        "dispatch" | "d" => WorkloadOp::Dispatch,
        "drain" => WorkloadOp::Drain,
        "merge" | "m" => WorkloadOp::Merge(parse_number(fields.get(1), "sector")?),
        other => return Err(format!("unknown op {:?}", other)),
    };

    if matches!(op, WorkloadOp::Dispatch | WorkloadOp::Drain) && fields.len() > 1 {
        return Err(format!("unexpected trailing fields in {:?}", line));
    }
    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ops_and_comments() {
        let workload = Workload::parse(
            "# warmup\nR 50\nw 20 8   # tail comment\n\ndispatch\nmerge 50\ndrain\n",
        )
        .unwrap();

        assert_eq!(
            workload.ops(),
            &[
                WorkloadOp::Add(Request::read(50)),
                WorkloadOp::Add(Request::write(20).with_len(8)),
                WorkloadOp::Dispatch,
                WorkloadOp::Merge(50),
                WorkloadOp::Drain,
            ]
        );
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = Workload::parse("R 1\nR -4\n").unwrap_err();
        assert!(matches!(err, ClookError::Workload { line: 2, .. }), "{}", err);
        assert!(err.to_string().starts_with("Workload error at line 2"));

        for bad in ["seek 10", "R", "W 1 0", "R 1 2 3", "drain now", "merge"] {
            assert!(Workload::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn random_is_reproducible() {
        let a = Workload::random(200, 4096, 42);
        let b = Workload::random(200, 4096, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 200);
        assert!(a.ops().iter().all(|op| match op {
            WorkloadOp::Add(rq) => rq.sector < 4096 && (1..=8).contains(&rq.nr_sectors),
            _ => true,
        }));
    }
}

use std::sync::Arc;

use flowfield_core::{GridPos, GridRect};

use super::request::Request;
use super::station::StationId;

/// The two kinds of work the scheduler knows.
#[derive(Debug, Clone)]
pub(crate) enum JobKind {
    /// Build the integration field for a whole request on a free station.
    BuildIntegration { rect: GridRect, target: GridPos },
    /// Derive flow vectors for `rows` rows starting at `start_row`.
    ComputeFlow {
        station: StationId,
        preferred_worker: usize,
        start_row: usize,
        rows: usize,
    },
}

/// A queued unit of work plus the request it serves.
#[derive(Debug, Clone)]
pub(crate) struct Job {
    pub kind: JobKind,
    pub request: Arc<Request>,
}

impl Job {
    pub(crate) fn build_integration(
        rect: GridRect,
        target: GridPos,
        request: Arc<Request>,
    ) -> Self {
        Self {
            kind: JobKind::BuildIntegration { rect, target },
            request,
        }
    }

    pub(crate) fn is_integration(&self) -> bool {
        matches!(self.kind, JobKind::BuildIntegration { .. })
    }
}

/// Split `height` rows into `(start_row, rows)` chunks of `ceil(height / parts)`
/// rows each; the last chunk takes the remainder.
pub(crate) fn row_chunks(height: usize, parts: usize) -> Vec<(usize, usize)> {
    if height == 0 {
        return Vec::new();
    }
    let chunk = height.div_ceil(parts.max(1));
    (0..height)
        .step_by(chunk)
        .map(|start| (start, chunk.min(height - start)))
        .collect()
}

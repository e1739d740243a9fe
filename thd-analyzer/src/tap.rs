//! Diagnostic stream dump over the published ring positions.
//!
//! The tap follows the `oldest`/`latest` slots of the [`SharedRegion`]
//! instead of the mailbox protocol, and reads the ring storage without its
//! lock, so it can run at any time without disturbing an analysis or the
//! sample interrupt. Positions may be a sample or two stale and samples
//! being overwritten may come back torn; the tap only feeds diagnostics,
//! never measurements.

use crate::ipc::SharedRegion;
use crate::ring::SharedRing;

/// Incremental reader of the sample ring.
pub struct StreamTap<'a> {
    region: &'a SharedRegion,
    /// Ring index of the next sample to hand out.
    cursor: Option<usize>,
}

impl<'a> StreamTap<'a> {
    pub fn new(region: &'a SharedRegion) -> Self {
        StreamTap {
            region,
            cursor: None,
        }
    }

    /// Copy samples published since the previous poll into `out`.
    ///
    /// Starts at the oldest sample on the first poll and whenever the
    /// history has moved past the cursor (cleared or overrun). Returns the
    /// number of samples copied; the rest is left for the next poll.
    pub fn poll<B: AsRef<[i32]> + AsMut<[i32]>>(&mut self, ring: &SharedRing<B>, out: &mut [i32]) -> usize {
        let oldest = self.region.oldest.load();
        let latest = self.region.latest.load();

        let from = match self.cursor {
            Some(cursor) if within(cursor, oldest, latest) => cursor,
            Some(cursor) => {
                log::debug!("stream tap lost position {}, resyncing at {}", cursor, oldest);
                oldest
            }
            None => oldest,
        };
        let (n, next) = ring.peek_span(from, latest, out);
        self.cursor = Some(next);
        n
    }

    /// Forget the position; the next poll starts at the oldest sample.
    pub fn reset(&mut self) {
        self.cursor = None;
    }
}

/// `true` if `pos` lies in the wrapping span `oldest..=latest`.
fn within(pos: usize, oldest: usize, latest: usize) -> bool {
    if oldest <= latest {
        (oldest..=latest).contains(&pos)
    } else {
        pos >= oldest || pos <= latest
    }
}

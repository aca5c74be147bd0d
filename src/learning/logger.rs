//! Training statistics for block summaries.
//!
//! Episodes are collected in blocks of a fixed size. When a block fills up,
//! a [`BlockSummary`] is produced and written to the log:
//!
//! ```text
//! 1000	avg = 2514, max = 9444, ops = 81736 (85.3 ms/episode)
//! 	48	100.0%	(3.1%)
//! 	96	96.9%	(22.4%)
//! 	192	74.5%	(51.0%)
//! 	384	23.5%	(21.7%)
//! 	768	1.8%	(1.8%)
//! ```
//!
//! Each tile row lists the tile value, the share of episodes that reached at
//! least that tile, and (in parentheses) the share whose largest tile was
//! exactly that tile. Rows start at the largest tile every episode reached.

use std::fmt;
use std::time::{Duration, Instant};

use crate::board::{tile_value, MAX_RANK};
use crate::learning::self_play::EpisodeResult;

/// Per-episode outcome kept for the current block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpisodeRecord {
    pub score: u32,
    pub max_rank: u8,
    /// Slides and placements
    pub actions: usize,
    pub elapsed: Duration,
}

impl From<&EpisodeResult> for EpisodeRecord {
    fn from(result: &EpisodeResult) -> Self {
        Self {
            score: result.score,
            max_rank: result.max_rank,
            actions: result.moves + result.placements,
            elapsed: result.elapsed,
        }
    }
}

/// Summary of one block of episodes
#[derive(Clone, Debug, PartialEq)]
pub struct BlockSummary {
    /// Episodes completed so far, this block included
    pub episodes_completed: usize,
    /// Episodes in this block
    pub block_size: usize,
    pub avg_score: f64,
    pub max_score: u32,
    /// Actions per second over the block
    pub ops: f64,
    /// Mean wall time per episode
    pub avg_episode_time: Duration,
    /// `(rank, reached, exact)` rates from the largest rank every episode
    /// reached up to the largest rank any episode reached
    pub tile_rates: Vec<(u8, f64, f64)>,
}

impl BlockSummary {
    /// Summarize `records`; `None` for an empty block.
    pub fn from_records(records: &[EpisodeRecord], episodes_completed: usize) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let n = records.len();
        let total_score: u64 = records.iter().map(|r| u64::from(r.score)).sum();
        let max_score = records.iter().map(|r| r.score).max().unwrap_or(0);
        let total_actions: usize = records.iter().map(|r| r.actions).sum();
        let total_time: Duration = records.iter().map(|r| r.elapsed).sum();

        let mut exact = [0usize; MAX_RANK as usize + 1];
        for record in records {
            exact[record.max_rank as usize] += 1;
        }
        let lowest = records.iter().map(|r| r.max_rank).min().unwrap_or(0);
        let highest = records.iter().map(|r| r.max_rank).max().unwrap_or(0);

        let mut tile_rates = Vec::new();
        let mut reached = n;
        for rank in lowest..=highest {
            let count = exact[rank as usize];
            tile_rates.push((rank, reached as f64 / n as f64, count as f64 / n as f64));
            reached -= count;
        }

        let secs = total_time.as_secs_f64();
        Some(Self {
            episodes_completed,
            block_size: n,
            avg_score: total_score as f64 / n as f64,
            max_score,
            ops: if secs > 0.0 {
                total_actions as f64 / secs
            } else {
                0.0
            },
            avg_episode_time: total_time / n as u32,
            tile_rates,
        })
    }
}

impl fmt::Display for BlockSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\tavg = {:.0}, max = {}, ops = {:.0} ({:.1} ms/episode)",
            self.episodes_completed,
            self.avg_score,
            self.max_score,
            self.ops,
            self.avg_episode_time.as_secs_f64() * 1000.0
        )?;
        for &(rank, reached, exact) in &self.tile_rates {
            if rank == 0 {
                continue;
            }
            write!(
                f,
                "\n\t{}\t{:.1}%\t({:.1}%)",
                tile_value(rank),
                reached * 100.0,
                exact * 100.0
            )?;
        }
        Ok(())
    }
}

/// Collects episode records and summarizes them block by block
#[derive(Debug)]
pub struct TrainingStatistics {
    total: usize,
    block: usize,
    completed: usize,
    records: Vec<EpisodeRecord>,
    start_time: Instant,
}

impl TrainingStatistics {
    /// Statistics for `total` episodes summarized every `block` episodes
    /// (a block of 0 is treated as 1).
    pub fn new(total: usize, block: usize) -> Self {
        let block = block.max(1);
        Self {
            total,
            block,
            completed: 0,
            records: Vec::with_capacity(block),
            start_time: Instant::now(),
        }
    }

    /// Add a finished episode.
    ///
    /// # Returns
    ///
    /// The block summary when this episode completes a block or the run;
    /// the summary has already been logged.
    pub fn push(&mut self, record: EpisodeRecord) -> Option<BlockSummary> {
        self.records.push(record);
        self.completed += 1;

        if self.records.len() < self.block && !self.is_finished() {
            return None;
        }

        let summary = BlockSummary::from_records(&self.records, self.completed);
        self.records.clear();
        if let Some(summary) = &summary {
            log::info!("{}", summary);
        }
        summary
    }

    /// Episodes completed so far
    #[inline]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// True once `total` episodes have been pushed
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

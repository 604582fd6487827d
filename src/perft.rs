//! Perft: count the leaf nodes of the legal move tree to a fixed depth.
//!
//! Used to prove the move generator correct against published counts and to
//! measure its throughput.

use std::fmt;
use std::time::{Duration, Instant};

use color_eyre::eyre::{Result, WrapErr};
use itertools::Itertools;
use rayon::prelude::*;

use crate::board::{Board, STARTING_FEN};
use crate::movegen::{count_legal, generate_pseudo_legal, legal_moves};
use crate::movelist::MoveList;
use crate::perft_tt::PerftCache;
use crate::tables::Tables;
use crate::types::Move;

/// Number of leaf nodes `depth` plies below `board`. Depth 0 counts the root
/// itself.
pub fn perft(tables: &Tables, board: &Board, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    if depth == 1 {
        return count_legal(tables, board) as u64;
    }

    let us = board.side_to_move();
    let mut list = MoveList::new();
    generate_pseudo_legal(tables, board, &mut list);

    let mut nodes = 0;
    for mv in &list {
        let mut child = board.clone();
        child.play_move(tables, mv);
        if child.is_king_checked(tables, us) {
            continue;
        }
        nodes += perft(tables, &child, depth - 1);
    }
    nodes
}

/// [`perft`] with every subtree count of depth >= 1 memoized in `cache`.
pub fn perft_cached(tables: &Tables, board: &Board, depth: u8, cache: &mut PerftCache) -> u64 {
    if depth == 0 {
        return 1;
    }
    if let Some(nodes) = cache.probe(board.hash(), depth) {
        return nodes;
    }

    let nodes = if depth == 1 {
        count_legal(tables, board) as u64
    } else {
        let us = board.side_to_move();
        let mut list = MoveList::new();
        generate_pseudo_legal(tables, board, &mut list);

        let mut nodes = 0;
        for mv in &list {
            let mut child = board.clone();
            child.play_move(tables, mv);
            if child.is_king_checked(tables, us) {
                continue;
            }
            nodes += perft_cached(tables, &child, depth - 1, cache);
        }
        nodes
    };

    cache.store(board.hash(), depth, nodes);
    nodes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerftOptions {
    pub use_cache: bool,
    /// Cache size in megabytes. `None` sizes it from the depth.
    pub cache_mb: Option<usize>,
    /// Count root moves on the rayon thread pool, one cache per root move
    pub parallel: bool,
}

impl Default for PerftOptions {
    fn default() -> Self {
        PerftOptions {
            use_cache: true,
            cache_mb: None,
            parallel: false,
        }
    }
}

impl PerftOptions {
    fn new_cache(&self, depth: u8) -> Option<PerftCache> {
        if !self.use_cache {
            return None;
        }
        Some(match self.cache_mb {
            Some(mb) => PerftCache::new(mb),
            None => PerftCache::for_depth(depth),
        })
    }

    fn count(
        &self,
        tables: &Tables,
        board: &Board,
        depth: u8,
        cache: &mut Option<PerftCache>,
    ) -> u64 {
        match cache {
            Some(cache) => perft_cached(tables, board, depth, cache),
            None => perft(tables, board, depth),
        }
    }
}

/// Per-root-move breakdown of a perft run
#[derive(Debug, Clone)]
pub struct PerftReport {
    pub depth: u8,
    pub moves: Vec<(Move, u64)>,
    pub nodes: u64,
    pub elapsed: Duration,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl PerftReport {
    /// Nodes per second
    pub fn nps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.nodes as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for PerftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .moves
            .iter()
            .sorted_by_key(|(mv, _)| mv.to_uci())
            .map(|(mv, nodes)| format!("{}: {}", mv, nodes))
            .join("\n");
        if !lines.is_empty() {
            writeln!(f, "{}\n", lines)?;
        }
        writeln!(f, "Nodes searched: {}", self.nodes)?;
        writeln!(f, "Time: {:.3}s", self.elapsed.as_secs_f64())?;
        write!(f, "NPS: {:.0}", self.nps())
    }
}

/// Perft split by root move, timed.
pub fn divide(tables: &Tables, board: &Board, depth: u8, options: &PerftOptions) -> PerftReport {
    let start = Instant::now();

    if depth == 0 {
        return PerftReport {
            depth,
            moves: Vec::new(),
            nodes: 1,
            elapsed: start.elapsed(),
            cache_hits: 0,
            cache_misses: 0,
        };
    }

    let root_moves: Vec<Move> = legal_moves(tables, board).iter().collect();
    let count_move = |mv: Move, cache: &mut Option<PerftCache>| {
        let mut child = board.clone();
        child.play_move(tables, mv);
        options.count(tables, &child, depth - 1, cache)
    };
    let stats = |cache: &Option<PerftCache>| cache.as_ref().map_or((0, 0), |c| (c.hits, c.misses));

    let results: Vec<(Move, u64, (u64, u64))> = if options.parallel {
        root_moves
            .par_iter()
            .map(|&mv| {
                // each root branch owns its cache, so no slot is shared between threads
                let mut cache = options.new_cache(depth - 1);
                let nodes = count_move(mv, &mut cache);
                (mv, nodes, stats(&cache))
            })
            .collect()
    } else {
        let mut cache = options.new_cache(depth);
        let mut results = Vec::with_capacity(root_moves.len());
        for &mv in &root_moves {
            let before = stats(&cache);
            let nodes = count_move(mv, &mut cache);
            let after = stats(&cache);
            results.push((mv, nodes, (after.0 - before.0, after.1 - before.1)));
        }
        results
    };

    let nodes: u64 = results.iter().map(|(_, n, _)| n).sum();
    let cache_hits: u64 = results.iter().map(|(_, _, (h, _))| h).sum();
    let cache_misses: u64 = results.iter().map(|(_, _, (_, m))| m).sum();
    PerftReport {
        depth,
        moves: results.into_iter().map(|(mv, n, _)| (mv, n)).collect(),
        nodes,
        elapsed: start.elapsed(),
        cache_hits,
        cache_misses,
    }
}

/// A position with published perft counts
#[derive(Debug, Clone, Copy)]
pub struct ReferencePosition {
    pub name: &'static str,
    pub fen: &'static str,
    /// `counts[d - 1]` is the node count at depth `d`
    pub counts: &'static [u64],
}

/// The standard perft test positions.
///
/// https://www.chessprogramming.org/Perft_Results
pub const REFERENCE_POSITIONS: [ReferencePosition; 6] = [
    ReferencePosition {
        name: "start",
        fen: STARTING_FEN,
        counts: &[20, 400, 8_902, 197_281, 4_865_609, 119_060_324],
    },
    ReferencePosition {
        name: "kiwipete",
        fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        counts: &[48, 2_039, 97_862, 4_085_603, 193_690_690],
    },
    ReferencePosition {
        name: "position 3",
        fen: "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        counts: &[14, 191, 2_812, 43_238, 674_624, 11_030_083],
    },
    ReferencePosition {
        name: "position 4",
        fen: "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        counts: &[6, 264, 9_467, 422_333, 15_833_292],
    },
    ReferencePosition {
        name: "position 5",
        fen: "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        counts: &[44, 1_486, 62_379, 2_103_487, 89_941_194],
    },
    ReferencePosition {
        name: "position 6",
        fen: "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
        counts: &[46, 2_079, 89_890, 3_894_594, 164_075_551],
    },
];

#[derive(Debug, Clone)]
pub struct SuiteResult {
    pub name: &'static str,
    pub depth: u8,
    pub expected: u64,
    pub report: PerftReport,
}

impl SuiteResult {
    pub fn passed(&self) -> bool {
        self.report.nodes == self.expected
    }
}

impl fmt::Display for SuiteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<12} depth {}: {:>12} (expected {:>12}) {:>8.3}s  {}",
            self.name,
            self.depth,
            self.report.nodes,
            self.expected,
            self.report.elapsed.as_secs_f64(),
            if self.passed() { "ok" } else { "FAILED" }
        )
    }
}

/// Run every reference position at each depth up to `max_depth`.
pub fn run_suite(
    tables: &Tables,
    max_depth: u8,
    options: &PerftOptions,
) -> Result<Vec<SuiteResult>> {
    let mut results = Vec::new();
    for position in &REFERENCE_POSITIONS {
        let board = Board::from_fen(position.fen)
            .wrap_err_with(|| format!("parsing reference position {}", position.name))?;
        for (i, &expected) in position.counts.iter().enumerate().take(max_depth as usize) {
            let depth = i as u8 + 1;
            results.push(SuiteResult {
                name: position.name,
                depth,
                expected,
                report: divide(tables, &board, depth, options),
            });
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::shared;
    use pretty_assertions::assert_eq;

    fn reference(name: &str) -> (Board, &'static [u64]) {
        let position = REFERENCE_POSITIONS
            .iter()
            .find(|p| p.name == name)
            .unwrap();
        (Board::from_fen(position.fen).unwrap(), position.counts)
    }

    #[test]
    fn perft_start() {
        let tables = shared().unwrap();
        let board = Board::starting_position();
        assert_eq!(perft(tables, &board, 0), 1);
        for (depth, expected) in [(1, 20), (2, 400), (3, 8_902), (4, 197_281)] {
            assert_eq!(perft(tables, &board, depth), expected, "start depth {}", depth);
        }
    }

    #[test]
    fn perft_cached_matches_uncached() {
        let tables = shared().unwrap();
        for name in ["start", "kiwipete", "position 3", "position 4", "position 5", "position 6"] {
            let (board, counts) = reference(name);
            let mut cache = PerftCache::with_entries(1 << 16);
            for depth in 1..=3u8 {
                let plain = perft(tables, &board, depth);
                assert_eq!(plain, counts[depth as usize - 1], "{} depth {}", name, depth);
                assert_eq!(perft_cached(tables, &board, depth, &mut cache), plain);
            }
            // the root is stored last, so a repeat is answered from the cache
            let hits = cache.hits;
            assert_eq!(perft_cached(tables, &board, 3, &mut cache), counts[2]);
            assert_eq!(cache.hits, hits + 1, "{}: root should hit", name);
        }
    }

    #[test]
    fn perft_cached_with_tiny_cache() {
        // constant overwriting must never corrupt counts
        let tables = shared().unwrap();
        let (board, counts) = reference("kiwipete");
        let mut cache = PerftCache::with_entries(2);
        assert_eq!(perft_cached(tables, &board, 3, &mut cache), counts[2]);
    }

    #[test]
    fn divide_sums_to_perft() {
        let tables = shared().unwrap();
        let (board, counts) = reference("position 3");
        let report = divide(tables, &board, 4, &PerftOptions::default());
        assert_eq!(report.moves.len(), 14);
        assert_eq!(report.nodes, counts[3]);
        for (mv, nodes) in &report.moves {
            let mut child = board.clone();
            child.play_move(tables, *mv);
            assert_eq!(*nodes, perft(tables, &child, 3));
        }
    }

    #[test]
    fn divide_depth_zero_counts_root() {
        let tables = shared().unwrap();
        let report = divide(tables, &Board::starting_position(), 0, &PerftOptions::default());
        assert_eq!(report.nodes, 1);
        assert!(report.moves.is_empty());
    }

    #[test]
    fn parallel_divide_matches_sequential() {
        let tables = shared().unwrap();
        let (board, _) = reference("kiwipete");
        let sequential = divide(tables, &board, 3, &PerftOptions::default());
        let parallel = divide(
            tables,
            &board,
            3,
            &PerftOptions {
                parallel: true,
                cache_mb: Some(1),
                ..PerftOptions::default()
            },
        );
        let uncached = divide(
            tables,
            &board,
            3,
            &PerftOptions {
                use_cache: false,
                ..PerftOptions::default()
            },
        );
        assert_eq!(parallel.nodes, 97_862);
        assert_eq!(sequential.moves, parallel.moves);
        assert_eq!(sequential.moves, uncached.moves);
        assert_eq!(uncached.cache_hits + uncached.cache_misses, 0);
    }

    #[test]
    fn report_lists_moves_sorted() {
        let tables = shared().unwrap();
        let report = divide(tables, &Board::starting_position(), 1, &PerftOptions::default());
        let text = report.to_string();
        let first = text.lines().next().unwrap();
        assert_eq!(first, "a2a3: 1");
        assert!(text.contains("Nodes searched: 20"));
    }

    #[test]
    fn incremental_hash_matches_full_hash_in_tree() {
        fn walk(tables: &Tables, board: &Board, depth: u8) {
            assert_eq!(board.hash(), board.compute_hash(), "{:?}", board);
            if depth == 0 {
                return;
            }
            for mv in &legal_moves(tables, board) {
                let mut child = board.clone();
                child.play_move(tables, mv);
                walk(tables, &child, depth - 1);
            }
        }

        let tables = shared().unwrap();
        for name in ["kiwipete", "position 4", "position 5"] {
            let (board, _) = reference(name);
            walk(tables, &board, 3);
        }
    }

    #[test]
    fn suite_passes_at_shallow_depth() {
        let tables = shared().unwrap();
        let results = run_suite(tables, 2, &PerftOptions::default()).unwrap();
        assert_eq!(results.len(), 12);
        for result in &results {
            assert!(result.passed(), "{}", result);
        }
    }
}

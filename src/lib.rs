pub mod bitboard;
pub mod board;
pub mod magic;
pub mod movegen;
pub mod movelist;
pub mod perft;
pub mod perft_tt;
pub mod table_file;
pub mod tables;
pub mod types;
pub mod zobrist;

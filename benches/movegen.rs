use criterion::{black_box, criterion_group, criterion_main, Criterion};
use magic_movegen::board::Board;
use magic_movegen::magic::{slider_attacks_slow, Slider, SliderTable};
use magic_movegen::movegen::legal_moves;
use magic_movegen::perft::{perft, perft_cached};
use magic_movegen::perft_tt::PerftCache;
use magic_movegen::tables::shared;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

pub fn bench_slider_lookup(c: &mut Criterion) {
    let tables = shared().unwrap();
    let occupied = 0x0042_0018_2400_8100u64;
    c.bench_function("rook lookup, all squares", |b| {
        b.iter(|| {
            (0..64u8).fold(0u64, |acc, sq| acc ^ tables.rook_attacks(sq, black_box(occupied)))
        })
    });
    c.bench_function("rook ray trace, all squares", |b| {
        b.iter(|| {
            (0..64u8).fold(0u64, |acc, sq| {
                acc ^ slider_attacks_slow(Slider::Rook, sq, black_box(occupied))
            })
        })
    });
}

pub fn bench_legal_moves_from_kiwipete(c: &mut Criterion) {
    let tables = shared().unwrap();
    let bo = Board::from_fen(KIWIPETE).unwrap();
    c.bench_function("legal moves from kiwipete", |b| {
        b.iter(|| legal_moves(tables, black_box(&bo)))
    });
}

pub fn bench_perft(c: &mut Criterion) {
    let tables = shared().unwrap();
    let start = Board::starting_position();
    let kiwipete = Board::from_fen(KIWIPETE).unwrap();

    let mut group = c.benchmark_group("perft");
    group.sample_size(10);
    group.bench_function("start 4 ply", |b| {
        b.iter(|| perft(tables, black_box(&start), 4))
    });
    group.bench_function("kiwipete 3 ply", |b| {
        b.iter(|| perft(tables, black_box(&kiwipete), 3))
    });
    group.bench_function("kiwipete 3 ply cached", |b| {
        b.iter(|| {
            let mut cache = PerftCache::for_depth(3);
            perft_cached(tables, black_box(&kiwipete), 3, &mut cache)
        })
    });
    group.finish();
}

pub fn bench_magic_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("magic search");
    group.sample_size(10);
    group.bench_function("bishop table", |b| {
        b.iter(|| SliderTable::build(black_box(Slider::Bishop)).unwrap())
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_slider_lookup,
    bench_legal_moves_from_kiwipete,
    bench_perft,
    bench_magic_search,
);
criterion_main!(benches);

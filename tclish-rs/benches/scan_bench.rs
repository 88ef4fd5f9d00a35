use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tclish::script::scan::scan;
use tclish::script::stmt;
use tclish::script::value::{pack, unpack};
use tclish::script::{Interpreter, Task};

fn make_script(repeats: usize) -> String {
    let chunk = "set total [+ $total [lindex {'1''2''3'} 2]] ; # running sum\n\
                 if [> $total 10] {print \"big: $total\"} else {puts 'small'}\n";
    chunk.repeat(repeats)
}

fn scan_all(text: &str) -> usize {
    let mut pos = 0;
    let mut tokens = 0;
    let bytes = text.as_bytes();
    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        match scan(text, pos) {
            Ok(end) => pos = end,
            Err(_) => pos += 1,
        }
        tokens += 1;
    }
    tokens
}

fn bench_scan(c: &mut Criterion) {
    let small = make_script(10);
    let large = make_script(1000);

    let mut g = c.benchmark_group("scanner");
    g.bench_function("scan_small", |b| b.iter(|| scan_all(black_box(&small))));
    g.bench_function("scan_large", |b| b.iter(|| scan_all(black_box(&large))));
    g.bench_function("split_small", |b| b.iter(|| stmt::split(black_box(&small)).map(|s| s.len())));
    g.bench_function("split_large", |b| b.iter(|| stmt::split(black_box(&large)).map(|s| s.len())));
    g.finish();
}

fn bench_lists(c: &mut Criterion) {
    let items: Vec<String> = (0..1000).map(|i| format!("item {i} with 'quotes'")).collect();
    let packed = pack(&items);

    let mut g = c.benchmark_group("lists");
    g.bench_function("pack_1000", |b| b.iter(|| pack(black_box(&items))));
    g.bench_function("unpack_1000", |b| b.iter(|| unpack(black_box(&packed))));
    g.finish();
}

fn bench_eval(c: &mut Criterion) {
    let src = "set n 0 ; foreach i [range 200] {set n [+ $n $i]} ; get n";
    c.bench_function("eval_loop_200", |b| {
        b.iter(|| {
            let mut interp = Interpreter::new();
            let mut task = Task::default();
            interp.evaluate(&mut task, black_box(src), Vec::new(), None)
        })
    });
}

criterion_group!(benches, bench_scan, bench_lists, bench_eval);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use ton_cells::dict::keys::UintKey;
use ton_cells::dict::values::UintValue;
use ton_cells::dict::Dictionary;

fn build_dict_impl(id: BenchmarkId, key_bits: u16, num_elements: usize, c: &mut Criterion) {
    let mut rng = rand_xorshift::XorShiftRng::from_seed([0u8; 16]);

    let mask = if key_bits < 64 {
        (1u64 << key_bits) - 1
    } else {
        u64::MAX
    };
    let values = (0..num_elements)
        .map(|_| (rng.gen::<u64>() & mask, rng.gen::<u64>()))
        .collect::<Vec<_>>();

    c.bench_with_input(id, &values, |b, values| {
        b.iter(|| {
            let mut dict = Dictionary::new(UintKey::new(key_bits), UintValue::new(64));
            for (key, value) in values {
                dict.set(*key, *value).unwrap();
            }
            black_box(dict.build_root().unwrap());
        });
    });
}

fn build_dict_group(c: &mut Criterion) {
    macro_rules! decl_dict_benches {
        ($({ $n:literal, $bits:literal }),*$(,)?) => {
            $({
                let id = BenchmarkId::new(
                    "build_dict",
                    format!("size={}; key=uint{}", $n, $bits),
                );
                build_dict_impl(id, $bits, $n, c);
            });*
        };
    }

    decl_dict_benches![
        { 10, 8 },
        { 256, 8 },

        { 10, 16 },
        { 100, 16 },
        { 256, 16 },
        { 10000, 16 },

        { 10, 32 },
        { 100, 32 },
        { 1000, 32 },

        { 10, 64 },
        { 100, 64 },
        { 1000, 64 },
    ];
}

fn parse_dict_group(c: &mut Criterion) {
    let mut rng = rand_xorshift::XorShiftRng::from_seed([0u8; 16]);

    for size in [10, 100, 1000] {
        let mut dict = Dictionary::new(UintKey::new(32), UintValue::new(64));
        for _ in 0..size {
            dict.set(rng.gen::<u32>() as u64, rng.gen::<u64>())
                .unwrap();
        }
        let root = dict.build_root().unwrap().unwrap();

        let id = BenchmarkId::new("parse_dict", format!("size={size}; key=uint32"));
        c.bench_with_input(id, &root, |b, root| {
            b.iter(|| {
                let dict = Dictionary::load_direct(
                    UintKey::new(32),
                    UintValue::new(64),
                    &mut root.begin_parse(),
                )
                .unwrap();
                black_box(dict);
            });
        });
    }
}

criterion_group!(build_dict, build_dict_group, parse_dict_group);
criterion_main!(build_dict);

use divan::AllocProfiler;
use mw_esm::types::{HEADER_META_TAG, HEADER_TAG, RECORD_COUNT_OFFSET};
use mw_esm::{write_plugin, FieldValue, Plugin, Record, SubRecord, TypeTag};
use std::io::Cursor;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

const STAT: TypeTag = TypeTag(*b"STAT");
const NAME: TypeTag = TypeTag(*b"NAME");
const MODL: TypeTag = TypeTag(*b"MODL");

fn sample_plugin(records: usize) -> Plugin {
    let mut plugin = Plugin::new();

    let mut header = Record::new(HEADER_TAG);
    let meta = header.add_sub_record(SubRecord::new(HEADER_META_TAG));
    meta.pack(FieldValue::Float(1.3), 0, 4).unwrap();
    meta.pack(FieldValue::Str("bench".into()), 8, 32).unwrap();
    meta.pack(FieldValue::Long(0), RECORD_COUNT_OFFSET, 4)
        .unwrap();
    plugin.add_record(header);

    for i in 0..records {
        let mut stat = Record::new(STAT);
        stat.add_sub_record(SubRecord::new(NAME))
            .set_string(&format!("static_{i}"));
        stat.add_sub_record(SubRecord::new(MODL))
            .set_string(&format!("meshes/static_{i}.nif"));
        plugin.add_record(stat);
    }

    plugin
}

fn sample_bytes(records: usize) -> Vec<u8> {
    let mut image = Cursor::new(Vec::new());
    write_plugin(&mut sample_plugin(records), &mut image).unwrap();
    image.into_inner()
}

pub mod read {
    use divan::Bencher;
    use mw_esm::{read_plugin, Plugin, TypeFilter};
    use std::io::Cursor;

    use crate::{sample_bytes, STAT};

    #[divan::bench]
    fn decode_all(bencher: Bencher) {
        bencher
            .with_inputs(|| sample_bytes(1_000))
            .bench_refs(|data| {
                let mut plugin = Plugin::new();
                read_plugin(&mut plugin, Cursor::new(data), &TypeFilter::All).unwrap();
                divan::black_box(plugin);
            });
    }

    #[divan::bench]
    fn decode_selective(bencher: Bencher) {
        bencher
            .with_inputs(|| sample_bytes(1_000))
            .bench_refs(|data| {
                let mut plugin = Plugin::new();
                read_plugin(
                    &mut plugin,
                    Cursor::new(data),
                    &TypeFilter::only([STAT]),
                )
                .unwrap();
                divan::black_box(plugin);
            });
    }

    #[divan::bench]
    fn decode_header_only(bencher: Bencher) {
        bencher
            .with_inputs(|| sample_bytes(1_000))
            .bench_refs(|data| {
                let mut plugin = Plugin::new();
                read_plugin(&mut plugin, Cursor::new(data), &TypeFilter::only([])).unwrap();
                divan::black_box(plugin);
            });
    }
}

pub mod write {
    use divan::Bencher;
    use mw_esm::write_plugin;
    use std::io::Cursor;

    use crate::sample_plugin;

    #[divan::bench]
    fn encode_all(bencher: Bencher) {
        bencher
            .with_inputs(|| sample_plugin(1_000))
            .bench_values(|mut plugin| {
                let mut image = Cursor::new(Vec::new());
                write_plugin(&mut plugin, &mut image).unwrap();
                divan::black_box(image.into_inner());
            });
    }
}

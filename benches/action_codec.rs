use criterion::{criterion_group, criterion_main, Criterion};
use groups_relay_core::action::Action;
use groups_relay_core::kind::{KIND_GROUP_ADD_USER_9000, KIND_GROUP_EDIT_METADATA_9002};
use nostr::{EventBuilder, Keys, Tag, TagKind};
use std::hint::black_box;

fn benchmark(c: &mut Criterion) {
    let keys = Keys::generate();
    let target = Keys::generate().public_key();

    let put_user = EventBuilder::new(KIND_GROUP_ADD_USER_9000, "")
        .tags(vec![
            Tag::custom(TagKind::h(), ["g1"]),
            Tag::custom(TagKind::p(), [target.to_hex(), "member".to_string()]),
        ])
        .sign_with_keys(&keys)
        .unwrap();

    let edit_metadata = EventBuilder::new(KIND_GROUP_EDIT_METADATA_9002, "")
        .tags(vec![
            Tag::custom(TagKind::h(), ["g1"]),
            Tag::custom(TagKind::Custom("name".into()), ["new name"]),
            Tag::custom(TagKind::Custom("about".into()), ["about text"]),
        ])
        .sign_with_keys(&keys)
        .unwrap();

    let mut group = c.benchmark_group("action_codec_decode");
    group.bench_function("put_user", |b| {
        b.iter(|| black_box(Action::decode(black_box(&put_user)).unwrap()))
    });
    group.bench_function("edit_metadata", |b| {
        b.iter(|| black_box(Action::decode(black_box(&edit_metadata)).unwrap()))
    });
    group.finish();
}

criterion_group!(benches, benchmark);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use crmdesk::identity::{authorize, Action, Ownership, ResourceKind, Role};

fn bench_authorizer(c: &mut Criterion) {
    let mut cases = Vec::new();
    for role in Role::ALL {
        for action in Action::ALL {
            for resource in ResourceKind::ALL {
                for owner in [false, true] {
                    cases.push((role, action, resource, Ownership { actor_is_owner: owner }));
                }
            }
        }
    }

    let mut group = c.benchmark_group("authorizer");
    group.throughput(Throughput::Elements(cases.len() as u64));
    group.bench_function("full_table", |b| {
        b.iter(|| {
            let mut allowed = 0usize;
            for &(role, action, resource, ownership) in &cases {
                if authorize(role, action, resource, ownership).allow { allowed += 1; }
            }
            criterion::black_box(allowed);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_authorizer);
criterion_main!(benches);

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use specgate::plugins::{migrations, models, spec::SpecDocument};
use std::fs;
use std::hint::black_box;
use std::time::Duration;
use tempfile::TempDir;

/// A synthetic models tree: one mixin module plus `n` mapped classes, each
/// inheriting the mixins and pointing a foreign key at the previous table.
fn model_tree(n: usize) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("app/db");
    let models = tmp.path().join("app/models");
    fs::create_dir_all(&db).unwrap();
    fs::create_dir_all(&models).unwrap();
    fs::write(
        db.join("mixins.py"),
        "class IDMixin:\n    id = Column(Integer, primary_key=True)\n\nclass TimestampMixin:\n    created_at = Column(DateTime)\n    updated_at = Column(DateTime)\n",
    )
    .unwrap();
    for i in 0..n {
        let fk = if i == 0 {
            String::new()
        } else {
            format!("    parent_id = Column(Integer, ForeignKey(\"table_{}.id\"))\n", i - 1)
        };
        fs::write(
            models.join(format!("model_{:04}.py", i)),
            format!(
                "class Model{i}(Base, IDMixin, TimestampMixin):\n    __tablename__ = \"table_{i}\"\n    name: Mapped[str] = mapped_column(String(80))\n{fk}"
            ),
        )
        .unwrap();
    }
    tmp
}

fn migration_tree(n: usize) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let versions = tmp.path().join("alembic/versions");
    fs::create_dir_all(&versions).unwrap();
    for i in 0..n {
        fs::write(
            versions.join(format!("{:04}_rev.py", i)),
            format!(
                "def upgrade():\n    op.create_table(\"t_{i}\", sa.Column(\"id\", sa.Integer()), sa.Column(\"name\", sa.String()))\n\ndef downgrade():\n    op.drop_table(\"t_{i}\")\n"
            ),
        )
        .unwrap();
    }
    tmp
}

fn bench_model_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_extraction");
    group.measurement_time(Duration::from_secs(10));

    for n in [10usize, 100] {
        let tree = model_tree(n);
        let dirs = vec![tree.path().join("app/models"), tree.path().join("app/db")];
        group.bench_with_input(BenchmarkId::new("extract_and_resolve", n), &n, |b, _| {
            b.iter(|| {
                let index = models::extract_models(tree.path(), &dirs);
                black_box(index.resolve_tables());
            });
        });
    }
    group.finish();
}

fn bench_migration_ledger(c: &mut Criterion) {
    let tree = migration_tree(50);
    let dirs = vec![tree.path().join("alembic/versions")];
    c.bench_function("migration_ledger_50", |b| {
        b.iter(|| black_box(migrations::extract_migrations(tree.path(), &dirs)));
    });
}

fn bench_spec_parse(c: &mut Criterion) {
    let mut doc = String::new();
    for i in 0..200 {
        doc.push_str(&format!(
            "### `table_{i}`\n\n| Column | Type |\n|---|---|\n| `id` | Integer |\n| `name` | String |\n\nSee `app/models/model_{i}.py`.\n\n"
        ));
    }
    c.bench_function("spec_parse_200_tables", |b| {
        b.iter(|| black_box(SpecDocument::parse(&doc)));
    });
}

criterion_group!(
    benches,
    bench_model_extraction,
    bench_migration_ledger,
    bench_spec_parse
);
criterion_main!(benches);

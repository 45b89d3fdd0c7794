//! Performance benchmarks for strata-core structural operations
//!
//! Run with: `cargo bench -p strata-core`
//!
//! These benchmarks measure the cascading paths:
//! - Bulk outline import (depth-first, 1000+ locations)
//! - Subtree move across a whole level (renumbering every level below)
//! - Subtree delete with gap closing
//! - Level insertion (one placeholder per parent)

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use strata_core::content::ContentRegistry;
use strata_core::db::MemoryStore;
use strata_core::models::{level_labels, MoveLocationParams, OutlineNode, Text};
use strata_core::{EngineConfig, StructureService};
use tokio::runtime::Runtime;

/// Setup a service over a fresh in-memory store
fn setup_service() -> StructureService {
    StructureService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(ContentRegistry::new()),
        EngineConfig::default(),
    )
    .unwrap()
}

/// Outline with `chapters` × `paragraphs` × `sentences` locations
fn generate_outline(chapters: usize, paragraphs: usize, sentences: usize) -> Vec<OutlineNode> {
    (0..chapters)
        .map(|c| {
            OutlineNode::branch(
                format!("Chapter {}", c + 1),
                (0..paragraphs)
                    .map(|p| {
                        OutlineNode::branch(
                            format!("{}.{}", c + 1, p + 1),
                            (0..sentences)
                                .map(|s| OutlineNode::leaf(format!("{}.{}.{}", c + 1, p + 1, s + 1)))
                                .collect(),
                        )
                    })
                    .collect(),
            )
        })
        .collect()
}

async fn setup_book(service: &StructureService, outline: Vec<OutlineNode>) -> Text {
    let text = service
        .create_text(
            "Benchmark",
            vec![
                level_labels("en", "Chapter"),
                level_labels("en", "Paragraph"),
                level_labels("en", "Sentence"),
            ],
            0,
        )
        .await
        .unwrap();
    service.import_structure(&text.id, outline).await.unwrap();
    text
}

/// Benchmark bulk import throughput
///
/// 20 chapters × 10 paragraphs × 5 sentences = 1220 locations
fn bench_import(c: &mut Criterion) {
    strata_core::init_tracing("strata_core=error");
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("import");
    group.sample_size(10); // Fewer samples for expensive operations

    group.bench_function("1220_locations", |b| {
        let outline = generate_outline(20, 10, 5);

        b.iter_custom(|iters| {
            rt.block_on(async {
                let mut total = std::time::Duration::ZERO;

                for _ in 0..iters {
                    let service = setup_service();

                    let start = std::time::Instant::now();
                    let text = setup_book(&service, outline.clone()).await;
                    total += start.elapsed();

                    black_box(text);
                }

                total
            })
        });
    });

    group.finish();
}

/// Benchmark moving the first chapter to the end
///
/// Every location on every level is renumbered.
fn bench_move_subtree(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("move_first_chapter_to_end", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let service = setup_service();
                let text = setup_book(&service, generate_outline(20, 10, 5)).await;

                let start = std::time::Instant::now();
                for _ in 0..iters {
                    let first = service.get_level(&text.id, 0).await.unwrap()[0].id.clone();
                    let moved = service
                        .move_location(MoveLocationParams {
                            id: first,
                            new_position: 19,
                            insert_after: true,
                            new_parent_id: None,
                        })
                        .await
                        .unwrap();
                    black_box(moved);
                }
                start.elapsed()
            })
        });
    });
}

/// Benchmark subtree delete with gap closing on every level
fn bench_delete_subtree(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("delete");
    group.sample_size(10);

    group.bench_function("middle_chapter", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let mut total = std::time::Duration::ZERO;

                for _ in 0..iters {
                    let service = setup_service();
                    let text = setup_book(&service, generate_outline(20, 10, 5)).await;
                    let middle = service.get_level(&text.id, 0).await.unwrap()[10].id.clone();

                    let start = std::time::Instant::now();
                    let summary = service.delete_location(&middle).await.unwrap();
                    total += start.elapsed();

                    black_box(summary);
                }

                total
            })
        });
    });

    group.finish();
}

/// Benchmark inserting a level under 200 paragraphs
fn bench_insert_level(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("levels");
    group.sample_size(10);

    group.bench_function("insert_level_2", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let mut total = std::time::Duration::ZERO;

                for _ in 0..iters {
                    let service = setup_service();
                    let text = setup_book(&service, generate_outline(20, 10, 5)).await;

                    let start = std::time::Instant::now();
                    let updated = service
                        .insert_level(&text.id, 2, level_labels("en", "Clause"))
                        .await
                        .unwrap();
                    total += start.elapsed();

                    black_box(updated);
                }

                total
            })
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_import,
    bench_move_subtree,
    bench_delete_subtree,
    bench_insert_level
);
criterion_main!(benches);

//! Ginkgo Example Suite
//!
//! A small library model specified with nested containers, hooks, a pending
//! spec and a benchmark.
//!
//! Run with:
//!   cargo run --example library                                  # Random order
//!   cargo run --example library -- --ginkgo.seed=7               # Reproduce an order
//!   cargo run --example library -- --ginkgo.focus=Shelf          # Only shelf specs
//!   cargo run --example library -- --ginkgo.parallel.node=1 --ginkgo.parallel.total=2

use ginkgo::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Shelf {
    books: BTreeMap<String, u32>,
}

impl Shelf {
    fn add(&mut self, title: &str) {
        *self.books.entry(title.to_string()).or_default() += 1;
    }

    fn lend(&mut self, title: &str) -> Result<(), String> {
        match self.books.get_mut(title) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(format!("{title} is not on the shelf")),
        }
    }
}

fn main() -> anyhow::Result<()> {
    ginkgo::init_logging(true);

    let shelf = Arc::new(Mutex::new(Shelf::default()));

    describe("Shelf", || {
        let setup = Arc::clone(&shelf);
        before_each(move || {
            let mut shelf = setup.lock().unwrap();
            *shelf = Shelf::default();
            shelf.add("Dune");
        });

        context("when the book is available", || {
            let shelf = Arc::clone(&shelf);
            it("lends it", move || {
                if let Err(e) = shelf.lock().unwrap().lend("Dune") {
                    fail(e);
                }
            });
        });

        context("when the book is missing", || {
            let shelf = Arc::clone(&shelf);
            it("refuses", move || {
                if shelf.lock().unwrap().lend("Emma").is_ok() {
                    fail("lent a book that was never shelved");
                }
            });
        });

        pit("keeps a waiting list", || {});
    });

    describe("Catalogue", || {
        benchmark("title lookup", 20, Duration::from_millis(50), |b| {
            let titles: Vec<String> = (0..1_000).map(|i| format!("title-{i}")).collect();
            let found = b.time("lookup", || titles.iter().position(|t| t == "title-999"));
            b.record_value("position", found.unwrap_or_default() as f64);
        });
    });

    let summary = run_specs("Library")?;
    println!(
        "{} passed, {} pending in {:?}",
        summary.passed, summary.pending, summary.run_time
    );
    Ok(())
}

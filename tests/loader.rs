// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{convert::Infallible, path::Path};

use cucumber_adapter::{
    host::{AttemptStatus, LocalHost, Report},
    loader, Adapter, Config, Matcher, Mode, Profile, Registry, State,
};
use futures::FutureExt as _;

#[derive(Debug, Default)]
struct Basket {
    items: Vec<(String, u32)>,
    printer: bool,
    total: u32,
}

impl State for Basket {
    type Error = Infallible;
    type Fixtures = ();

    async fn new() -> Result<Self, Infallible> {
        Ok(Self::default())
    }
}

fn registry() -> Registry<Basket> {
    Registry::<Basket>::new()
        .step(Matcher::literal("an empty basket"), |w, _| {
            async move { assert!(w.items.is_empty(), "basket is not empty") }
                .boxed_local()
        })
        .step(Matcher::literal("a receipt printer"), |w, _| {
            async move { w.printer = true }.boxed_local()
        })
        .step(Matcher::expression("I add {int} {string}").unwrap(), |w, ctx| {
            async move {
                let count = ctx.get::<u32>(0).unwrap();
                w.items.push((ctx.matches[1].clone(), count));
            }
            .boxed_local()
        })
        .step(
            Matcher::expression("the basket holds {int} items").unwrap(),
            |w, ctx| {
                async move {
                    let expected = ctx.get::<u32>(0).unwrap();
                    let held = w.items.iter().map(|(_, n)| n).sum::<u32>();
                    assert_eq!(held, expected);
                }
                .boxed_local()
            },
        )
        .step(Matcher::literal("the receipt reads:"), |w, ctx| {
            async move {
                assert!(w.printer, "no printer");
                let receipt = w
                    .items
                    .iter()
                    .map(|(item, n)| format!("{n} x {item}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                assert_eq!(ctx.docstring().map(str::trim), Some(receipt.as_str()));
            }
            .boxed_local()
        })
        .step(Matcher::literal("I price the items:"), |w, ctx| {
            async move {
                let rows = ctx.table().unwrap_or_default();
                for row in rows.iter().skip(1) {
                    w.total += row[1].parse::<u32>().unwrap();
                }
            }
            .boxed_local()
        })
        .step(
            Matcher::expression("the basket costs {int}").unwrap(),
            |w, ctx| {
                async move {
                    assert_eq!(w.total, ctx.get::<u32>(0).unwrap());
                    let currency = w.parameters()["currency"].as_str();
                    assert!(currency.is_none() || currency == Some("EUR"));
                }
                .boxed_local()
            },
        )
}

fn base() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
}

fn profile(name: &str) -> Profile {
    Config::from_path(base().join("tests/config.json"))
        .unwrap()
        .profile(name)
        .unwrap()
        .clone()
}

async fn run_profile(profile: &Profile) -> Report {
    let documents = loader::load_profile(base(), profile).unwrap();
    let mut host = LocalHost::new(|_| ()).retries(profile.retries);
    if let Some(filter) = profile.filter().unwrap() {
        host = host.grep(filter);
    }

    Adapter::new(registry())
        .documents(documents)
        .services(profile.services())
        .mode(profile.mode)
        .register(&mut host);
    host.run().await
}

#[test]
fn compiles_feature_files() {
    let documents =
        loader::load_features(base(), &["tests/features/*.feature"]).unwrap();
    assert_eq!(documents.len(), 1);

    let doc = &documents[0];
    assert_eq!(doc.name, "Shopping");
    assert_eq!(doc.uri, "tests/features/shopping.feature");

    let names = doc.pickles.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
    assert_eq!(
        names,
        [
            "adding one item",
            "adding 2 items",
            "adding 3 items",
            "printing a receipt",
            "pricing items",
        ],
    );

    let receipt = &doc.pickles[3];
    let steps = receipt.steps.iter().map(|s| s.text.as_str()).collect::<Vec<_>>();
    assert_eq!(
        steps,
        [
            "an empty basket",
            "a receipt printer",
            r#"I add 2 "plum""#,
            "the receipt reads:",
        ],
    );
    assert_eq!(receipt.unique_tags(), ["@shop", "@receipt"]);
    assert_eq!(doc.pickles[1].unique_tags(), ["@shop", "@bulk"]);
    assert_eq!(doc.pickles[0].id, "tests/features/shopping.feature:6");
}

#[tokio::test]
async fn runs_default_profile() {
    let report = run_profile(&profile("default")).await;

    assert_eq!(report.failed(), 0, "{report:#?}");
    assert_eq!(report.passed(), 5);
    assert_eq!(report.suites[0].title, "Shopping");

    let attempt = report.test("printing a receipt").unwrap().last().unwrap();
    assert_eq!(
        attempt.timeline(),
        [
            "an empty basket",
            "a receipt printer",
            r#"I add 2 "plum""#,
            "the receipt reads: [MultiLine]",
        ],
    );
}

#[tokio::test]
async fn runs_filtered_split_profile() {
    let profile = profile("bulk");
    assert_eq!(profile.mode, Mode::Split);

    let report = run_profile(&profile).await;

    let titles = report
        .tests()
        .iter()
        .map(|t| (t.title.clone(), t.status()))
        .collect::<Vec<_>>();
    assert_eq!(
        titles,
        [
            ("adding 2 items".to_owned(), AttemptStatus::Passed),
            ("adding 3 items".to_owned(), AttemptStatus::Passed),
        ],
    );
}

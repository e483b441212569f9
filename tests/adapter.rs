// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{cell::RefCell, convert::Infallible, rc::Rc};

use cucumber_adapter::{
    host::{AttemptStatus, LocalHost, Report},
    step::template,
    tags, Adapter, Attachment, Document, Hook, HookResult, Matcher, Pickle,
    PickleStep, Registry, Services, State, World,
};
use futures::FutureExt as _;
use regex::Regex;

type Journal = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Default)]
struct Browser {
    journal: Journal,
    visits: u32,
}

impl Browser {
    fn record(&self, entry: impl Into<String>) {
        self.journal.borrow_mut().push(entry.into());
    }
}

impl State for Browser {
    type Error = Infallible;
    type Fixtures = Journal;

    async fn new() -> Result<Self, Infallible> {
        Ok(Self::default())
    }

    fn init(&mut self, journal: Journal) {
        self.journal = journal;
    }
}

fn outcome(result: Option<&HookResult>) -> String {
    match result {
        Some(r) => match &r.message {
            Some(msg) => format!("{}: {msg}", r.status),
            None => r.status.to_string(),
        },
        None => "?".into(),
    }
}

fn steps() -> Registry<Browser> {
    Registry::<Browser>::new()
        .step(Matcher::expression("open {string} url").unwrap(), |w, ctx| {
            async move { w.record(format!("open {}", ctx.matches[0])) }
                .boxed_local()
        })
        .step(Matcher::literal("I visit"), |w, _| {
            async move {
                w.visits += 1;
                w.record(format!("visit {}", w.visits));
            }
            .boxed_local()
        })
        .step(Matcher::literal("step A"), |_, _| {
            async { panic!("A exploded") }.boxed_local()
        })
        .step(Matcher::literal("step B"), |w, _| {
            async move { w.record("B") }.boxed_local()
        })
        .step(Matcher::regex(Regex::new("^dup").unwrap()), |w, _| {
            async move { w.record("dup regex") }.boxed_local()
        })
        .step(Matcher::literal("dup step"), |w, _| {
            async move { w.record("dup literal") }.boxed_local()
        })
        .step(Matcher::expression("I attach {string}").unwrap(), |w, ctx| {
            async move {
                w.log(format!("attaching {}", ctx.matches[0]));
                w.attach(Attachment::new(ctx.matches[0].clone()).named("note"));
            }
            .boxed_local()
        })
        .step(Matcher::literal("the environment is set"), |w, _| {
            async move {
                let env = w.parameters()["env"].as_str().map(str::to_owned);
                w.record(format!("env {}", env.unwrap_or_default()));
            }
            .boxed_local()
        })
        .step(
            Matcher::literal("I do both"),
            template(|_| "step B\n    I visit\n".into()),
        )
}

fn registry() -> Registry<Browser> {
    steps()
        .before(
            Hook::scenario(|w: &mut World<Browser>, p| {
                async move { w.record(format!("open browser for {}", p.pickle.name)) }
                    .boxed_local()
            })
            .named("Open browser"),
        )
        .before(Hook::scenario(|w: &mut World<Browser>, _| {
            async move { w.record("before") }.boxed_local()
        }))
        .before(
            Hook::scenario(|w: &mut World<Browser>, p| {
                async move { w.record(format!("ui {}", p.test_case_started_id)) }
                    .boxed_local()
            })
            .tagged("@ui")
            .unwrap(),
        )
        .before_step(Hook::step(|w: &mut World<Browser>, p| {
            async move { w.record(format!("> {}", p.pickle_step.text)) }
                .boxed_local()
        }))
        .after_step(Hook::step(|w: &mut World<Browser>, p| {
            async move {
                let res = outcome(p.result.as_ref());
                w.record(format!("< {} {res}", p.pickle_step.text));
            }
            .boxed_local()
        }))
        .after(Hook::scenario(|w: &mut World<Browser>, p| {
            async move { w.record(format!("after {}", outcome(p.result.as_ref()))) }
                .boxed_local()
        }))
        .after(
            Hook::scenario(|w: &mut World<Browser>, _| {
                async move { w.record("close") }.boxed_local()
            })
            .named("Close browser"),
        )
}

fn pickle(name: &str, steps: &[&str]) -> Pickle {
    steps
        .iter()
        .fold(Pickle::new(name), |p, s| p.with_step(PickleStep::new(*s)))
}

async fn run_with(
    adapter: Adapter<Browser>,
    host: impl FnOnce(LocalHost<Journal>) -> LocalHost<Journal>,
) -> (Report, Vec<String>) {
    let journal = Journal::default();
    let fixtures = Rc::clone(&journal);
    let mut host = host(LocalHost::new(move |_| Rc::clone(&fixtures)));
    adapter.register(&mut host);
    let report = host.run().await;
    let entries = journal.take();
    (report, entries)
}

async fn run(registry: Registry<Browser>, pickles: Vec<Pickle>) -> (Report, Vec<String>) {
    let document = Document::new("Browsing", "browsing.feature", pickles);
    run_with(Adapter::new(registry).document(document), |h| h).await
}

#[tokio::test]
async fn passing_scenario_runs_every_hook_once_in_order() {
    let (report, journal) = run(
        registry(),
        vec![pickle("passes", &[r#"open "https://example.com" url"#, "I visit"])],
    )
    .await;

    assert_eq!(report.failed(), 0);
    assert_eq!(report.passed(), 1);
    assert_eq!(
        journal,
        [
            "open browser for passes",
            "before",
            r#"> open "https://example.com" url"#,
            "open https://example.com",
            r#"< open "https://example.com" url PASSED"#,
            "> I visit",
            "visit 1",
            "< I visit PASSED",
            "after PASSED",
            "close",
        ],
    );

    let attempt = report.test("passes").unwrap().last().unwrap();
    assert_eq!(
        attempt.timeline(),
        [
            "Open browser",
            "Before",
            r#"open "https://example.com" url"#,
            "  Before Step",
            "  After Step",
            "I visit",
            "  Before Step",
            "  After Step",
            "After",
            "Close browser",
        ],
    );
    assert!(attempt.steps.iter().all(|s| s.error.is_none()));
}

#[tokio::test]
async fn string_parameter_reaches_step_unquoted() {
    let (report, journal) = run(
        registry(),
        vec![pickle("opens", &[r#"open "https://example.com" url"#])],
    )
    .await;

    assert_eq!(report.failed(), 0);
    let opened = journal
        .iter()
        .filter(|e| e.starts_with("open https"))
        .collect::<Vec<_>>();
    assert_eq!(opened, ["open https://example.com"]);
}

#[tokio::test]
async fn failing_step_skips_the_rest_but_runs_after_hooks() {
    let (report, journal) =
        run(registry(), vec![pickle("fails", &["step A", "step B"])]).await;

    assert_eq!(
        journal,
        [
            "open browser for fails",
            "before",
            "> step A",
            "< step A FAILED: A exploded",
            "after FAILED: A exploded",
            "close",
        ],
    );

    let test = report.test("fails").unwrap();
    assert_eq!(test.status(), AttemptStatus::Failed);
    let attempt = test.last().unwrap();
    assert_eq!(attempt.error.as_deref(), Some("A exploded"));

    let step_a = attempt.steps.iter().find(|s| s.title == "step A").unwrap();
    assert_eq!(step_a.error.as_deref(), Some("A exploded"));
    assert!(attempt.steps.iter().all(|s| s.title != "step B"));
}

#[tokio::test]
async fn undefined_step_fails_without_running_bodies() {
    let (report, journal) =
        run(registry(), vec![pickle("undefined", &["I fly", "step B"])]).await;

    assert_eq!(
        journal,
        [
            "open browser for undefined",
            "before",
            "after FAILED: Step 'I fly' is not defined",
            "close",
        ],
    );

    let attempt = report.test("undefined").unwrap().last().unwrap();
    assert_eq!(attempt.error.as_deref(), Some("Step 'I fly' is not defined"));
    assert_eq!(
        attempt.timeline(),
        ["Open browser", "Before", "I fly", "After", "Close browser"],
    );
}

#[tokio::test]
async fn ambiguous_step_fails_without_running_candidates() {
    let (report, journal) =
        run(registry(), vec![pickle("ambiguous", &["dup step"])]).await;

    assert!(journal.iter().all(|e| !e.starts_with("dup")));
    assert!(journal.iter().all(|e| !e.starts_with("> ")));

    let error = report
        .test("ambiguous")
        .unwrap()
        .last()
        .unwrap()
        .error
        .clone()
        .unwrap();
    assert!(
        error.starts_with("Step 'dup step' matches multiple step definitions:"),
        "unexpected: {error}",
    );
    assert!(error.contains("^dup"));
    assert!(error.contains("\n  dup step"));
}

#[tokio::test]
async fn duplicate_names_are_reported_apart() {
    let (report, _) = run(
        registry(),
        vec![pickle("Eat", &["I visit"]), pickle("Eat", &["I visit"])],
    )
    .await;

    let titles = report.tests().iter().map(|t| t.title.clone()).collect::<Vec<_>>();
    assert_eq!(titles, ["Eat", "Eat (2)"]);
    assert_eq!(report.passed(), 2);
}

#[tokio::test]
async fn worlds_are_never_shared() {
    let (report, journal) = run(
        steps(),
        vec![
            pickle("first", &["I visit", "I visit"]),
            pickle("second", &["I visit", "I visit"]),
        ],
    )
    .await;

    assert_eq!(report.passed(), 2);
    assert_eq!(journal, ["visit 1", "visit 2", "visit 1", "visit 2"]);
}

#[tokio::test]
async fn tagged_hooks_apply_to_matching_scenarios_only() {
    let (_, journal) = run(
        registry(),
        vec![
            pickle("plain", &["I visit"]),
            pickle("tagged", &["I visit"]).with_tag("@ui"),
        ],
    )
    .await;

    let ui = journal.iter().filter(|e| e.starts_with("ui ")).collect::<Vec<_>>();
    assert_eq!(ui, ["ui browsing.feature#1#0"]);
}

#[tokio::test]
async fn host_filter_selects_by_tags() {
    let document = Document::new(
        "Browsing",
        "browsing.feature",
        [
            pickle("plain", &["I visit"]),
            pickle("tagged", &["I visit"]).with_tag("@ui"),
        ],
    );
    let (report, _) = run_with(Adapter::new(steps()).document(document), |h| {
        h.grep(tags("@ui").unwrap())
    })
    .await;

    let titles = report.tests().iter().map(|t| t.title.clone()).collect::<Vec<_>>();
    assert_eq!(titles, ["tagged"]);
}

#[tokio::test]
async fn template_replays_nested_steps() {
    let (report, journal) =
        run(steps(), vec![pickle("both", &["I do both", "I visit"])]).await;

    assert_eq!(report.failed(), 0);
    assert_eq!(journal, ["B", "visit 1", "visit 2"]);
}

#[tokio::test]
async fn services_reach_the_world() {
    let logs = Journal::default();
    let services = Services::default()
        .with_log({
            let logs = Rc::clone(&logs);
            move |m| logs.borrow_mut().push(m.to_owned())
        })
        .with_parameters(serde_json::json!({ "env": "test" }));
    let document = Document::new(
        "Browsing",
        "browsing.feature",
        [pickle("attaches", &[r#"I attach "hello""#, "the environment is set"])],
    );

    let (report, journal) = run_with(
        Adapter::new(steps()).document(document).services(services),
        |h| h,
    )
    .await;

    assert_eq!(report.failed(), 0);
    assert_eq!(journal, ["env test"]);
    assert_eq!(logs.take(), ["attaching hello"]);

    let attempt = report.test("attaches").unwrap().last().unwrap();
    assert_eq!(attempt.attachments.len(), 1);
    assert_eq!(attempt.attachments[0].name, "note");
    assert_eq!(attempt.attachments[0].content_type, "text/plain");
    assert_eq!(attempt.attachments[0].body, b"hello");
}

#[tokio::test]
async fn failing_before_hook_skips_steps() {
    let registry = steps()
        .before(Hook::scenario(|_: &mut World<Browser>, _| {
            async { panic!("no driver") }.boxed_local()
        }))
        .before(Hook::scenario(|w: &mut World<Browser>, _| {
            async move { w.record("second before") }.boxed_local()
        }))
        .after(Hook::scenario(|w: &mut World<Browser>, p| {
            async move { w.record(format!("after {}", outcome(p.result.as_ref()))) }
                .boxed_local()
        }));

    let (report, journal) =
        run(registry, vec![pickle("broken", &["I visit"])]).await;

    assert_eq!(journal, ["after FAILED: no driver"]);
    let attempt = report.test("broken").unwrap().last().unwrap();
    assert_eq!(attempt.error.as_deref(), Some("no driver"));
}

#[tokio::test]
async fn every_after_hook_runs_and_first_failure_wins() {
    let registry = steps()
        .after(Hook::scenario(|_: &mut World<Browser>, _| {
            async { panic!("first after") }.boxed_local()
        }))
        .after(Hook::scenario(|_: &mut World<Browser>, _| {
            async { panic!("second after") }.boxed_local()
        }))
        .after(Hook::scenario(|w: &mut World<Browser>, p| {
            async move { w.record(format!("last {}", outcome(p.result.as_ref()))) }
                .boxed_local()
        }));

    let (report, journal) =
        run(registry, vec![pickle("teardown", &["I visit"])]).await;

    assert_eq!(
        journal,
        ["visit 1", "last FAILED: first after\nsecond after"],
    );
    let attempt = report.test("teardown").unwrap().last().unwrap();
    assert_eq!(attempt.error.as_deref(), Some("first after"));
}

#[tokio::test]
async fn run_once_hooks_wrap_all_scenarios() {
    let calls = Journal::default();
    let hook = |label: &'static str, fail: bool| {
        let calls = Rc::clone(&calls);
        Hook::run_once(move || {
            let calls = Rc::clone(&calls);
            async move {
                calls.borrow_mut().push(label.to_owned());
                assert!(!fail, "{label} failed");
            }
        })
    };

    let registry = steps()
        .before_all(hook("setup", false))
        .after_all(hook("teardown 1", true))
        .after_all(hook("teardown 2", false));
    let (report, journal) = run(
        registry,
        vec![pickle("one", &["I visit"]), pickle("two", &["I visit"])],
    )
    .await;

    assert_eq!(calls.take(), ["setup", "teardown 1", "teardown 2"]);
    assert_eq!(journal, ["visit 1", "visit 1"]);

    let hooks = report.hooks();
    assert_eq!(hooks.len(), 2);
    assert_eq!(hooks[0].title, "Before All");
    assert!(hooks[0].error.is_none());
    assert_eq!(hooks[1].title, "After All");
    assert_eq!(hooks[1].error.as_deref(), Some("teardown 1 failed"));
    assert_eq!(report.failed(), 1);
}

#[tokio::test]
async fn failing_before_all_skips_every_scenario() {
    let calls = Journal::default();
    let hook = |label: &'static str, fail: bool| {
        let calls = Rc::clone(&calls);
        Hook::run_once(move || {
            let calls = Rc::clone(&calls);
            async move {
                calls.borrow_mut().push(label.to_owned());
                assert!(!fail, "{label} failed");
            }
        })
    };

    let registry = steps()
        .before_all(hook("setup 1", true))
        .before_all(hook("setup 2", false))
        .after_all(hook("teardown", false));
    let (report, journal) =
        run(registry, vec![pickle("one", &["I visit"])]).await;

    assert_eq!(calls.take(), ["setup 1", "teardown"]);
    assert!(journal.is_empty());
    assert_eq!(report.test("one").unwrap().status(), AttemptStatus::Skipped);
    assert_eq!(report.hooks()[0].error.as_deref(), Some("setup 1 failed"));
}

#[derive(Debug)]
struct Unreachable;

impl State for Unreachable {
    type Error = String;
    type Fixtures = ();

    async fn new() -> Result<Self, String> {
        Err("driver is not installed".into())
    }
}

#[tokio::test]
async fn world_construction_failure_fails_the_scenario() {
    let ran = Rc::new(RefCell::new(false));
    let registry = Registry::<Unreachable>::new().before(Hook::scenario({
        let ran = Rc::clone(&ran);
        move |_: &mut World<Unreachable>, _| {
            *ran.borrow_mut() = true;
            async {}.boxed_local()
        }
    }));
    let document = Document::new(
        "Browsing",
        "browsing.feature",
        [Pickle::new("unreachable")],
    );

    let mut host = LocalHost::new(|_| ());
    Adapter::new(registry).document(document).register(&mut host);
    let report = host.run().await;

    assert!(!*ran.borrow());
    let attempt = report.test("unreachable").unwrap().last().unwrap();
    assert_eq!(
        attempt.error.as_deref(),
        Some("Failed to construct World: driver is not installed"),
    );
}

#[tokio::test]
async fn tests_carry_scenario_annotations() {
    let document = Document::new(
        "Browsing",
        "browsing.feature",
        [pickle("annotated", &["I visit"]).with_tag("@ui").with_tag("ui")],
    );
    let (report, _) =
        run_with(Adapter::new(steps()).document(document), |h| h).await;

    let details = &report.test("annotated").unwrap().details;
    assert_eq!(details.tags, ["@ui"]);
    assert_eq!(details.test_id(), Some("browsing.feature#0"));
    assert_eq!(report.suites[0].title, "Browsing");
}

// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Steps composed of other steps.

use futures::{future::LocalBoxFuture, FutureExt as _};

use crate::World;

use super::Context;

/// Builds a step body out of a multi-line script of other steps.
///
/// The `render` function receives the positional parameters of the matched
/// step and returns a script. Every non-blank line of the script (trimmed) is
/// then executed one by one via [`World::execute_step()`] against the same
/// [`World`], so the first failing line fails the composed step too.
///
/// ```rust
/// # use cucumber_adapter::{step::template, Registry, State, Matcher};
/// # #[derive(Debug)]
/// # struct Browser;
/// # impl State for Browser {
/// #     type Error = std::convert::Infallible;
/// #     type Fixtures = ();
/// #     async fn new() -> Result<Self, Self::Error> { Ok(Self) }
/// # }
/// let registry = Registry::<Browser>::new().step(
///     Matcher::expression("I log in as {string}").unwrap(),
///     template(|params| {
///         format!(
///             "
///             I open the login page
///             I type '{}' into the user field
///             I click 'Submit'
///             ",
///             params[0],
///         )
///     }),
/// );
/// ```
///
/// [`World`]: crate::World
/// [`World::execute_step()`]: crate::World::execute_step
pub fn template<S, F>(
    render: F,
) -> impl for<'a> Fn(&'a mut World<S>, Context) -> LocalBoxFuture<'a, ()> + 'static
where
    S: 'static,
    F: Fn(&[String]) -> String + 'static,
{
    move |world, ctx| {
        let script = render(&ctx.matches);
        async move {
            for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
                world.execute_step(line, None).await;
            }
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use std::{convert::Infallible, panic::AssertUnwindSafe, rc::Rc};

    use futures::{executor::block_on, FutureExt as _};

    use crate::{Failure, Matcher, Registry, Services, State};

    use super::*;

    #[derive(Debug, Default)]
    struct Journal(Vec<String>);

    impl State for Journal {
        type Error = Infallible;
        type Fixtures = ();

        async fn new() -> Result<Self, Infallible> {
            Ok(Self::default())
        }
    }

    fn registry() -> Registry<Journal> {
        Registry::<Journal>::new()
            .step(Matcher::expression("I write {word}").unwrap(), |w, ctx| {
                async move { w.0.push(ctx.matches[0].clone()) }.boxed_local()
            })
            .step(Matcher::literal("I fail"), |_, _| {
                async { panic!("nope") }.boxed_local()
            })
            .step(
                Matcher::expression("I write {word} and {word}").unwrap(),
                template(|p| format!("\n  I write {}\n\n   I write {}  \n", p[0], p[1])),
            )
            .step(
                Matcher::literal("I write and fail"),
                template(|_| "I write one\nI fail\nI write two".into()),
            )
    }

    #[test]
    fn replays_lines_in_order() {
        let mut world =
            block_on(World::create(Rc::new(registry()), Services::default()))
                .unwrap();
        block_on(world.execute_step("I write a and b", None));
        assert_eq!(world.0, ["a", "b"]);
    }

    #[test]
    fn stops_at_first_failing_line() {
        let mut world =
            block_on(World::create(Rc::new(registry()), Services::default()))
                .unwrap();
        let payload = block_on(
            AssertUnwindSafe(world.execute_step("I write and fail", None))
                .catch_unwind(),
        )
        .unwrap_err();

        let failure = Failure::from_panic(payload);
        assert_eq!(
            failure.message(),
            "Failed to execute step 'I write and fail': \
             Failed to execute step 'I fail': nope",
        );
        assert_eq!(world.0, ["one"]);
    }
}

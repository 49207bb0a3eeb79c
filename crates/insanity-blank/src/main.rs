//! insanity-test-blank: a sample test that does nothing.
//!
//! Declares one of everything and validates both checklist items, so it can
//! be used to check a controller or a harness installation end to end.

use std::process::ExitCode;

use insanity_core::{LogLevel, Test};

fn main() -> anyhow::Result<ExitCode> {
    let test = Test::builder("blank-test", "Sample test that does nothing")
        .full_description("some longer description")
        .checklist_item(
            "random-checklist-item",
            "Some random checklist item, nothing much",
            Some("Probably something wrong here"),
            false,
        )?
        .checklist_item(
            "random-other-checklist-item",
            "Some random checklist item, nothing much",
            Some("Not going to happen"),
            false,
        )?
        .extra_info("random-extra-info", "Some random extra info")?
        .argument(
            "uri",
            "URI description",
            Some("URI full description"),
            true,
            "http://127.0.0.1/",
        )?
        .argument(
            "some-int",
            "Some random integer",
            Some("Some integer here"),
            true,
            123,
        )?
        .output_file("dummy-output-file", "dummy output file", false)?
        .output_file("dummy-output-file-global", "dummy output file", true)?
        .on_setup(|t| {
            t.debug("blank test setup");
            Ok(())
        })
        .on_start(|t| {
            let uri = t.argument_string("uri").unwrap_or_default();
            let some_int = t.argument_int("some-int").unwrap_or_default();
            tracing::info!(%uri, some_int, "blank test start");
            for label in ["dummy-output-file", "dummy-output-file-global"] {
                match t.output_file(label) {
                    Ok(path) => tracing::info!(label, path = %path.display(), "output file"),
                    Err(e) => tracing::warn!(label, error = %e, "no output file"),
                }
            }
            Ok(())
        })
        .on_stop(|t| t.debug("blank test stop"))
        .on_teardown(|t| t.debug("blank test teardown"))
        .threaded(blank_test)
        .build();

    Ok(test.run())
}

fn blank_test(t: &Test) {
    t.validate(
        "random-checklist-item",
        true,
        Some("Explanation of random-checklist-item failure"),
    );
    t.extra_info("random-extra-info", "Foo");

    if t.check("random-other-checklist-item", 1 != 0, "1 == 0") {
        t.ping();
        t.validate(
            "random-other-checklist-item",
            true,
            Some("Explanation of random-checklist-item failure"),
        );

        for level in [LogLevel::None, LogLevel::Info, LogLevel::Debug, LogLevel::Spam] {
            t.log("default", level, &format!("log:{level}"));
        }
        t.report("log:via-test");
        t.log("cat1", LogLevel::Info, "log:cat1");
        t.log("cat2", LogLevel::Info, "log:cat2");
    }

    t.done();
}
